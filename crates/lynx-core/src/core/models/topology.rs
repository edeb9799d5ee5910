use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Bond {
    pub label: String, // Bond type label, e.g. "C-C"
    pub a: usize,      // First particle index as written in the record
    pub b: usize,      // Second particle index as written in the record
}

impl Bond {
    pub fn new(label: impl Into<String>, a: usize, b: usize) -> Self {
        Self {
            label: label.into(),
            a,
            b,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error(
    "Bond {bond_index} references particle {particle}, but only {particle_count} particles exist"
)]
pub struct BondIndexOutOfRange {
    pub bond_index: usize,
    pub particle: usize,
    pub particle_count: usize,
}

/// Symmetric adjacency lookup derived from a bond list.
///
/// Each bond row contributes one entry to both endpoints' neighbor lists, in bond-row order.
/// The graph is rebuilt from the bond list on every pipeline run and is never mutated afterwards.
#[derive(Debug, Clone, Default)]
pub struct BondGraph {
    adjacency: Vec<Vec<usize>>,
    bond_count: usize,
}

impl BondGraph {
    /// Builds the adjacency lists for `particle_count` particles.
    ///
    /// # Errors
    ///
    /// Returns [`BondIndexOutOfRange`] for the first bond that names a particle index
    /// outside `0..particle_count`.
    pub fn new(particle_count: usize, bonds: &[Bond]) -> Result<Self, BondIndexOutOfRange> {
        let mut adjacency = vec![Vec::new(); particle_count];
        for (bond_index, bond) in bonds.iter().enumerate() {
            for particle in [bond.a, bond.b] {
                if particle >= particle_count {
                    return Err(BondIndexOutOfRange {
                        bond_index,
                        particle,
                        particle_count,
                    });
                }
            }
            adjacency[bond.a].push(bond.b);
            adjacency[bond.b].push(bond.a);
        }
        Ok(Self {
            adjacency,
            bond_count: bonds.len(),
        })
    }

    /// Returns the directly bonded neighbors of `index`, or an empty slice for unknown indices.
    pub fn neighbors(&self, index: usize) -> &[usize] {
        self.adjacency.get(index).map_or(&[], |v| v.as_slice())
    }

    pub fn particle_count(&self) -> usize {
        self.adjacency.len()
    }

    pub fn bond_count(&self) -> usize {
        self.bond_count
    }
}
