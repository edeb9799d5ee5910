use crate::core::models::document::Document;
use crate::core::models::section::{IMAGE_SECTION, POSITION_SECTION};
use crate::core::models::simulation_box::{Axis, SimulationBox};
use crate::core::models::topology::BondIndexOutOfRange;
use crate::engine::error::EngineError;
use crate::engine::utils::query;
use nalgebra::{Point3, Vector3};
use tracing::{debug, info, instrument};

/// A bond whose endpoints are farther apart than half the box along at least one axis.
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    pub bond_index: usize,
    pub a: usize,
    pub b: usize,
    pub delta: Vector3<f64>, // true(a) - true(b)
}

impl Violation {
    /// Axes along which the separation exceeds half the box length.
    pub fn axes(&self, simulation_box: &SimulationBox) -> Vec<Axis> {
        let half = simulation_box.half_lengths();
        Axis::ALL
            .into_iter()
            .filter(|axis| self.delta[axis.index()].abs() > half[axis.index()])
            .collect()
    }
}

/// Reconstructs the unwrapped position `wrapped + image * L`.
pub fn true_position(
    wrapped: &Point3<f64>,
    image: &Vector3<i64>,
    simulation_box: &SimulationBox,
) -> Point3<f64> {
    wrapped + image.map(|i| i as f64).component_mul(&simulation_box.lengths())
}

/// Returns `true` if any component of `delta` exceeds half the box length on that axis.
///
/// The test is an OR over the three axes, not a threshold on the Euclidean distance.
pub fn exceeds_half_box(delta: &Vector3<f64>, simulation_box: &SimulationBox) -> bool {
    let half = simulation_box.half_lengths();
    Axis::ALL
        .into_iter()
        .any(|axis| delta[axis.index()].abs() > half[axis.index()])
}

/// Lists every bond whose reconstructed endpoints violate the minimum-image convention.
///
/// Violations are returned in bond-row order.
#[instrument(skip_all, name = "boundary_scan_task")]
pub fn find_violations(document: &Document) -> Result<Vec<Violation>, EngineError> {
    let simulation_box = query::require_box(document)?;
    let bonds = query::require_bonds(document)?;
    let positions = document
        .positions()
        .ok_or(EngineError::MissingSection(POSITION_SECTION))?;
    let images = document
        .images()
        .ok_or(EngineError::MissingSection(IMAGE_SECTION))?;
    let particle_count = positions.len().min(images.len());

    let mut violations = Vec::new();
    for (bond_index, bond) in bonds.iter().enumerate() {
        let endpoint = |particle: usize| {
            if particle >= particle_count {
                return Err(EngineError::from(BondIndexOutOfRange {
                    bond_index,
                    particle,
                    particle_count,
                }));
            }
            Ok(true_position(
                &positions[particle],
                &images[particle],
                &simulation_box,
            ))
        };
        let delta = endpoint(bond.a)? - endpoint(bond.b)?;
        if exceeds_half_box(&delta, &simulation_box) {
            debug!(
                bond_index,
                a = bond.a,
                b = bond.b,
                label = %bond.label,
                dx = delta.x,
                dy = delta.y,
                dz = delta.z,
                "Bond spans the periodic boundary."
            );
            violations.push(Violation {
                bond_index,
                a: bond.a,
                b: bond.b,
                delta,
            });
        }
    }

    info!(
        violations = violations.len(),
        bonds = bonds.len(),
        "Boundary-bond scan complete."
    );
    Ok(violations)
}
