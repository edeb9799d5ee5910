use nalgebra::Vector3;
use std::fmt;

/// Cartesian axis of an orthorhombic cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    /// Name of the box attribute that carries the edge length along this axis.
    pub fn length_key(self) -> &'static str {
        match self {
            Axis::X => "lx",
            Axis::Y => "ly",
            Axis::Z => "lz",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        };
        write!(f, "{}", name)
    }
}

/// An orthorhombic periodic cell centred on the origin.
///
/// The primary cell spans `[-L/2, +L/2]` along each axis. Tilt factors are not modelled;
/// any such attributes stay in the owning section's attribute map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationBox {
    lengths: Vector3<f64>,
}

impl SimulationBox {
    /// Creates a box from its three edge lengths.
    ///
    /// # Return
    ///
    /// Returns `None` if any length is not strictly positive and finite.
    pub fn new(lx: f64, ly: f64, lz: f64) -> Option<Self> {
        let valid = |l: f64| l.is_finite() && l > 0.0;
        if valid(lx) && valid(ly) && valid(lz) {
            Some(Self {
                lengths: Vector3::new(lx, ly, lz),
            })
        } else {
            None
        }
    }

    pub fn lengths(&self) -> Vector3<f64> {
        self.lengths
    }

    pub fn half_lengths(&self) -> Vector3<f64> {
        self.lengths / 2.0
    }

    pub fn length(&self, axis: Axis) -> f64 {
        self.lengths[axis.index()]
    }
}
