use thiserror::Error;

use crate::core::models::simulation_box::Axis;
use crate::core::models::topology::BondIndexOutOfRange;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Required section <{0}> is missing from the document")]
    MissingSection(&'static str),

    #[error(
        "Inconsistent particle count: <position> has {positions} rows but <{section}> has {found}"
    )]
    InconsistentParticleCount {
        section: &'static str,
        positions: usize,
        found: usize,
    },

    #[error(transparent)]
    BondIndexOutOfRange(#[from] BondIndexOutOfRange),

    #[error(
        "Particle {particle} cannot be wrapped along {axis}: coordinate {value} is too far from the primary cell"
    )]
    UnwrappableCoordinate {
        particle: usize,
        axis: Axis,
        value: f64,
    },

    #[error("Relocation from anchor particle {anchor} did not converge after {steps} steps: {cause}")]
    NonConvergentRelocation {
        anchor: usize,
        steps: usize,
        cause: NonConvergence,
    },
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum NonConvergence {
    #[error("particle {particle} needs a second shift along {axis} (bonded cycle wraps the box)")]
    ContradictoryShift { particle: usize, axis: Axis },

    #[error("step budget of {budget} exhausted")]
    BudgetExhausted { budget: usize },
}
