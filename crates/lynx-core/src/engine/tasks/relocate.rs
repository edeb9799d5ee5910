use crate::core::models::document::Document;
use crate::core::models::section::POSITION_SECTION;
use crate::core::models::simulation_box::{Axis, SimulationBox};
use crate::core::models::topology::BondGraph;
use crate::engine::error::{EngineError, NonConvergence};
use nalgebra::{Point3, Vector3};
use tracing::{debug, instrument, trace};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelocationOutcome {
    pub moved: Vec<usize>, // Particles shifted, in the order they were moved
    pub steps: usize,      // Neighbor examinations performed
}

/// Whole-box shift that brings `neighbor` within half a box of `center` on every axis.
///
/// Axes whose separation is already within `±L/2` get a zero component.
pub fn continuity_shift(
    center: &Point3<f64>,
    neighbor: &Point3<f64>,
    simulation_box: &SimulationBox,
) -> Vector3<f64> {
    let delta = center - neighbor;
    let lengths = simulation_box.lengths();
    let half = simulation_box.half_lengths();
    Vector3::from_fn(|i, _| {
        if delta[i].abs() > half[i] {
            (delta[i] / lengths[i]).round() * lengths[i]
        } else {
            0.0
        }
    })
}

fn first_shifted_axis(shift: &Vector3<f64>) -> Axis {
    Axis::ALL
        .into_iter()
        .find(|axis| shift[axis.index()] != 0.0)
        .unwrap_or(Axis::X)
}

/// Makes the bonded cluster around `anchor` geometrically contiguous.
///
/// The anchor keeps its position. Its neighbors are shifted by whole box lengths until each
/// bond to the anchor is within `±L/2` per axis, and every moved particle is expanded in turn,
/// depth first, with an explicit stack. Particles are moved at most once per call; a particle
/// that would need a second correction means the bonded cycle wraps around the box, which is
/// reported as non-convergence instead of being oscillated forever.
///
/// Only positions change. Image flags are deliberately left untouched, so after relocation
/// `position + image * L` no longer reconstructs the original position of a moved particle.
///
/// # Errors
///
/// Returns [`EngineError::NonConvergentRelocation`] when a contradictory shift is required or
/// when more than `budget` neighbor examinations are needed.
pub fn relocate_positions(
    anchor: usize,
    positions: &mut [Point3<f64>],
    graph: &BondGraph,
    simulation_box: &SimulationBox,
    budget: usize,
) -> Result<RelocationOutcome, EngineError> {
    let mut visited = vec![false; positions.len()];
    if let Some(slot) = visited.get_mut(anchor) {
        *slot = true;
    }
    let mut stack = vec![anchor];
    let mut outcome = RelocationOutcome::default();

    while let Some(center) = stack.pop() {
        for &neighbor in graph.neighbors(center) {
            if outcome.steps == budget {
                return Err(EngineError::NonConvergentRelocation {
                    anchor,
                    steps: outcome.steps,
                    cause: NonConvergence::BudgetExhausted { budget },
                });
            }
            outcome.steps += 1;

            let (Some(center_pos), Some(neighbor_pos)) =
                (positions.get(center), positions.get(neighbor))
            else {
                continue;
            };
            let shift = continuity_shift(center_pos, neighbor_pos, simulation_box);
            if shift == Vector3::zeros() {
                continue;
            }
            if visited[neighbor] {
                return Err(EngineError::NonConvergentRelocation {
                    anchor,
                    steps: outcome.steps,
                    cause: NonConvergence::ContradictoryShift {
                        particle: neighbor,
                        axis: first_shifted_axis(&shift),
                    },
                });
            }

            positions[neighbor] += shift;
            visited[neighbor] = true;
            outcome.moved.push(neighbor);
            stack.push(neighbor);
            trace!(
                center,
                neighbor,
                sx = shift.x,
                sy = shift.y,
                sz = shift.z,
                "Shifted particle by whole box lengths."
            );
        }
    }

    Ok(outcome)
}

/// Relocates the cluster bonded to `anchor` within a document's positions.
#[instrument(skip_all, name = "relocation_task", fields(anchor = anchor))]
pub fn relocate(
    anchor: usize,
    document: &mut Document,
    graph: &BondGraph,
    simulation_box: &SimulationBox,
    budget: usize,
) -> Result<RelocationOutcome, EngineError> {
    let positions = document
        .positions_mut()
        .ok_or(EngineError::MissingSection(POSITION_SECTION))?;
    let outcome = relocate_positions(anchor, positions, graph, simulation_box, budget)?;
    debug!(
        moved = outcome.moved.len(),
        steps = outcome.steps,
        "Relocation finished."
    );
    Ok(outcome)
}
