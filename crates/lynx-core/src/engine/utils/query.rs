use crate::core::models::document::Document;
use crate::core::models::section::{
    BOND_SECTION, BOX_SECTION, IMAGE_SECTION, POSITION_SECTION, TYPE_SECTION,
};
use crate::core::models::simulation_box::SimulationBox;
use crate::core::models::topology::Bond;
use crate::engine::error::EngineError;

pub fn require_box(document: &Document) -> Result<SimulationBox, EngineError> {
    document
        .simulation_box()
        .copied()
        .ok_or(EngineError::MissingSection(BOX_SECTION))
}

pub fn require_bonds(document: &Document) -> Result<&[Bond], EngineError> {
    document
        .bonds()
        .ok_or(EngineError::MissingSection(BOND_SECTION))
}

/// Returns the particle count `N`, defined by the `position` section.
///
/// The `image` and `type` sections, when present, must have exactly `N` rows.
pub fn particle_count(document: &Document) -> Result<usize, EngineError> {
    let positions = document
        .positions()
        .ok_or(EngineError::MissingSection(POSITION_SECTION))?
        .len();
    for section in [IMAGE_SECTION, TYPE_SECTION] {
        if let Some(found) = document.row_count(section) {
            if found != positions {
                return Err(EngineError::InconsistentParticleCount {
                    section,
                    positions,
                    found,
                });
            }
        }
    }
    Ok(positions)
}
