//! Computational units of the repair pipeline.
//!
//! Tasks are run in a fixed order by the repair workflow: [`wrap`] brings every particle into the
//! primary cell, [`scan`] lists bonds that still span the boundary, and [`relocate`] moves the
//! bonded cluster around each flagged bond so that it becomes contiguous.

pub mod relocate;
pub mod scan;
pub mod wrap;
