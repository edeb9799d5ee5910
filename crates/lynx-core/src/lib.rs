//! # Lynx Core Library
//!
//! Repairs periodic-image artifacts in HOOMD-style XML particle records: every particle is wrapped
//! into the primary orthorhombic cell with consistent image flags, and bonded clusters that
//! straddle the periodic boundary are moved by whole box lengths until every bond is contiguous.
//!
//! ## Architectural Philosophy
//!
//! The library follows a strict three-layer architecture.
//!
//! - **[`core`]: The Foundation.** Stateless data models (`Document`, `SimulationBox`,
//!   `BondGraph`) and the XML record reader/writer.
//!
//! - **[`engine`]: The Logic Core.** Configuration, error types, progress reporting and the
//!   algorithmic tasks: image wrapping, the boundary-bond scan and cluster relocation.
//!
//! - **[`workflows`]: The Public API.** Ties `core` and `engine` together into the complete
//!   repair pipeline, from reading a file to writing the repaired record back out.

pub mod core;
pub mod engine;
pub mod workflows;
