//! # Core Models Module
//!
//! Data structures describing a particle record in memory.
//!
//! - [`document`] - The root/configuration envelope and its ordered, named sections
//! - [`section`] - A single section with its attributes and typed rows
//! - [`simulation_box`] - The orthorhombic periodic cell and the [`simulation_box::Axis`] enum
//! - [`topology`] - Bonds and the derived adjacency used for cluster traversal
//!
//! ```ignore
//! use lynx_core::core::io::hoomd::HoomdXmlFile;
//! use lynx_core::core::models::topology::BondGraph;
//!
//! let document = HoomdXmlFile::read_from_str(content)?;
//! let positions = document.positions().unwrap_or_default();
//! let graph = BondGraph::new(positions.len(), document.bonds().unwrap_or_default())?;
//! ```

pub mod document;
pub mod section;
pub mod simulation_box;
pub mod topology;
