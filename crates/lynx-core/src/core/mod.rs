//! # Core Module
//!
//! The data layer of the library. Nothing in here knows about wrapping or relocation; it only
//! describes what a particle record is and how it is read from and written to disk.
//!
//! - **Record Representation** ([`models`]) - Documents, sections, the simulation box and bonds
//! - **File I/O** ([`io`]) - Reading and writing HOOMD-style XML records
//!
//! The typical entry point is [`io::hoomd::HoomdXmlFile`], which produces a
//! [`models::document::Document`] that the engine tasks operate on.

pub mod io;
pub mod models;
