//! Utility functions for the engine module.
//!
//! Lookups that pull required sections out of a document and check that the parallel
//! particle sections agree before any task mutates them.

pub mod query;
