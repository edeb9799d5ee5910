//! Provides input/output functionality for particle record files.
//!
//! Formats implement the [`traits::RecordFile`] trait, which supplies reader/writer based entry
//! points plus path helpers that keep file handles scoped to a single call.

pub mod hoomd;
pub mod traits;
