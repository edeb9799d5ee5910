//! # Engine Module
//!
//! The algorithmic layer of the repair pipeline. Each task operates on a
//! [`Document`](crate::core::models::document::Document) in place and reports failures through
//! [`error::EngineError`].
//!
//! - **Configuration** ([`config`]) - Relocation budget and the builder that validates it
//! - **Progress Monitoring** ([`progress`]) - Callback based progress events
//! - **Error Handling** ([`error`]) - Engine-specific error types
//! - **Tasks** ([`tasks`]) - Image wrapping, the boundary-bond scan and cluster relocation

pub mod config;
pub mod error;
pub mod progress;
pub mod tasks;
pub(crate) mod utils;
