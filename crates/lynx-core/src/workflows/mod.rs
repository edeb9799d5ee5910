//! # Workflows Module
//!
//! High-level entry points that run the complete repair pipeline.
//!
//! - **Repair Workflow** ([`repair`]) - Validation, image zeroing, wrapping, the boundary scan,
//!   cluster relocation and serialization, either on an in-memory document or file to file.

pub mod repair;
