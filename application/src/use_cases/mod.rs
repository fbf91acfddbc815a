//! Use cases
//!
//! Application-level operations that orchestrate domain logic.

pub mod analyze;
pub mod scan_environment;
pub mod synthesize;
