//! Core domain concepts shared across all subdomains.
//!
//! - [`error::DomainError`]: domain-level errors
//! - [`error::PatternTableError`]: fatal reference-data errors

pub mod error;
