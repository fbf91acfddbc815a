//! Application-level configuration.
//!
//! - [`AnalysisParams`]: timeouts, retry policy and prompt sizing

pub mod analysis_params;

pub use analysis_params::AnalysisParams;
