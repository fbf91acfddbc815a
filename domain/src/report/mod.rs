//! Analysis report

pub mod entities;

pub use entities::{
    AnalysisMode, CompatibleCombination, Degradation, ModelInsights, Report, SeverityCounts,
};
