//! Presentation layer for pitfall-detector
//!
//! This crate contains CLI definitions, report formatters
//! and progress reporters.

pub mod cli;
pub mod output;
pub mod progress;

// Re-export commonly used types
pub use cli::commands::{
    AnalyzeArgs, Cli, Command, ConfigAction, OutputFormat, PatternsAction, PlanAction, PlanSpec,
    QuickAnalyzeArgs, ScanArgs, parse_plan_spec,
};
pub use output::console::{ConsoleFormatter, set_color_enabled};
pub use output::formatter::{JsonFormatter, ReportFormatter};
pub use progress::reporter::{ProgressReporter, SimpleProgress};
