//! Discovery: signals, tool records, and their fusion.

pub mod fusion;
pub mod signal;
pub mod tool;

pub use fusion::{DiscoveryFusion, fused_confidence};
pub use signal::{Signal, SignalSource};
pub use tool::{AnalyzedTool, DetectedTool, PlannedTool, ToolOrigin, ToolStatus, analyzed_tools};
