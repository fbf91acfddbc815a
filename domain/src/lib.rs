//! Domain layer for pitfall-detector
//!
//! This crate contains the detection and recommendation engine: entities,
//! value objects and pure algorithms. It performs no I/O.
//!
//! # Core Concepts
//!
//! ## Discovery Fusion
//!
//! Detectors emit weighted [`Signal`]s about which tools are present. Fusion
//! groups them per tool key and combines their weights with a noisy-OR into
//! a single [`DetectedTool`] confidence.
//!
//! ## Conflict Detection
//!
//! - **Static rules**: the [`PatternTable`] of known conflicts plus generic
//!   equal-port and env-var rules, evaluated by [`StaticRuleEngine`]
//! - **AI synthesis**: model output parsed defensively by
//!   [`parse_model_conflicts`] and merged with [`merge_conflicts`]
//!
//! ## Recommendation
//!
//! Conflicts are ranked by severity and confidence, and an
//! [`installation_order`] is derived from overlap preferences.

pub mod conflict;
pub mod core;
pub mod discovery;
pub mod pattern;
pub mod recommendation;
pub mod report;
pub mod synthesis;
pub mod util;

pub use conflict::{
    CORROBORATION_BONUS, Conflict, ConflictSource, StaticRuleEngine, merge_conflicts, merge_into,
};
pub use core::error::{DomainError, PatternTableError};
pub use discovery::{
    AnalyzedTool, DetectedTool, DiscoveryFusion, PlannedTool, Signal, SignalSource, ToolOrigin,
    ToolStatus, analyzed_tools, fused_confidence,
};
pub use pattern::{
    ConflictKind, ConflictPattern, EnvVarUsage, PatternTable, Severity, TemplateVars, ToolProfile,
};
pub use recommendation::{installation_order, rank_conflicts};
pub use report::{
    AnalysisMode, CompatibleCombination, Degradation, ModelInsights, Report, SeverityCounts,
};
pub use synthesis::{
    AnalysisPrompt, PromptBudget, extract_excerpt, parse_model_conflicts, parse_model_insights,
};
pub use util::{normalize_key, parse_github_repository, truncate_str};
