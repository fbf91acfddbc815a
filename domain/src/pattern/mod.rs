//! Static reference data: tool profiles, conflict patterns, templates.

pub mod entities;
pub mod table;
pub mod template;

pub use entities::{ConflictKind, ConflictPattern, EnvVarUsage, Severity, ToolProfile};
pub use table::PatternTable;
pub use template::{PLACEHOLDERS, TemplateVars, join_names, placeholders, render};
