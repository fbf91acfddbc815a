//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("No tools to analyze: supply at least one detected or planned tool")]
    EmptyToolSet,

    #[error("Signal weight for '{tool_key}' must be in (0, 1], got {weight}")]
    InvalidSignalWeight { tool_key: String, weight: f64 },

    #[error("Tool key cannot be empty")]
    EmptyToolKey,

    #[error("A conflict must reference at least two distinct tools, got {0}")]
    TooFewConflictTools(usize),

    #[error("Conflict confidence must be in [0, 1], got {0}")]
    InvalidConfidence(f64),

    #[error("Invalid pattern table: {0}")]
    PatternTable(#[from] PatternTableError),
}

impl DomainError {
    /// Check if this error is caused by caller input rather than a programming error
    pub fn is_input_error(&self) -> bool {
        matches!(self, DomainError::EmptyToolSet)
    }
}

/// Errors raised while loading or validating the conflict pattern table.
///
/// All of these are fatal: the engine refuses to run with a table that
/// would silently skip rules.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PatternTableError {
    #[error("failed to parse pattern table: {0}")]
    Parse(String),

    #[error("pattern #{index} has an empty pattern_id")]
    EmptyPatternId { index: usize },

    #[error("duplicate pattern_id '{0}'")]
    DuplicatePatternId(String),

    #[error("pattern '{pattern_id}' applies to {count} distinct tool(s); at least 2 required")]
    TooFewTools { pattern_id: String, count: usize },

    #[error("pattern '{pattern_id}' prefers '{tool_key}' which it does not apply to")]
    PreferenceOutsidePattern { pattern_id: String, tool_key: String },

    #[error("pattern '{pattern_id}' has an empty {field}")]
    EmptyField {
        pattern_id: String,
        field: &'static str,
    },

    #[error("pattern '{pattern_id}' uses unknown placeholder '{{{placeholder}}}'")]
    UnknownPlaceholder {
        pattern_id: String,
        placeholder: String,
    },

    #[error("pattern '{pattern_id}' uses '{{{placeholder}}}' but its tools cannot supply a value")]
    UnsuppliedPlaceholder {
        pattern_id: String,
        placeholder: String,
    },

    #[error("pattern '{pattern_id}' has confidence {value} outside [0, 1]")]
    ConfidenceOutOfRange { pattern_id: String, value: f64 },

    #[error("duplicate tool profile '{0}'")]
    DuplicateProfile(String),

    #[error("tool profile #{index} has an empty tool_key")]
    EmptyProfileKey { index: usize },

    #[error("tool '{tool_key}' declares env var '{env_var}' without semantics")]
    EmptyEnvSemantics { tool_key: String, env_var: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_tool_set_is_input_error() {
        assert!(DomainError::EmptyToolSet.is_input_error());
        assert!(!DomainError::TooFewConflictTools(1).is_input_error());
    }

    #[test]
    fn test_pattern_table_error_converts() {
        let err: DomainError = PatternTableError::DuplicatePatternId("x".to_string()).into();
        assert_eq!(
            err.to_string(),
            "Invalid pattern table: duplicate pattern_id 'x'"
        );
    }

    #[test]
    fn test_placeholder_message_keeps_braces() {
        let err = PatternTableError::UnknownPlaceholder {
            pattern_id: "p".to_string(),
            placeholder: "nope".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "pattern 'p' uses unknown placeholder '{nope}'"
        );
    }
}
