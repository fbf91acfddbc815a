//! Conflict entity

use crate::core::error::DomainError;
use crate::pattern::{ConflictKind, Severity};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Who produced a conflict
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictSource {
    StaticRule,
    AiAnalysis,
}

impl ConflictSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictSource::StaticRule => "static_rule",
            ConflictSource::AiAnalysis => "ai_analysis",
        }
    }
}

impl std::fmt::Display for ConflictSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Confidence added once when static and AI analysis agree
pub const CORROBORATION_BONUS: f64 = 0.1;

/// A problem predicted between two or more tools.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    pub kind: ConflictKind,
    /// Tool keys, distinct, at least two
    pub tools: Vec<String>,
    pub severity: Severity,
    pub confidence: f64,
    pub description: String,
    pub mitigation: String,
    pub sources: BTreeSet<ConflictSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern_id: Option<String>,
    /// Installation preference carried over from the pattern table
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub preference: Vec<String>,
}

impl Conflict {
    /// Create a conflict.
    ///
    /// Duplicate tool keys are collapsed, keeping first occurrence.
    pub fn new(
        kind: ConflictKind,
        tools: Vec<String>,
        severity: Severity,
        confidence: f64,
        description: impl Into<String>,
        mitigation: impl Into<String>,
        source: ConflictSource,
    ) -> Result<Self, DomainError> {
        let mut distinct: Vec<String> = Vec::with_capacity(tools.len());
        for tool in tools {
            if !distinct.contains(&tool) {
                distinct.push(tool);
            }
        }
        if distinct.len() < 2 {
            return Err(DomainError::TooFewConflictTools(distinct.len()));
        }
        if !(0.0..=1.0).contains(&confidence) || confidence.is_nan() {
            return Err(DomainError::InvalidConfidence(confidence));
        }

        Ok(Self {
            kind,
            tools: distinct,
            severity,
            confidence,
            description: description.into(),
            mitigation: mitigation.into(),
            sources: BTreeSet::from([source]),
            pattern_id: None,
            preference: Vec::new(),
        })
    }

    pub fn with_pattern(mut self, pattern_id: impl Into<String>, preference: Vec<String>) -> Self {
        self.pattern_id = Some(pattern_id.into());
        self.preference = preference;
        self
    }

    pub fn involves(&self, tool_key: &str) -> bool {
        self.tools.iter().any(|t| t == tool_key)
    }

    pub fn has_source(&self, source: ConflictSource) -> bool {
        self.sources.contains(&source)
    }

    /// Both static rules and AI analysis reported this conflict
    pub fn is_corroborated(&self) -> bool {
        self.has_source(ConflictSource::StaticRule) && self.has_source(ConflictSource::AiAnalysis)
    }

    /// Same kind and at least two tools in common
    pub fn same_identity(&self, other: &Conflict) -> bool {
        self.kind == other.kind
            && self.tools.iter().filter(|t| other.involves(t)).count() >= 2
    }

    /// Fold a duplicate into this conflict.
    ///
    /// Tools and sources are unioned, severity and confidence take the
    /// maximum. The corroboration bonus applies only on the merge that first
    /// brings static and AI sources together.
    pub fn absorb(&mut self, other: Conflict) {
        let was_corroborated = self.is_corroborated();

        for tool in other.tools {
            if !self.tools.contains(&tool) {
                self.tools.push(tool);
            }
        }
        self.sources.extend(other.sources);
        self.severity = self.severity.max(other.severity);
        self.confidence = self.confidence.max(other.confidence);

        if !was_corroborated && self.is_corroborated() {
            self.confidence = (self.confidence + CORROBORATION_BONUS).min(1.0);
        }

        if self.description.trim().is_empty() {
            self.description = other.description;
        }
        if self.mitigation.trim().is_empty() {
            self.mitigation = other.mitigation;
        }
        if self.pattern_id.is_none() {
            self.pattern_id = other.pattern_id;
        }
        if self.preference.is_empty() {
            self.preference = other.preference;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conflict(kind: ConflictKind, tools: &[&str], confidence: f64, source: ConflictSource) -> Conflict {
        Conflict::new(
            kind,
            tools.iter().map(|t| t.to_string()).collect(),
            Severity::Medium,
            confidence,
            "desc",
            "fix",
            source,
        )
        .unwrap()
    }

    #[test]
    fn test_requires_two_distinct_tools() {
        let err = Conflict::new(
            ConflictKind::Port,
            vec!["a".into(), "a".into()],
            Severity::High,
            0.9,
            "",
            "",
            ConflictSource::StaticRule,
        )
        .unwrap_err();
        assert_eq!(err, DomainError::TooFewConflictTools(1));
    }

    #[test]
    fn test_rejects_bad_confidence() {
        let err = Conflict::new(
            ConflictKind::Port,
            vec!["a".into(), "b".into()],
            Severity::High,
            1.2,
            "",
            "",
            ConflictSource::StaticRule,
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::InvalidConfidence(_)));
    }

    #[test]
    fn test_identity() {
        let a = conflict(ConflictKind::Port, &["x", "y"], 0.9, ConflictSource::StaticRule);
        let b = conflict(ConflictKind::Port, &["y", "z", "x"], 0.5, ConflictSource::AiAnalysis);
        let c = conflict(ConflictKind::Port, &["x", "z"], 0.5, ConflictSource::AiAnalysis);
        let d = conflict(ConflictKind::Resource, &["x", "y"], 0.5, ConflictSource::AiAnalysis);
        assert!(a.same_identity(&b));
        assert!(!a.same_identity(&c));
        assert!(!a.same_identity(&d));
    }

    #[test]
    fn test_absorb_corroboration_once() {
        let mut a = conflict(ConflictKind::Port, &["x", "y"], 0.9, ConflictSource::StaticRule);
        a.absorb(conflict(ConflictKind::Port, &["x", "y"], 0.5, ConflictSource::AiAnalysis));
        assert!((a.confidence - 1.0).abs() < 1e-9);
        assert!(a.is_corroborated());

        let mut b = conflict(ConflictKind::EnvVar, &["x", "y"], 0.6, ConflictSource::AiAnalysis);
        b.absorb(conflict(ConflictKind::EnvVar, &["x", "y"], 0.7, ConflictSource::StaticRule));
        assert!((b.confidence - 0.8).abs() < 1e-9);
        b.absorb(conflict(ConflictKind::EnvVar, &["x", "y"], 0.4, ConflictSource::AiAnalysis));
        assert!((b.confidence - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_absorb_unions_tools_and_severity() {
        let mut a = conflict(ConflictKind::Resource, &["x", "y"], 0.5, ConflictSource::StaticRule);
        let mut b = conflict(ConflictKind::Resource, &["y", "x", "z"], 0.4, ConflictSource::StaticRule);
        b.severity = Severity::High;
        a.absorb(b);
        assert_eq!(a.tools, vec!["x", "y", "z"]);
        assert_eq!(a.severity, Severity::High);
        assert_eq!(a.confidence, 0.5);
        assert_eq!(a.sources.len(), 1);
    }

    #[test]
    fn test_serialized_sources() {
        let a = conflict(ConflictKind::Port, &["x", "y"], 0.9, ConflictSource::StaticRule);
        let json = serde_json::to_value(&a).unwrap();
        assert_eq!(json["sources"][0], "static_rule");
        assert_eq!(json["kind"], "port");
        assert!(json.get("pattern_id").is_none());
    }
}
