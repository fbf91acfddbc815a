//! Report entity

use crate::conflict::{Conflict, ConflictSource};
use crate::discovery::AnalyzedTool;
use crate::pattern::Severity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How the conflicts in a report were produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMode {
    /// Static rules plus AI analysis
    Hybrid,
    /// AI analysis was not attempted
    StaticOnly,
    /// AI analysis was attempted and failed
    StaticFallback,
}

impl AnalysisMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisMode::Hybrid => "hybrid",
            AnalysisMode::StaticOnly => "static_only",
            AnalysisMode::StaticFallback => "static_fallback",
        }
    }
}

impl std::fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A reason the report is less complete than a full hybrid analysis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Degradation {
    NoCredentials,
    SynthesisFailed { reason: String },
    UnparseableModelOutput,
    MissingDocumentation { tools: Vec<String> },
    DetectorFailed { source: String, reason: String },
}

impl std::fmt::Display for Degradation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Degradation::NoCredentials => {
                write!(f, "no model credentials configured; static rules only")
            }
            Degradation::SynthesisFailed { reason } => {
                write!(f, "AI analysis failed ({}); static rules only", reason)
            }
            Degradation::UnparseableModelOutput => {
                write!(f, "model output could not be parsed; static rules only")
            }
            Degradation::MissingDocumentation { tools } => {
                write!(f, "no documentation for: {}", tools.join(", "))
            }
            Degradation::DetectorFailed { source, reason } => {
                write!(f, "detector '{}' failed: {}", source, reason)
            }
        }
    }
}

/// Conflict totals per severity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl SeverityCounts {
    pub fn total(&self) -> usize {
        self.high + self.medium + self.low
    }
}

/// Tools the model judged to work well together
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompatibleCombination {
    /// Tool keys, at least two
    pub tools: Vec<String>,
    #[serde(default)]
    pub reason: String,
}

/// Model commentary beyond conflicts. Empty unless AI analysis succeeded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelInsights {
    pub compatible_combinations: Vec<CompatibleCombination>,
    pub recommendations: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overall_assessment: Option<String>,
}

impl ModelInsights {
    pub fn is_empty(&self) -> bool {
        self.compatible_combinations.is_empty()
            && self.recommendations.is_empty()
            && self.overall_assessment.is_none()
    }
}

/// Result of one analysis run. Immutable once returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub tools_analyzed: Vec<AnalyzedTool>,
    /// Ranked, most important first
    pub conflicts: Vec<Conflict>,
    pub installation_order: Vec<String>,
    pub generated_at: DateTime<Utc>,
    pub analysis_mode: AnalysisMode,
    #[serde(default)]
    pub degradations: Vec<Degradation>,
    #[serde(flatten)]
    pub insights: ModelInsights,
}

impl Report {
    pub fn new(
        tools_analyzed: Vec<AnalyzedTool>,
        conflicts: Vec<Conflict>,
        installation_order: Vec<String>,
        analysis_mode: AnalysisMode,
        degradations: Vec<Degradation>,
    ) -> Self {
        Self {
            tools_analyzed,
            conflicts,
            installation_order,
            generated_at: Utc::now(),
            analysis_mode,
            degradations,
            insights: ModelInsights::default(),
        }
    }

    pub fn with_insights(mut self, insights: ModelInsights) -> Self {
        self.insights = insights;
        self
    }

    pub fn with_generated_at(mut self, at: DateTime<Utc>) -> Self {
        self.generated_at = at;
        self
    }

    pub fn is_degraded(&self) -> bool {
        !self.degradations.is_empty() || self.analysis_mode != AnalysisMode::Hybrid
    }

    pub fn severity_counts(&self) -> SeverityCounts {
        let mut counts = SeverityCounts::default();
        for conflict in &self.conflicts {
            match conflict.severity {
                Severity::High => counts.high += 1,
                Severity::Medium => counts.medium += 1,
                Severity::Low => counts.low += 1,
            }
        }
        counts
    }

    /// Conflicts at or above a confidence threshold, in ranked order
    pub fn visible_conflicts(&self, min_confidence: f64) -> impl Iterator<Item = &Conflict> {
        self.conflicts
            .iter()
            .filter(move |c| c.confidence >= min_confidence)
    }

    pub fn count_by_source(&self, source: ConflictSource) -> usize {
        self.conflicts.iter().filter(|c| c.has_source(source)).count()
    }

    pub fn display_name<'a>(&'a self, tool_key: &'a str) -> &'a str {
        self.tools_analyzed
            .iter()
            .find(|t| t.tool_key == tool_key)
            .map(|t| t.display_name.as_str())
            .unwrap_or(tool_key)
    }
}
