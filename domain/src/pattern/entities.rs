//! Reference-data entities: conflict kinds, severities, tool profiles and patterns.

use serde::{Deserialize, Serialize};

/// Category of an integration conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    Port,
    EnvVar,
    Dependency,
    FunctionalityOverlap,
    Resource,
}

impl ConflictKind {
    /// Confidence assigned to a static-rule conflict of this kind.
    ///
    /// Port collisions are a deterministic fact; overlap is a heuristic.
    pub fn baseline_confidence(&self) -> f64 {
        match self {
            ConflictKind::Port => 0.9,
            ConflictKind::Dependency => 0.8,
            ConflictKind::EnvVar => 0.7,
            ConflictKind::FunctionalityOverlap => 0.6,
            ConflictKind::Resource => 0.5,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictKind::Port => "port",
            ConflictKind::EnvVar => "env_var",
            ConflictKind::Dependency => "dependency",
            ConflictKind::FunctionalityOverlap => "functionality_overlap",
            ConflictKind::Resource => "resource",
        }
    }

    /// Human-readable title
    pub fn title(&self) -> &'static str {
        match self {
            ConflictKind::Port => "Port Conflict",
            ConflictKind::EnvVar => "Environment Variable Conflict",
            ConflictKind::Dependency => "Dependency Conflict",
            ConflictKind::FunctionalityOverlap => "Functionality Overlap",
            ConflictKind::Resource => "Resource Contention",
        }
    }
}

impl std::fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ConflictKind {
    type Err = String;

    /// Accepts the canonical names plus the labels language models tend to use
    /// (`port_conflict`, `environment_conflict`, `resource_competition`, ...).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "port" | "port_conflict" => Ok(ConflictKind::Port),
            "env_var" | "env" | "environment" | "environment_conflict" | "env_var_conflict"
            | "environment_variable" => Ok(ConflictKind::EnvVar),
            "dependency" | "dependency_conflict" | "version_conflict" => {
                Ok(ConflictKind::Dependency)
            }
            "functionality_overlap" | "overlap" | "functional_overlap" => {
                Ok(ConflictKind::FunctionalityOverlap)
            }
            "resource" | "resource_competition" | "resource_contention" | "config_conflict" => {
                Ok(ConflictKind::Resource)
            }
            _ => Err(format!("Unknown conflict kind: {}", s)),
        }
    }
}

/// Severity of a conflict. Ordered `Low < Medium < High`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    #[default]
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "high" | "critical" => Ok(Severity::High),
            "medium" | "moderate" => Ok(Severity::Medium),
            "low" | "minor" => Ok(Severity::Low),
            _ => Err(format!("Unknown severity: {}", s)),
        }
    }
}

/// How one tool consumes an environment variable.
///
/// Two tools reading the same variable only conflict when their declared
/// semantics differ.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVarUsage {
    pub name: String,
    pub semantics: String,
}

impl EnvVarUsage {
    pub fn new(name: impl Into<String>, semantics: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            semantics: semantics.into(),
        }
    }

    /// Whether two usages of the same variable mean the same thing
    pub fn same_semantics(&self, other: &EnvVarUsage) -> bool {
        self.semantics.trim().eq_ignore_ascii_case(other.semantics.trim())
    }
}

/// Static knowledge about one tool.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolProfile {
    pub tool_key: String,
    pub display_name: String,
    pub category: Option<String>,
    pub default_ports: Vec<u16>,
    /// Command or setting that changes the port, with a `{port}` placeholder
    pub port_hint: Option<String>,
    pub env_vars: Vec<EnvVarUsage>,
    pub package_names: Vec<String>,
    pub import_names: Vec<String>,
    pub process_names: Vec<String>,
    pub image_names: Vec<String>,
    pub github_url: Option<String>,
}

impl ToolProfile {
    pub fn new(tool_key: impl Into<String>) -> Self {
        let tool_key = tool_key.into();
        Self {
            display_name: tool_key.clone(),
            tool_key,
            ..Default::default()
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_default_port(mut self, port: u16) -> Self {
        self.default_ports.push(port);
        self
    }

    pub fn with_env_var(mut self, name: impl Into<String>, semantics: impl Into<String>) -> Self {
        self.env_vars.push(EnvVarUsage::new(name, semantics));
        self
    }

    pub fn with_package(mut self, name: impl Into<String>) -> Self {
        self.package_names.push(name.into());
        self
    }

    pub fn with_import(mut self, name: impl Into<String>) -> Self {
        self.import_names.push(name.into());
        self
    }

    pub fn env_var(&self, name: &str) -> Option<&EnvVarUsage> {
        self.env_vars.iter().find(|e| e.name == name)
    }

    /// Whether this tool is classified as an agent framework
    pub fn is_agent_framework(&self) -> bool {
        self.category.as_deref() == Some("agent-framework")
    }
}

/// A known conflict between specific tools.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictPattern {
    pub pattern_id: String,
    pub kind: ConflictKind,
    pub applies_to: Vec<String>,
    pub severity: Severity,
    pub rationale: String,
    pub mitigation_template: String,
    /// Installation preference, foundational tool first
    #[serde(default)]
    pub preference: Vec<String>,
    /// Overrides the kind baseline confidence
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl ConflictPattern {
    pub fn new(
        pattern_id: impl Into<String>,
        kind: ConflictKind,
        applies_to: &[&str],
        severity: Severity,
    ) -> Self {
        Self {
            pattern_id: pattern_id.into(),
            kind,
            applies_to: applies_to.iter().map(|s| s.to_string()).collect(),
            severity,
            rationale: String::new(),
            mitigation_template: String::new(),
            preference: Vec::new(),
            confidence: None,
        }
    }

    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = rationale.into();
        self
    }

    pub fn with_mitigation(mut self, template: impl Into<String>) -> Self {
        self.mitigation_template = template.into();
        self
    }

    pub fn with_preference(mut self, order: &[&str]) -> Self {
        self.preference = order.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// Confidence for conflicts produced by this pattern
    pub fn confidence(&self) -> f64 {
        self.confidence
            .unwrap_or_else(|| self.kind.baseline_confidence())
    }

    /// Whether every tool this pattern names is present
    pub fn is_covered_by(&self, mut present: impl FnMut(&str) -> bool) -> bool {
        self.applies_to.iter().all(|key| present(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
        assert_eq!(Severity::High.max(Severity::Low), Severity::High);
    }

    #[test]
    fn test_kind_aliases() {
        assert_eq!("port_conflict".parse::<ConflictKind>().ok(), Some(ConflictKind::Port));
        assert_eq!(
            "environment_conflict".parse::<ConflictKind>().ok(),
            Some(ConflictKind::EnvVar)
        );
        assert_eq!(
            "Resource Competition".parse::<ConflictKind>().ok(),
            Some(ConflictKind::Resource)
        );
        assert_eq!(
            "functionality-overlap".parse::<ConflictKind>().ok(),
            Some(ConflictKind::FunctionalityOverlap)
        );
        assert!("analysis_error".parse::<ConflictKind>().is_err());
    }

    #[test]
    fn test_baselines() {
        assert_eq!(ConflictKind::Port.baseline_confidence(), 0.9);
        assert_eq!(ConflictKind::FunctionalityOverlap.baseline_confidence(), 0.6);
    }

    #[test]
    fn test_pattern_confidence_override() {
        let p = ConflictPattern::new("p", ConflictKind::Resource, &["a", "b"], Severity::Low);
        assert_eq!(p.confidence(), 0.5);
        assert_eq!(p.with_confidence(0.75).confidence(), 0.75);
    }

    #[test]
    fn test_env_semantics_case_insensitive() {
        let a = EnvVarUsage::new("OPENAI_API_KEY", "OpenAI provider credential");
        let b = EnvVarUsage::new("OPENAI_API_KEY", " openai provider credential ");
        assert!(a.same_semantics(&b));
    }

    #[test]
    fn test_severity_serde() {
        assert_eq!(serde_json::to_string(&Severity::High).unwrap(), "\"high\"");
        let s: Severity = serde_json::from_str("\"low\"").unwrap();
        assert_eq!(s, Severity::Low);
    }
}
