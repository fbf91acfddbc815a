//! Tool entities: what discovery found and what the user plans to install.

use super::signal::{Signal, SignalSource};
use serde::{Deserialize, Serialize};

/// Resolved presence status of a detected tool.
///
/// Ordering encodes evidence strength: an actively running process beats an
/// installed package, which beats a structural agent-framework match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    Running,
    Installed,
    AgentFrameworkDetected,
}

impl ToolStatus {
    /// Priority used when signals disagree; higher wins
    pub fn priority(&self) -> u8 {
        match self {
            ToolStatus::Running => 3,
            ToolStatus::Installed => 2,
            ToolStatus::AgentFrameworkDetected => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolStatus::Running => "running",
            ToolStatus::Installed => "installed",
            ToolStatus::AgentFrameworkDetected => "agent_framework_detected",
        }
    }
}

impl std::fmt::Display for ToolStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One logical tool found by Discovery Fusion.
///
/// Never mutated after creation; a re-scan produces a new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedTool {
    pub tool_key: String,
    pub display_name: String,
    pub status: ToolStatus,
    pub signals: Vec<Signal>,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// Every distinct version reported, in first-seen order
    #[serde(default)]
    pub observed_versions: Vec<String>,
}

impl DetectedTool {
    /// Distinct sources that contributed signals, in first-seen order
    pub fn sources(&self) -> Vec<SignalSource> {
        let mut sources = Vec::new();
        for signal in &self.signals {
            if !sources.contains(&signal.source) {
                sources.push(signal.source);
            }
        }
        sources
    }

    /// Whether detectors disagreed on the version
    pub fn has_version_conflict(&self) -> bool {
        self.observed_versions.len() > 1
    }
}

/// A tool the user intends to install or upgrade.
///
/// Independent of [`DetectedTool`]: the same key may appear in both lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedTool {
    pub tool_key: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_url: Option<String>,
    /// Port this project will run the tool on, if not the tool's default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

impl PlannedTool {
    pub fn new(tool_key: impl Into<String>) -> Self {
        let tool_key = tool_key.into();
        Self {
            display_name: tool_key.clone(),
            tool_key,
            github_url: None,
            port: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    pub fn with_github_url(mut self, url: impl Into<String>) -> Self {
        self.github_url = Some(url.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }
}

/// Where an analyzed tool came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolOrigin {
    Detected,
    Planned,
    Both,
}

/// One entry of the analyzed tool set, in declaration order.
///
/// Detected tools are declared before planned tools. A key present in both
/// lists yields a single entry with origin [`ToolOrigin::Both`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzedTool {
    pub tool_key: String,
    pub display_name: String,
    pub origin: ToolOrigin,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ToolStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Effective port: detected/overridden port first, otherwise none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_url: Option<String>,
}

/// Build the ordered, key-unique analyzed tool set.
pub fn analyzed_tools(detected: &[DetectedTool], planned: &[PlannedTool]) -> Vec<AnalyzedTool> {
    let mut tools: Vec<AnalyzedTool> = Vec::new();

    for tool in detected {
        if tools.iter().any(|t| t.tool_key == tool.tool_key) {
            continue;
        }
        tools.push(AnalyzedTool {
            tool_key: tool.tool_key.clone(),
            display_name: tool.display_name.clone(),
            origin: ToolOrigin::Detected,
            status: Some(tool.status),
            confidence: Some(tool.confidence),
            port: tool.port,
            github_url: None,
        });
    }

    for tool in planned {
        if let Some(existing) = tools.iter_mut().find(|t| t.tool_key == tool.tool_key) {
            if existing.origin == ToolOrigin::Detected {
                existing.origin = ToolOrigin::Both;
            }
            if existing.github_url.is_none() {
                existing.github_url = tool.github_url.clone();
            }
            if existing.port.is_none() {
                existing.port = tool.port;
            }
            continue;
        }
        tools.push(AnalyzedTool {
            tool_key: tool.tool_key.clone(),
            display_name: tool.display_name.clone(),
            origin: ToolOrigin::Planned,
            status: None,
            confidence: None,
            port: tool.port,
            github_url: tool.github_url.clone(),
        });
    }

    tools
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detected(key: &str) -> DetectedTool {
        DetectedTool {
            tool_key: key.to_string(),
            display_name: key.to_string(),
            status: ToolStatus::Installed,
            signals: vec![],
            confidence: 0.9,
            version: None,
            port: None,
            observed_versions: vec![],
        }
    }

    #[test]
    fn test_status_priority_order() {
        assert!(ToolStatus::Running.priority() > ToolStatus::Installed.priority());
        assert!(
            ToolStatus::Installed.priority() > ToolStatus::AgentFrameworkDetected.priority()
        );
    }

    #[test]
    fn test_analyzed_tools_merges_same_key() {
        let tools = analyzed_tools(
            &[detected("streamlit")],
            &[
                PlannedTool::new("streamlit").with_github_url("https://github.com/streamlit/streamlit"),
                PlannedTool::new("gradio"),
            ],
        );

        assert_eq!(tools.len(), 2);
        assert_eq!(tools[0].tool_key, "streamlit");
        assert_eq!(tools[0].origin, ToolOrigin::Both);
        assert!(tools[0].github_url.is_some());
        assert_eq!(tools[1].tool_key, "gradio");
        assert_eq!(tools[1].origin, ToolOrigin::Planned);
    }

    #[test]
    fn test_planned_tool_builder() {
        let tool = PlannedTool::new("gradio")
            .with_display_name("Gradio")
            .with_port(8501);
        assert_eq!(tool.display_name, "Gradio");
        assert_eq!(tool.port, Some(8501));
    }
}
