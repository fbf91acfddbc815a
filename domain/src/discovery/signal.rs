//! Signal records: one detector's raw observation about a tool.

use super::tool::ToolStatus;
use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};

/// Where an observation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalSource {
    /// An installed package reported by a package manager (pip, conda)
    PackageManager,
    /// A dependency declared in a project file (requirements.txt, pyproject.toml)
    RequirementsFile,
    /// A live process or a listening port
    RunningProcess,
    /// A running container image
    Container,
    /// An import statement found in project source
    ImportScan,
}

impl SignalSource {
    /// All sources, in the order detectors are usually run
    pub const ALL: [SignalSource; 5] = [
        SignalSource::PackageManager,
        SignalSource::RequirementsFile,
        SignalSource::RunningProcess,
        SignalSource::Container,
        SignalSource::ImportScan,
    ];

    /// Presence status implied by this source when the detector gives no hint
    pub fn default_status(&self) -> ToolStatus {
        match self {
            SignalSource::RunningProcess | SignalSource::Container => ToolStatus::Running,
            SignalSource::PackageManager
            | SignalSource::RequirementsFile
            | SignalSource::ImportScan => ToolStatus::Installed,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SignalSource::PackageManager => "package_manager",
            SignalSource::RequirementsFile => "requirements_file",
            SignalSource::RunningProcess => "running_process",
            SignalSource::Container => "container",
            SignalSource::ImportScan => "import_scan",
        }
    }
}

impl std::fmt::Display for SignalSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A normalized observation about one tool's presence.
///
/// Immutable once produced. The optional hints (`status`, `version`, `port`,
/// `display_name`) feed the field-resolution rules of fusion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub tool_key: String,
    pub source: SignalSource,
    pub evidence: String,
    pub weight: f64,
    pub status: ToolStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// What was observed, without volatile detail such as version or pid.
    /// Falls back to `evidence`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
}

impl Signal {
    /// Create a signal, validating that `weight` lies in (0, 1].
    pub fn new(
        tool_key: impl Into<String>,
        source: SignalSource,
        evidence: impl Into<String>,
        weight: f64,
    ) -> Result<Self, DomainError> {
        let tool_key = tool_key.into();
        if tool_key.trim().is_empty() {
            return Err(DomainError::EmptyToolKey);
        }
        if !(weight > 0.0 && weight <= 1.0) {
            return Err(DomainError::InvalidSignalWeight { tool_key, weight });
        }
        Ok(Self {
            tool_key,
            source,
            evidence: evidence.into(),
            weight,
            status: source.default_status(),
            version: None,
            port: None,
            display_name: None,
            subject: None,
        })
    }

    // ==================== Builder Methods ====================

    pub fn with_status(mut self, status: ToolStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Name the observed thing, e.g. a package name, so re-observations
    /// with a new version or pid collapse into one
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn subject(&self) -> &str {
        self.subject.as_deref().unwrap_or(&self.evidence)
    }

    /// Identity used to collapse repeated observations of the same thing
    pub(crate) fn dedup_key(&self) -> (&str, SignalSource, &str) {
        (&self.tool_key, self.source, self.subject())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weight_bounds() {
        assert!(Signal::new("streamlit", SignalSource::PackageManager, "pip", 1.0).is_ok());
        assert!(Signal::new("streamlit", SignalSource::PackageManager, "pip", 0.01).is_ok());
        assert!(matches!(
            Signal::new("streamlit", SignalSource::PackageManager, "pip", 0.0),
            Err(DomainError::InvalidSignalWeight { .. })
        ));
        assert!(Signal::new("streamlit", SignalSource::PackageManager, "pip", 1.2).is_err());
        assert!(Signal::new("streamlit", SignalSource::PackageManager, "pip", f64::NAN).is_err());
    }

    #[test]
    fn test_empty_key_rejected() {
        assert_eq!(
            Signal::new("  ", SignalSource::ImportScan, "app.py", 0.3),
            Err(DomainError::EmptyToolKey)
        );
    }

    #[test]
    fn test_default_status_by_source() {
        let s = Signal::new("gradio", SignalSource::Container, "docker", 0.8).unwrap();
        assert_eq!(s.status, ToolStatus::Running);
        let s = Signal::new("gradio", SignalSource::RequirementsFile, "req", 0.5).unwrap();
        assert_eq!(s.status, ToolStatus::Installed);
    }

    #[test]
    fn test_subject_defaults_to_evidence() {
        let s = Signal::new("torch", SignalSource::PackageManager, "pip: torch 2.1.0", 0.7).unwrap();
        assert_eq!(s.subject(), "pip: torch 2.1.0");
        let s = s.with_subject("torch");
        assert_eq!(s.subject(), "torch");
        assert_eq!(s.dedup_key(), ("torch", SignalSource::PackageManager, "torch"));
    }

    #[test]
    fn test_source_serializes_snake_case() {
        let json = serde_json::to_string(&SignalSource::RunningProcess).unwrap();
        assert_eq!(json, "\"running_process\"");
    }
}
