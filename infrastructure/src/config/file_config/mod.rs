//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and use domain types where appropriate.

mod github;
mod llm;
mod report;
mod scan;

pub use github::FileGitHubConfig;
pub use llm::{FileLlmConfig, LlmProvider};
pub use report::{FileReportConfig, FileReportFormat};
pub use scan::FileScanConfig;

use pitfall_application::{AnalysisParams, ScanContext};
use pitfall_domain::{PlannedTool, PromptBudget, normalize_key};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Configuration validation errors
#[derive(Debug, Error, PartialEq)]
pub enum ConfigValidationError {
    #[error("{0} cannot be 0")]
    ZeroValue(&'static str),

    #[error("llm.model cannot be empty")]
    EmptyModelName,

    #[error("{field} must be in [0, 1], got {value}")]
    ConfidenceOutOfRange { field: &'static str, value: f64 },

    #[error("planned tool #{0} has an empty key")]
    EmptyPlannedKey(usize),
}

/// Custom pattern table (`[patterns]` section)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilePatternsConfig {
    /// Replacement for the built-in table
    pub path: Option<String>,
}

/// A planned tool declared in config (`[[planned]]`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilePlannedTool {
    pub key: String,
    pub display_name: Option<String>,
    pub github_url: Option<String>,
    pub port: Option<u16>,
}

impl FilePlannedTool {
    pub fn to_planned(&self) -> PlannedTool {
        let mut tool = PlannedTool::new(normalize_key(&self.key));
        if let Some(name) = &self.display_name {
            tool = tool.with_display_name(name.clone());
        }
        if let Some(url) = &self.github_url {
            tool = tool.with_github_url(url.clone());
        }
        if let Some(port) = self.port {
            tool = tool.with_port(port);
        }
        tool
    }
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Model provider settings
    pub llm: FileLlmConfig,
    /// Documentation fetcher settings
    pub github: FileGitHubConfig,
    /// Discovery settings
    pub scan: FileScanConfig,
    /// Output settings
    pub report: FileReportConfig,
    /// Pattern table override
    pub patterns: FilePatternsConfig,
    /// Planned tools declared alongside the project
    pub planned: Vec<FilePlannedTool>,
}

impl FileConfig {
    /// Validate values that serde cannot check
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.llm.timeout_seconds == 0 {
            return Err(ConfigValidationError::ZeroValue("llm.timeout_seconds"));
        }
        if self.llm.max_attempts == 0 {
            return Err(ConfigValidationError::ZeroValue("llm.max_attempts"));
        }
        if self.llm.prompt_budget_chars == 0 {
            return Err(ConfigValidationError::ZeroValue("llm.prompt_budget_chars"));
        }
        if self.llm.model.as_deref().is_some_and(|m| m.trim().is_empty()) {
            return Err(ConfigValidationError::EmptyModelName);
        }
        if self.github.timeout_seconds == 0 {
            return Err(ConfigValidationError::ZeroValue("github.timeout_seconds"));
        }
        if self.scan.detector_timeout_seconds == 0 {
            return Err(ConfigValidationError::ZeroValue("scan.detector_timeout_seconds"));
        }
        for (field, value) in [
            ("scan.min_confidence", self.scan.min_confidence),
            ("report.min_confidence", self.report.min_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigValidationError::ConfidenceOutOfRange { field, value });
            }
        }
        if let Some(index) = self.planned.iter().position(|p| p.key.trim().is_empty()) {
            return Err(ConfigValidationError::EmptyPlannedKey(index));
        }
        Ok(())
    }

    pub fn planned_tools(&self) -> Vec<PlannedTool> {
        self.planned.iter().map(FilePlannedTool::to_planned).collect()
    }

    /// Timeouts, retry policy and budgets for the use cases
    pub fn analysis_params(&self) -> AnalysisParams {
        AnalysisParams::default()
            .with_detector_timeout(Duration::from_secs(self.scan.detector_timeout_seconds))
            .with_model_timeout(Duration::from_secs(self.llm.timeout_seconds))
            .with_max_attempts(self.llm.max_attempts)
            .with_retry_backoff(Duration::from_millis(self.llm.retry_backoff_ms))
            .with_doc_fetch_timeout(Duration::from_secs(self.github.timeout_seconds))
            .with_prompt_budget(PromptBudget {
                total_chars: self.llm.prompt_budget_chars,
                excerpt_chars: self.llm.excerpt_chars,
            })
            .with_min_tool_confidence(self.scan.min_confidence)
    }

    /// Scan context rooted at `[scan] project_dir`, or the current directory
    pub fn scan_context(&self) -> ScanContext {
        let dir = self
            .scan
            .project_dir
            .as_deref()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        ScanContext::new(dir)
            .with_max_import_files(self.scan.max_import_files)
            .with_port_checks(self.scan.check_ports)
    }
}
