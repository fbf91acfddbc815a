//! Report configuration from TOML (`[report]` section)

use serde::{Deserialize, Serialize};

/// Report rendering format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileReportFormat {
    #[default]
    Human,
    Json,
}

/// Raw report configuration from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileReportConfig {
    pub format: FileReportFormat,
    /// Enable colored terminal output
    pub color: bool,
    /// Hide conflicts below this confidence
    pub min_confidence: f64,
}

impl Default for FileReportConfig {
    fn default() -> Self {
        Self {
            format: FileReportFormat::default(),
            color: true,
            min_confidence: 0.0,
        }
    }
}
