//! Scan configuration from TOML (`[scan]` section)

use serde::{Deserialize, Serialize};

/// Raw scan configuration from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileScanConfig {
    /// Project directory; current directory when unset
    pub project_dir: Option<String>,
    /// Detectors to run by name; all when empty
    pub detectors: Vec<String>,
    /// Python interpreter used for `pip list`
    pub python: String,
    pub max_import_files: usize,
    pub check_ports: bool,
    pub detector_timeout_seconds: u64,
    /// Drop detected tools below this fused confidence
    pub min_confidence: f64,
}

impl Default for FileScanConfig {
    fn default() -> Self {
        Self {
            project_dir: None,
            detectors: Vec::new(),
            python: "python3".to_string(),
            max_import_files: 50,
            check_ports: true,
            detector_timeout_seconds: 30,
            min_confidence: 0.0,
        }
    }
}

impl FileScanConfig {
    pub fn is_detector_enabled(&self, name: &str) -> bool {
        self.detectors.is_empty() || self.detectors.iter().any(|d| d == name)
    }
}
