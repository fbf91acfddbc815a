//! Detector port
//!
//! A detector inspects one kind of evidence (installed packages, project
//! files, processes, containers, imports) and reports [`Signal`]s. Detectors
//! are read-only and may run concurrently.

use async_trait::async_trait;
use pitfall_domain::{Signal, SignalSource};
use std::path::PathBuf;
use thiserror::Error;

/// Errors a detector can report. All of them are absorbed by the scan.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DetectorError {
    /// Required tooling is missing (e.g. `docker` not on PATH)
    #[error("{0} is not available")]
    Unavailable(String),

    #[error("`{command}` failed: {message}")]
    CommandFailed { command: String, message: String },

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Timed out after {0}s")]
    Timeout(u64),
}

impl From<std::io::Error> for DetectorError {
    fn from(e: std::io::Error) -> Self {
        DetectorError::Io(e.to_string())
    }
}

/// What a scan should look at
#[derive(Debug, Clone)]
pub struct ScanContext {
    /// Project directory for file-based detectors
    pub project_dir: PathBuf,
    /// Upper bound on Python files read by the import scan
    pub max_import_files: usize,
    /// Check known default ports on localhost by connecting
    pub check_ports: bool,
}

impl ScanContext {
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_dir: project_dir.into(),
            max_import_files: 50,
            check_ports: true,
        }
    }

    pub fn with_max_import_files(mut self, max: usize) -> Self {
        self.max_import_files = max;
        self
    }

    pub fn with_port_checks(mut self, enabled: bool) -> Self {
        self.check_ports = enabled;
        self
    }
}

#[async_trait]
pub trait Detector: Send + Sync {
    /// Source tag carried by every signal this detector emits
    fn source(&self) -> SignalSource;

    /// Short name for logs and degradation notes
    fn name(&self) -> &str {
        self.source().as_str()
    }

    async fn detect(&self, context: &ScanContext) -> Result<Vec<Signal>, DetectorError>;
}
