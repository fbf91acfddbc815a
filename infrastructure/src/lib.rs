//! Infrastructure layer for pitfall-detector
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer, plus configuration and pattern table loading.

pub mod config;
pub mod detectors;
pub mod docs;
pub mod llm;
pub mod patterns;
pub mod store;

// Re-export commonly used types
pub use config::{
    ConfigLoader, ConfigValidationError, FileConfig, FileGitHubConfig, FileLlmConfig,
    FilePatternsConfig, FilePlannedTool, FileReportConfig, FileReportFormat, FileScanConfig,
    LlmProvider,
};
pub use detectors::{
    ContainerDetector, ImportScanDetector, PackageManagerDetector, ProcessDetector,
    ProjectFilesDetector, default_detectors,
};
pub use docs::GitHubReadmeFetcher;
pub use llm::{HttpLlmGateway, HttpLlmSettings};
pub use patterns::{PatternLoadError, PatternLoader};
pub use store::JsonToolStore;
