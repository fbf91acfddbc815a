//! Configuration file loading for pitfall-detector
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `PITFALL_*` environment variables
//! 2. `--config <path>` specified file
//! 3. Project root: `./pitfall.toml` or `./.pitfall.toml`
//! 4. XDG config: `$XDG_CONFIG_HOME/pitfall-detector/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    ConfigValidationError, FileConfig, FileGitHubConfig, FileLlmConfig, FilePatternsConfig,
    FilePlannedTool, FileReportConfig, FileReportFormat, FileScanConfig, LlmProvider,
};
pub use loader::ConfigLoader;
