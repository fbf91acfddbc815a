//! GitHub configuration from TOML (`[github]` section)

use serde::{Deserialize, Serialize};

/// Raw GitHub documentation fetcher configuration from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileGitHubConfig {
    /// Fetch READMEs to ground AI analysis
    pub enabled: bool,
    /// Environment variable holding an optional token (higher rate limits)
    pub token_env: String,
    pub api_url: String,
    pub timeout_seconds: u64,
}

impl Default for FileGitHubConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            token_env: "GITHUB_TOKEN".to_string(),
            api_url: "https://api.github.com".to_string(),
            timeout_seconds: 30,
        }
    }
}
