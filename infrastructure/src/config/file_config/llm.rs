//! LLM configuration from TOML (`[llm]` section)

use serde::{Deserialize, Serialize};

/// Wire protocol spoken by the configured endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// OpenAI chat completions (also Azure, vLLM, Ollama and other compatible servers)
    #[default]
    OpenAi,
    Anthropic,
}

impl LlmProvider {
    pub fn default_api_key_env(&self) -> &'static str {
        match self {
            LlmProvider::OpenAi => "OPENAI_API_KEY",
            LlmProvider::Anthropic => "ANTHROPIC_API_KEY",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            LlmProvider::OpenAi => "https://api.openai.com/v1",
            LlmProvider::Anthropic => "https://api.anthropic.com",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            LlmProvider::OpenAi => "gpt-4o-mini",
            LlmProvider::Anthropic => "claude-3-5-haiku-latest",
        }
    }
}

/// Raw LLM configuration from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLlmConfig {
    /// Disable to always run static rules only
    pub enabled: bool,
    pub provider: LlmProvider,
    /// Model name; provider default when unset
    pub model: Option<String>,
    /// Environment variable holding the API key; provider default when unset
    pub api_key_env: Option<String>,
    /// API base URL; provider default when unset
    pub base_url: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_seconds: u64,
    /// Total attempts per analysis, including the first
    pub max_attempts: u32,
    pub retry_backoff_ms: u64,
    pub prompt_budget_chars: usize,
    pub excerpt_chars: usize,
    /// Anthropic API version header
    pub anthropic_version: String,
}

impl Default for FileLlmConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            provider: LlmProvider::default(),
            model: None,
            api_key_env: None,
            base_url: None,
            max_tokens: 2000,
            temperature: 0.3,
            timeout_seconds: 60,
            max_attempts: 2,
            retry_backoff_ms: 500,
            prompt_budget_chars: 12_000,
            excerpt_chars: 1_000,
            anthropic_version: "2023-06-01".to_string(),
        }
    }
}

impl FileLlmConfig {
    pub fn model_name(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or_else(|| self.provider.default_model())
    }

    pub fn api_key_env_name(&self) -> &str {
        self.api_key_env
            .as_deref()
            .unwrap_or_else(|| self.provider.default_api_key_env())
    }

    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.provider.default_base_url())
            .trim_end_matches('/')
    }
}
