//! HTTP gateway for OpenAI-compatible and Anthropic chat APIs

use super::protocol::{
    ChatCompletionRequest, MessagesRequest, error_message, parse_chat_completion, parse_messages,
};
use crate::config::{FileLlmConfig, LlmProvider};
use async_trait::async_trait;
use pitfall_application::{GatewayError, LlmGateway, LlmSession};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Connection settings resolved from `[llm]`
#[derive(Debug, Clone)]
pub struct HttpLlmSettings {
    pub provider: LlmProvider,
    pub model: String,
    pub base_url: String,
    pub api_key: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout: Duration,
    pub anthropic_version: String,
}

impl HttpLlmSettings {
    /// Resolve settings, reading the API key from the configured variable
    pub fn from_config(config: &FileLlmConfig) -> Result<Self, GatewayError> {
        let env_name = config.api_key_env_name();
        let api_key = std::env::var(env_name)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| GatewayError::MissingCredentials(format!("{} is not set", env_name)))?;
        Ok(Self::with_key(config, api_key))
    }

    pub fn with_key(config: &FileLlmConfig, api_key: impl Into<String>) -> Self {
        Self {
            provider: config.provider,
            model: config.model_name().to_string(),
            base_url: config.base_url().to_string(),
            api_key: api_key.into(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            timeout: Duration::from_secs(config.timeout_seconds),
            anthropic_version: config.anthropic_version.clone(),
        }
    }

    fn endpoint(&self) -> String {
        match self.provider {
            LlmProvider::OpenAi => format!("{}/chat/completions", self.base_url),
            LlmProvider::Anthropic => format!("{}/v1/messages", self.base_url),
        }
    }
}

/// [`LlmGateway`] over plain HTTPS
pub struct HttpLlmGateway {
    client: reqwest::Client,
    settings: Arc<HttpLlmSettings>,
}

impl HttpLlmGateway {
    pub fn new(settings: HttpLlmSettings) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .user_agent(concat!("pitfall-detector/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GatewayError::Other(e.to_string()))?;
        Ok(Self {
            client,
            settings: Arc::new(settings),
        })
    }

    /// Build a gateway when `[llm]` is enabled and credentials are present.
    ///
    /// Returns `None` otherwise, so analysis runs static-only.
    pub fn try_from_config(config: &FileLlmConfig) -> Option<Self> {
        if !config.enabled {
            debug!("LLM analysis disabled in config");
            return None;
        }
        match HttpLlmSettings::from_config(config).and_then(Self::new) {
            Ok(gateway) => {
                info!(
                    model = %gateway.settings.model,
                    endpoint = %gateway.settings.endpoint(),
                    "LLM gateway initialized"
                );
                Some(gateway)
            }
            Err(e) => {
                info!("LLM analysis unavailable: {}", e);
                None
            }
        }
    }
}

#[async_trait]
impl LlmGateway for HttpLlmGateway {
    fn model(&self) -> &str {
        &self.settings.model
    }

    async fn create_session_with_system_prompt(
        &self,
        system_prompt: &str,
    ) -> Result<Box<dyn LlmSession>, GatewayError> {
        Ok(Box::new(HttpLlmSession {
            client: self.client.clone(),
            settings: self.settings.clone(),
            system_prompt: system_prompt.to_string(),
        }))
    }
}

/// One-shot session; each `send` is an independent request
pub struct HttpLlmSession {
    client: reqwest::Client,
    settings: Arc<HttpLlmSettings>,
    system_prompt: String,
}

impl HttpLlmSession {
    fn request(&self, content: &str) -> reqwest::RequestBuilder {
        let settings = &self.settings;
        let builder = self.client.post(settings.endpoint());
        match settings.provider {
            LlmProvider::OpenAi => {
                let mut body =
                    ChatCompletionRequest::new(&settings.model, &self.system_prompt, content);
                body.max_tokens = settings.max_tokens;
                body.temperature = settings.temperature;
                builder.bearer_auth(&settings.api_key).json(&body)
            }
            LlmProvider::Anthropic => {
                let mut body = MessagesRequest::new(&settings.model, &self.system_prompt, content);
                body.max_tokens = settings.max_tokens;
                body.temperature = settings.temperature;
                builder
                    .header("x-api-key", &settings.api_key)
                    .header("anthropic-version", &settings.anthropic_version)
                    .json(&body)
            }
        }
    }
}

fn map_reqwest_error(e: reqwest::Error) -> GatewayError {
    if e.is_timeout() {
        GatewayError::Timeout
    } else if e.is_connect() || e.is_request() {
        GatewayError::ConnectionError(e.to_string())
    } else {
        GatewayError::RequestFailed(e.to_string())
    }
}

#[async_trait]
impl LlmSession for HttpLlmSession {
    fn model(&self) -> &str {
        &self.settings.model
    }

    async fn send(&self, content: &str) -> Result<String, GatewayError> {
        debug!(
            model = %self.settings.model,
            prompt_chars = content.len(),
            "Sending analysis request"
        );

        let response = self
            .request(content)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let status = response.status();
        let body = response.text().await.map_err(map_reqwest_error)?;

        if !status.is_success() {
            return Err(GatewayError::HttpStatus {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        match self.settings.provider {
            LlmProvider::OpenAi => parse_chat_completion(&body),
            LlmProvider::Anthropic => parse_messages(&body),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints() {
        let config = FileLlmConfig::default();
        let settings = HttpLlmSettings::with_key(&config, "k");
        assert_eq!(settings.endpoint(), "https://api.openai.com/v1/chat/completions");
        assert_eq!(settings.timeout, Duration::from_secs(60));

        let config = FileLlmConfig {
            provider: LlmProvider::Anthropic,
            ..FileLlmConfig::default()
        };
        let settings = HttpLlmSettings::with_key(&config, "k");
        assert_eq!(settings.endpoint(), "https://api.anthropic.com/v1/messages");
    }

    #[test]
    fn test_missing_credentials() {
        let config = FileLlmConfig {
            api_key_env: Some("PITFALL_TEST_KEY_THAT_IS_NEVER_SET".to_string()),
            ..FileLlmConfig::default()
        };
        assert!(matches!(
            HttpLlmSettings::from_config(&config),
            Err(GatewayError::MissingCredentials(_))
        ));
        assert!(HttpLlmGateway::try_from_config(&config).is_none());
    }

    #[test]
    fn test_disabled_config() {
        let config = FileLlmConfig {
            enabled: false,
            ..FileLlmConfig::default()
        };
        assert!(HttpLlmGateway::try_from_config(&config).is_none());
    }

    #[tokio::test]
    async fn test_session_reports_model() {
        let settings = HttpLlmSettings::with_key(&FileLlmConfig::default(), "k");
        let gateway = HttpLlmGateway::new(settings).unwrap();
        let session = gateway
            .create_session_with_system_prompt("system")
            .await
            .unwrap();
        assert_eq!(session.model(), gateway.model());
    }
}
