//! LLM Gateway port
//!
//! Defines the interface for communicating with LLM providers.

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur during LLM gateway operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    #[error("HTTP {status}: {message}")]
    HttpStatus { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Timeout")]
    Timeout,

    #[error("Other error: {0}")]
    Other(String),
}

impl GatewayError {
    /// Whether a retry may succeed: connection problems, timeouts, 5xx and 429
    pub fn is_transient(&self) -> bool {
        match self {
            GatewayError::ConnectionError(_) | GatewayError::Timeout => true,
            GatewayError::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Gateway for LLM communication
///
/// This port defines how the application layer communicates with LLM providers.
/// Implementations (adapters) live in the infrastructure layer.
#[async_trait]
pub trait LlmGateway: Send + Sync {
    /// Model identifier requests are sent to
    fn model(&self) -> &str;

    /// Create a new session with a system prompt
    async fn create_session_with_system_prompt(
        &self,
        system_prompt: &str,
    ) -> Result<Box<dyn LlmSession>, GatewayError>;
}

/// An active LLM session
#[async_trait]
pub trait LlmSession: Send + Sync {
    /// Get the model used by this session
    fn model(&self) -> &str;

    /// Send a message and get a response
    async fn send(&self, content: &str) -> Result<String, GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(GatewayError::Timeout.is_transient());
        assert!(GatewayError::ConnectionError("reset".into()).is_transient());
        assert!(
            GatewayError::HttpStatus {
                status: 503,
                message: String::new()
            }
            .is_transient()
        );
        assert!(
            GatewayError::HttpStatus {
                status: 429,
                message: String::new()
            }
            .is_transient()
        );
        assert!(
            !GatewayError::HttpStatus {
                status: 401,
                message: String::new()
            }
            .is_transient()
        );
        assert!(!GatewayError::InvalidResponse("no choices".into()).is_transient());
    }
}
