//! Wire formats for the supported chat APIs
//!
//! Only the fields this crate reads or writes are modeled; unknown response
//! fields are ignored.

use pitfall_application::GatewayError;
use serde::{Deserialize, Serialize};

// ==================== OpenAI chat completions ====================

#[derive(Debug, Serialize)]
pub struct ChatMessage<'a> {
    pub role: &'a str,
    pub content: &'a str,
}

#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessage<'a>>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl<'a> ChatCompletionRequest<'a> {
    pub fn new(model: &'a str, system: &'a str, user: &'a str) -> Self {
        let mut messages = Vec::with_capacity(2);
        if !system.is_empty() {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: user,
        });
        Self {
            model,
            messages,
            max_tokens: 2000,
            temperature: 0.3,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Text of the first choice
pub fn parse_chat_completion(body: &str) -> Result<String, GatewayError> {
    let response: ChatCompletionResponse =
        serde_json::from_str(body).map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| GatewayError::InvalidResponse("response has no message content".to_string()))
}

// ==================== Anthropic messages ====================

#[derive(Debug, Serialize)]
pub struct MessagesRequest<'a> {
    pub model: &'a str,
    #[serde(skip_serializing_if = "is_blank")]
    pub system: &'a str,
    pub messages: Vec<ChatMessage<'a>>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl<'a> MessagesRequest<'a> {
    pub fn new(model: &'a str, system: &'a str, user: &'a str) -> Self {
        Self {
            model,
            system,
            messages: vec![ChatMessage {
                role: "user",
                content: user,
            }],
            max_tokens: 2000,
            temperature: 0.3,
        }
    }
}

fn is_blank(s: &&str) -> bool {
    s.trim().is_empty()
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// Concatenated text blocks of a messages response
pub fn parse_messages(body: &str) -> Result<String, GatewayError> {
    let response: MessagesResponse =
        serde_json::from_str(body).map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
    let text: String = response
        .content
        .into_iter()
        .filter(|block| block.kind == "text")
        .filter_map(|block| block.text)
        .collect();
    if text.is_empty() {
        return Err(GatewayError::InvalidResponse(
            "response has no text content".to_string(),
        ));
    }
    Ok(text)
}

// ==================== Errors ====================

/// Provider error message from an error body, falling back to the raw text
pub fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| pitfall_domain::truncate_str(body.trim(), 300).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_request_shape() {
        let mut request = ChatCompletionRequest::new("gpt-4o-mini", "sys", "hello");
        request.max_tokens = 100;
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hello");
        assert_eq!(json["max_tokens"], 100);
    }

    #[test]
    fn test_messages_request_omits_empty_system() {
        let json = serde_json::to_value(MessagesRequest::new("claude", "", "hi")).unwrap();
        assert!(json.get("system").is_none());
        assert_eq!(json["messages"][0]["role"], "user");
    }

    #[test]
    fn test_parse_chat_completion() {
        let body = r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"{\"conflicts\":[]}"}}]}"#;
        assert_eq!(parse_chat_completion(body).unwrap(), r#"{"conflicts":[]}"#);
        assert!(matches!(
            parse_chat_completion(r#"{"choices":[]}"#),
            Err(GatewayError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_parse_messages() {
        let body = r#"{"content":[{"type":"text","text":"part one "},{"type":"tool_use","id":"t"},{"type":"text","text":"part two"}]}"#;
        assert_eq!(parse_messages(body).unwrap(), "part one part two");
        assert!(parse_messages(r#"{"content":[]}"#).is_err());
    }

    #[test]
    fn test_error_message() {
        let body = r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error"}}"#;
        assert_eq!(error_message(body), "Incorrect API key provided");
        assert_eq!(error_message("Bad Gateway"), "Bad Gateway");
    }
}
