//! Completion request/response types exchanged with providers

use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::message::ChatMessage;

/// A completion request handed to a [`crate::Provider`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub stop: Vec<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

impl CompletionRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            ..Default::default()
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        let prompt = prompt.into();
        if !prompt.is_empty() {
            self.system_prompt = Some(prompt);
        }
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub content: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub finish_reason: String,
    #[serde(default)]
    pub usage: TokenUsage,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// One incremental event from a streaming completion. The consumer drains
/// events until `done` is set or an `error` is carried.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamEvent {
    pub content: String,
    #[serde(default)]
    pub done: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StreamEvent {
    pub fn delta(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn done(finish_reason: impl Into<String>) -> Self {
        Self {
            done: true,
            finish_reason: Some(finish_reason.into()),
            ..Default::default()
        }
    }
}

/// Boxed stream of incremental completion events.
pub type EventStream = std::pin::Pin<Box<dyn Stream<Item = StreamEvent> + Send>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_skips_unset_fields() {
        let req = CompletionRequest::new(vec![ChatMessage::user("hi")]);
        let json = serde_json::to_string(&req).unwrap();
        assert_eq!(json, r#"{"messages":[{"role":"user","content":"hi"}]}"#);
    }

    #[test]
    fn test_request_builder() {
        let req = CompletionRequest::new(vec![])
            .with_system_prompt("be brief")
            .with_max_tokens(500)
            .with_temperature(0.3);
        assert_eq!(req.system_prompt.as_deref(), Some("be brief"));
        assert_eq!(req.max_tokens, Some(500));
        assert_eq!(req.temperature, Some(0.3));
    }

    #[test]
    fn test_empty_system_prompt_not_set() {
        let req = CompletionRequest::new(vec![]).with_system_prompt("");
        assert!(req.system_prompt.is_none());
    }

    #[test]
    fn test_token_usage_total() {
        let usage = TokenUsage::new(10, 5);
        assert_eq!(usage.total_tokens, 15);
    }
}
