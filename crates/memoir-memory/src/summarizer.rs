//! Summarizer implementations

use std::sync::Arc;

use async_trait::async_trait;

use memoir_core::{
    ChatMessage, CompletionRequest, MemoirError, Provider, Result, Summarizer,
};

pub const SUMMARY_SYSTEM_PROMPT: &str = "\
Summarize the following conversation concisely, preserving:
- Key facts and information shared
- Important decisions or conclusions
- Relevant context for future messages
Keep the summary brief (2-4 sentences). Do not include meta-commentary.";

/// Truncates to at most `max` characters, appending an ellipsis when
/// anything was cut. Char-based so multi-byte content never splits.
fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max).collect();
    out.push_str("...");
    out
}

/// Model-driven summarizer: one low-temperature completion call per batch.
pub struct LLMSummarizer {
    provider: Arc<dyn Provider>,
    model: Option<String>,
}

impl LLMSummarizer {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self {
            provider,
            model: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

#[async_trait]
impl Summarizer for LLMSummarizer {
    async fn summarize(&self, messages: &[ChatMessage]) -> Result<String> {
        if messages.is_empty() {
            return Ok(String::new());
        }

        let mut conversation = String::new();
        for message in messages {
            conversation.push_str(&format!("{}: {}\n", message.role, message.content));
        }

        let mut request = CompletionRequest::new(vec![ChatMessage::user(conversation)])
            .with_system_prompt(SUMMARY_SYSTEM_PROMPT)
            .with_max_tokens(500)
            .with_temperature(0.3);
        request.model = self.model.clone();

        let response = self
            .provider
            .complete(&request)
            .await
            .map_err(|err| MemoirError::Summarization(err.to_string()))?;

        Ok(response.content.trim().to_string())
    }
}

/// Deterministic fallback: stitches short excerpts together, no model call.
pub struct TruncatingSummarizer {
    max_length: usize,
}

impl TruncatingSummarizer {
    pub fn new(max_length: usize) -> Self {
        Self {
            max_length: if max_length == 0 { 500 } else { max_length },
        }
    }
}

impl Default for TruncatingSummarizer {
    fn default() -> Self {
        Self::new(500)
    }
}

#[async_trait]
impl Summarizer for TruncatingSummarizer {
    async fn summarize(&self, messages: &[ChatMessage]) -> Result<String> {
        if messages.is_empty() {
            return Ok(String::new());
        }

        let mut out = String::from("[Conversation excerpt] ");
        for message in messages {
            if out.chars().count() >= self.max_length {
                break;
            }
            let excerpt = truncate_chars(&message.content, 100);
            out.push_str(&format!("{}: {} | ", message.role, excerpt));
        }

        Ok(truncate_chars(&out, self.max_length))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memoir_core::mock::MockProvider;

    #[tokio::test]
    async fn test_llm_summarizer_formats_conversation() {
        let provider = MockProvider::new();
        provider.push_response("  a tidy summary  ");

        let summarizer = LLMSummarizer::new(Arc::new(provider.clone()));
        let messages = vec![
            ChatMessage::user("where do axolotls live?"),
            ChatMessage::assistant("lake Xochimilco"),
        ];

        let summary = summarizer.summarize(&messages).await.unwrap();
        assert_eq!(summary, "a tidy summary");

        let call = provider.last_call().unwrap();
        assert_eq!(call.system_prompt.as_deref(), Some(SUMMARY_SYSTEM_PROMPT));
        assert_eq!(call.max_tokens, Some(500));
        assert_eq!(call.temperature, Some(0.3));
        assert!(call.messages[0].content.contains("user: where do axolotls live?"));
        assert!(call.messages[0].content.contains("assistant: lake Xochimilco"));
    }

    #[tokio::test]
    async fn test_llm_summarizer_empty_input() {
        let provider = MockProvider::new();
        let summarizer = LLMSummarizer::new(Arc::new(provider.clone()));
        assert_eq!(summarizer.summarize(&[]).await.unwrap(), "");
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_llm_summarizer_wraps_provider_error() {
        let provider = MockProvider::new();
        provider.set_error("quota exceeded");

        let summarizer = LLMSummarizer::new(Arc::new(provider));
        let err = summarizer
            .summarize(&[ChatMessage::user("hi")])
            .await
            .unwrap_err();
        assert!(matches!(err, MemoirError::Summarization(_)));
    }

    #[tokio::test]
    async fn test_llm_summarizer_with_model() {
        let provider = MockProvider::new();
        provider.push_response("ok");

        let summarizer = LLMSummarizer::new(Arc::new(provider.clone())).with_model("small-model");
        summarizer.summarize(&[ChatMessage::user("hi")]).await.unwrap();
        assert_eq!(provider.last_call().unwrap().model.as_deref(), Some("small-model"));
    }

    #[tokio::test]
    async fn test_truncating_summarizer_excerpts() {
        let summarizer = TruncatingSummarizer::new(500);
        let messages = vec![
            ChatMessage::user("short question"),
            ChatMessage::assistant("a".repeat(150)),
        ];

        let summary = summarizer.summarize(&messages).await.unwrap();
        assert!(summary.starts_with("[Conversation excerpt] "));
        assert!(summary.contains("user: short question | "));
        // The long message is cut at 100 chars.
        assert!(summary.contains(&format!("assistant: {}...", "a".repeat(100))));
    }

    #[tokio::test]
    async fn test_truncating_summarizer_caps_total_length() {
        let summarizer = TruncatingSummarizer::new(50);
        let messages: Vec<ChatMessage> =
            (0..10).map(|i| ChatMessage::user(format!("message number {i}"))).collect();

        let summary = summarizer.summarize(&messages).await.unwrap();
        assert!(summary.chars().count() <= 53); // 50 + "..."
    }

    #[tokio::test]
    async fn test_truncating_summarizer_empty_input() {
        let summarizer = TruncatingSummarizer::default();
        assert_eq!(summarizer.summarize(&[]).await.unwrap(), "");
    }

    #[test]
    fn test_truncate_chars_multibyte_safe() {
        let text = "héllo wörld";
        let cut = truncate_chars(text, 4);
        assert_eq!(cut, "héll...");
    }
}
