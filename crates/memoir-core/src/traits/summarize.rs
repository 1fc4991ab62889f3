//! Summarizer trait for compacting conversation history

use async_trait::async_trait;

use crate::error::Result;
use crate::message::ChatMessage;

/// Collapses a list of turns into a short text.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, messages: &[ChatMessage]) -> Result<String>;
}
