//! Memory trait for conversation storage

use async_trait::async_trait;

use crate::error::Result;
use crate::message::ChatMessage;

/// Conversation memory with token-aware retrieval.
///
/// `get_messages` packs recent history into a token budget;
/// `get_relevant` may additionally pull in topically related turns when the
/// implementation supports retrieval.
#[async_trait]
pub trait Memory: Send + Sync {
    async fn add(&self, message: ChatMessage) -> Result<()>;

    /// Returns a suffix of history whose total estimated token cost fits
    /// within `max_tokens`. A budget of 0 means the implementation's
    /// configured default.
    async fn get_messages(&self, max_tokens: usize) -> Result<Vec<ChatMessage>>;

    /// Returns messages relevant to `query`. Implementations without
    /// retrieval support fall back to `get_messages`.
    async fn get_relevant(&self, query: &str, top_k: usize) -> Result<Vec<ChatMessage>>;

    async fn clear(&self) -> Result<()>;

    fn count(&self) -> usize;

    fn token_count(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.count() == 0
    }
}
