//! Retrieval-augmented memory: bounded recency plus similarity search

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;

use memoir_core::{ChatMessage, Memory, Result, Summarizer, TokenCounter};
use memoir_retrieval::Retriever;

use crate::config::MemoryConfig;
use crate::token_bounded::TokenBoundedMemory;

/// Length of the content prefix used as the merge dedup key. Deliberately
/// coarse: two long turns sharing a prefix collapse into one. Kept for
/// compatibility with the established merge output.
const DEDUP_PREFIX_CHARS: usize = 100;

/// Composes a [`TokenBoundedMemory`] with a [`Retriever`]. Every turn lands
/// in both; eviction from the bounded window never touches the retrieval
/// copy, so the index only shrinks on explicit delete or clear.
pub struct RagMemory {
    recent: TokenBoundedMemory,
    retriever: Arc<Retriever>,
    next_id: AtomicU64,
    config: MemoryConfig,
}

impl RagMemory {
    pub fn new(retriever: Arc<Retriever>, config: MemoryConfig) -> Self {
        Self {
            recent: TokenBoundedMemory::new(config.clone()),
            retriever,
            next_id: AtomicU64::new(0),
            config,
        }
    }

    pub fn with_token_counter(mut self, counter: Arc<dyn TokenCounter>) -> Self {
        self.recent = self.recent.with_token_counter(counter);
        self
    }

    pub fn with_summarizer(mut self, summarizer: Arc<dyn Summarizer>) -> Self {
        self.recent = self.recent.with_summarizer(summarizer);
        self
    }

    pub fn summary(&self) -> String {
        self.recent.summary()
    }

    pub fn retriever(&self) -> &Arc<Retriever> {
        &self.retriever
    }

    fn dedup_key(content: &str) -> String {
        content.chars().take(DEDUP_PREFIX_CHARS).collect()
    }
}

#[async_trait]
impl Memory for RagMemory {
    async fn add(&self, message: ChatMessage) -> Result<()> {
        self.recent.add(message.clone()).await?;

        // The dual write is not transactional: the bounded buffer's success
        // is what the caller observes. A failed index write only costs
        // retrieval completeness.
        let id = format!("msg_{}", self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        if let Err(err) = self.retriever.add_message(&message, id).await {
            tracing::warn!(error = %err, "failed to index message for retrieval");
        }

        Ok(())
    }

    async fn get_messages(&self, max_tokens: usize) -> Result<Vec<ChatMessage>> {
        self.recent.get_messages(max_tokens).await
    }

    async fn get_relevant(&self, query: &str, _top_k: usize) -> Result<Vec<ChatMessage>> {
        // Recent turns get half the budget; retrieval fills in the rest.
        // The per-query result count is fixed by the retriever config.
        let recent = self.recent.get_messages(self.config.max_tokens / 2).await?;

        let relevant = match self.retriever.retrieve(query).await {
            Ok(messages) => messages,
            Err(err) => {
                tracing::debug!(error = %err, "retrieval search failed; recency-only results");
                return Ok(recent);
            }
        };

        let mut seen = HashSet::new();
        let mut merged = Vec::new();
        for message in recent.into_iter().chain(relevant) {
            if seen.insert(Self::dedup_key(&message.content)) {
                merged.push(message);
            }
        }

        Ok(merged)
    }

    async fn clear(&self) -> Result<()> {
        // Unlike add, clear touches durable state on both sides and must
        // surface either failure.
        self.recent.clear().await?;
        self.retriever.store().clear().await
    }

    fn count(&self) -> usize {
        self.recent.count()
    }

    fn token_count(&self) -> usize {
        self.recent.token_count()
    }
}
