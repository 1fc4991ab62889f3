//! Token-bounded history buffer with optional half-split summarization

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use memoir_core::{
    ChatMessage, CharTokenCounter, Memory, Result, Summarizer, TokenCounter,
};

use crate::config::MemoryConfig;

/// Appends a new summary segment, blank-line separated from what is already
/// accumulated.
pub(crate) fn append_summary(standing: &mut String, segment: &str) {
    if standing.is_empty() {
        standing.push_str(segment);
    } else {
        standing.push_str("\n\n");
        standing.push_str(segment);
    }
}

struct Buffer {
    messages: Vec<ChatMessage>,
    token_counts: Vec<usize>,
    total_tokens: usize,
    summary: String,
}

impl Buffer {
    fn new() -> Self {
        Self {
            messages: Vec::new(),
            token_counts: Vec::new(),
            total_tokens: 0,
            summary: String::new(),
        }
    }

    /// Evicts the `count` oldest messages and their tallies.
    fn evict_front(&mut self, count: usize) {
        let count = count.min(self.messages.len());
        let removed: usize = self.token_counts.drain(..count).sum();
        self.total_tokens -= removed;
        self.messages.drain(..count);
    }
}

/// In-memory conversation buffer enforcing a message-count ceiling and a
/// token-cost ceiling. `messages` and `token_counts` stay index-aligned;
/// `total_tokens` is always their sum.
///
/// With a summarizer configured, growing past `summarize_after` collapses the
/// older half of the buffer into the standing summary. The summarizer runs
/// without the buffer lock held, so concurrent readers never wait on it.
#[derive(Clone)]
pub struct TokenBoundedMemory {
    inner: Arc<RwLock<Buffer>>,
    config: MemoryConfig,
    counter: Arc<dyn TokenCounter>,
    summarizer: Option<Arc<dyn Summarizer>>,
}

impl TokenBoundedMemory {
    pub fn new(config: MemoryConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Buffer::new())),
            config,
            counter: Arc::new(CharTokenCounter),
            summarizer: None,
        }
    }

    pub fn with_token_counter(mut self, counter: Arc<dyn TokenCounter>) -> Self {
        self.counter = counter;
        self
    }

    pub fn with_summarizer(mut self, summarizer: Arc<dyn Summarizer>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    /// The standing summary of everything evicted by summarization so far.
    pub fn summary(&self) -> String {
        self.inner.read().summary.clone()
    }

    /// Decides under the lock whether a summarization pass is due, and if so
    /// captures the older half to hand to the summarizer.
    fn summarization_batch(
        &self,
        buffer: &Buffer,
    ) -> Option<(Arc<dyn Summarizer>, usize, Vec<ChatMessage>)> {
        let summarizer = self.summarizer.as_ref()?;
        if self.config.summarize_after == 0 {
            return None;
        }
        let len = buffer.messages.len();
        // The half guard keeps a freshly summarized buffer from immediately
        // re-triggering.
        if len <= self.config.summarize_after || len <= self.config.summarize_after / 2 {
            return None;
        }
        let split = len / 2;
        Some((
            Arc::clone(summarizer),
            split,
            buffer.messages[..split].to_vec(),
        ))
    }

    fn trim_to_limits(&self, buffer: &mut Buffer) {
        // Count ceiling first, then token ceiling. The order is part of the
        // contract.
        if self.config.max_messages > 0 && buffer.messages.len() > self.config.max_messages {
            let excess = buffer.messages.len() - self.config.max_messages;
            buffer.evict_front(excess);
        }

        while self.config.max_tokens > 0
            && buffer.total_tokens > self.config.max_tokens
            && !buffer.messages.is_empty()
        {
            buffer.evict_front(1);
        }
    }
}

#[async_trait]
impl Memory for TokenBoundedMemory {
    async fn add(&self, message: ChatMessage) -> Result<()> {
        let pending = {
            let mut buffer = self.inner.write();
            let tokens = self.counter.count(&message.content);
            buffer.messages.push(message);
            buffer.token_counts.push(tokens);
            buffer.total_tokens += tokens;
            self.summarization_batch(&buffer)
        };

        if let Some((summarizer, split, batch)) = pending {
            match summarizer.summarize(&batch).await {
                Ok(segment) => {
                    let mut buffer = self.inner.write();
                    // The lock was released during the call. Concurrent adds
                    // only append at the back, so evicting the captured front
                    // half is still correct; a concurrent clear leaves the
                    // buffer shorter and we skip.
                    if buffer.messages.len() >= split {
                        append_summary(&mut buffer.summary, &segment);
                        buffer.evict_front(split);
                    }
                }
                Err(err) => {
                    tracing::warn!(error = %err, "summarization failed; trimming without summary");
                }
            }
        }

        let mut buffer = self.inner.write();
        self.trim_to_limits(&mut buffer);
        Ok(())
    }

    async fn get_messages(&self, max_tokens: usize) -> Result<Vec<ChatMessage>> {
        let buffer = self.inner.read();
        let max_tokens = if max_tokens == 0 {
            self.config.max_tokens
        } else {
            max_tokens
        };

        let mut used = 0;
        let mut result = Vec::new();

        if !buffer.summary.is_empty() {
            let summary_tokens = self.counter.count(&buffer.summary);
            if summary_tokens < max_tokens {
                result.push(ChatMessage::system(format!(
                    "[Previous conversation summary]\n{}",
                    buffer.summary
                )));
                used += summary_tokens;
            }
        }

        // Greedy recency-first packing: walk backward, stop at the first
        // message that would blow the budget.
        let mut tail = Vec::new();
        for i in (0..buffer.messages.len()).rev() {
            let tokens = buffer.token_counts[i];
            if used + tokens > max_tokens {
                break;
            }
            tail.push(buffer.messages[i].clone());
            used += tokens;
        }
        tail.reverse();
        result.extend(tail);

        Ok(result)
    }

    async fn get_relevant(&self, _query: &str, _top_k: usize) -> Result<Vec<ChatMessage>> {
        // No retrieval support here; recency is all we have.
        self.get_messages(self.config.max_tokens).await
    }

    async fn clear(&self) -> Result<()> {
        let mut buffer = self.inner.write();
        buffer.messages.clear();
        buffer.token_counts.clear();
        buffer.total_tokens = 0;
        buffer.summary.clear();
        Ok(())
    }

    fn count(&self) -> usize {
        self.inner.read().messages.len()
    }

    fn token_count(&self) -> usize {
        self.inner.read().total_tokens
    }
}
