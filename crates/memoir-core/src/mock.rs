//! Mock collaborators for testing
//!
//! Providers and embedders are external to this library, so every downstream
//! crate tests against these scripted stand-ins.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream;
use parking_lot::RwLock;

use crate::error::{MemoirError, Result};
use crate::traits::embed::Embedder;
use crate::traits::provider::Provider;
use crate::types::{CompletionRequest, CompletionResponse, EventStream, StreamEvent, TokenUsage};

/// Scripted provider: queued responses, error injection, call recording.
#[derive(Clone, Default)]
pub struct MockProvider {
    inner: Arc<RwLock<MockProviderInner>>,
}

#[derive(Default)]
struct MockProviderInner {
    responses: VecDeque<String>,
    error: Option<String>,
    calls: Vec<CompletionRequest>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_response(&self, content: impl Into<String>) {
        self.inner.write().responses.push_back(content.into());
    }

    /// Makes every subsequent call fail until [`clear_error`](Self::clear_error).
    pub fn set_error(&self, message: impl Into<String>) {
        self.inner.write().error = Some(message.into());
    }

    pub fn clear_error(&self) {
        self.inner.write().error = None;
    }

    pub fn call_count(&self) -> usize {
        self.inner.read().calls.len()
    }

    pub fn calls(&self) -> Vec<CompletionRequest> {
        self.inner.read().calls.clone()
    }

    pub fn last_call(&self) -> Option<CompletionRequest> {
        self.inner.read().calls.last().cloned()
    }

    fn next_content(&self, request: &CompletionRequest) -> Result<String> {
        let mut inner = self.inner.write();
        inner.calls.push(request.clone());
        if let Some(message) = &inner.error {
            return Err(MemoirError::provider(message.clone(), None));
        }
        Ok(inner
            .responses
            .pop_front()
            .unwrap_or_else(|| "Mock response".to_string()))
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        let content = self.next_content(request)?;
        let prompt_chars: usize = request.messages.iter().map(|m| m.content.len()).sum();
        let usage = TokenUsage::new((prompt_chars / 4) as u32, (content.len() / 4) as u32);
        Ok(CompletionResponse {
            content,
            model: "mock-model".to_string(),
            finish_reason: "stop".to_string(),
            usage,
        })
    }

    async fn stream(&self, request: &CompletionRequest) -> Result<EventStream> {
        let content = self.next_content(request)?;

        let words: Vec<String> = content.split_whitespace().map(String::from).collect();
        let mut events: Vec<StreamEvent> = words
            .iter()
            .enumerate()
            .map(|(i, word)| {
                if i == 0 {
                    StreamEvent::delta(word.clone())
                } else {
                    StreamEvent::delta(format!(" {word}"))
                }
            })
            .collect();
        events.push(StreamEvent::done("stop"));

        Ok(Box::pin(stream::iter(events)))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Deterministic embedder with presettable vectors and error injection.
#[derive(Clone)]
pub struct MockEmbedder {
    dimensions: usize,
    inner: Arc<RwLock<MockEmbedderInner>>,
}

#[derive(Default)]
struct MockEmbedderInner {
    vectors: HashMap<String, Vec<f32>>,
    error: Option<String>,
}

impl MockEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            inner: Arc::new(RwLock::new(MockEmbedderInner::default())),
        }
    }

    /// Pins the vector returned for an exact text. Unpinned texts get a
    /// deterministic byte-derived vector.
    pub fn set_vector(&self, text: impl Into<String>, vector: Vec<f32>) {
        self.inner.write().vectors.insert(text.into(), vector);
    }

    pub fn set_error(&self, message: impl Into<String>) {
        self.inner.write().error = Some(message.into());
    }

    pub fn clear_error(&self) {
        self.inner.write().error = None;
    }

    fn derive(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        if self.dimensions == 0 {
            return vector;
        }
        for (i, byte) in text.bytes().enumerate() {
            vector[i % self.dimensions] += byte as f32;
        }
        vector
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let inner = self.inner.read();
        if let Some(message) = &inner.error {
            return Err(MemoirError::Embedding(message.clone()));
        }
        if let Some(vector) = inner.vectors.get(text) {
            return Ok(vector.clone());
        }
        drop(inner);
        Ok(self.derive(text))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "mock"
    }
}
