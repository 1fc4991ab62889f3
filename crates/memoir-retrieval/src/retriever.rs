//! Retrieval engine: embeds turns and queries, ranks stored history

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use memoir_core::{ChatMessage, Embedder, Result, Role};

use crate::store::{Document, VectorStore};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrieverConfig {
    /// Number of documents to retrieve per query.
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Minimum cosine similarity for a result to count as relevant.
    #[serde(default = "default_min_similarity")]
    pub min_similarity: f32,
}

fn default_top_k() -> usize {
    5
}

fn default_min_similarity() -> f32 {
    0.7
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            min_similarity: default_min_similarity(),
        }
    }
}

/// Wraps an [`Embedder`] and a [`VectorStore`]: turns become stored vector
/// records, queries become ranked, threshold-filtered lists of prior turns.
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    config: RetrieverConfig,
}

impl Retriever {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        mut config: RetrieverConfig,
    ) -> Self {
        if config.top_k == 0 {
            config.top_k = default_top_k();
        }
        Self {
            embedder,
            store,
            config,
        }
    }

    /// Embeds and indexes one turn under `id`. Fails only if embedding
    /// generation fails.
    pub async fn add_message(&self, message: &ChatMessage, id: impl Into<String>) -> Result<()> {
        let embedding = self.embedder.embed(&message.content).await?;

        self.store
            .add(Document {
                id: id.into(),
                content: message.content.clone(),
                embedding,
                role: Some(message.role),
            })
            .await
    }

    /// Finds prior turns relevant to `query`. Results below the similarity
    /// floor are dropped; a record without a stored role comes back as a
    /// user turn.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<ChatMessage>> {
        let query_embedding = self.embedder.embed(query).await?;

        let results = self
            .store
            .search(&query_embedding, self.config.top_k)
            .await?;

        let messages = results
            .into_iter()
            .filter(|result| result.similarity >= self.config.min_similarity)
            .map(|result| ChatMessage {
                role: result.document.role.unwrap_or(Role::User),
                content: result.document.content,
            })
            .collect();

        Ok(messages)
    }

    /// Renders retrieval results as a single delimited blob for direct
    /// prompt injection. Empty string when nothing is relevant.
    pub async fn build_context(&self, query: &str) -> Result<String> {
        let messages = self.retrieve(query).await?;
        if messages.is_empty() {
            return Ok(String::new());
        }

        let mut context = String::from("[Relevant context from previous conversations]\n");
        for message in &messages {
            context.push_str(&message.content);
            context.push_str("\n---\n");
        }
        Ok(context)
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryVectorStore;
    use memoir_core::mock::MockEmbedder;

    fn retriever(min_similarity: f32) -> (Retriever, MockEmbedder) {
        let embedder = MockEmbedder::new(2);
        let store = Arc::new(InMemoryVectorStore::new());
        let r = Retriever::new(
            Arc::new(embedder.clone()),
            store,
            RetrieverConfig {
                top_k: 5,
                min_similarity,
            },
        );
        (r, embedder)
    }

    #[tokio::test]
    async fn test_add_and_retrieve_roundtrip() {
        let (retriever, embedder) = retriever(0.5);
        embedder.set_vector("the sky is blue", vec![1.0, 0.0]);
        embedder.set_vector("what color is the sky?", vec![1.0, 0.1]);

        retriever
            .add_message(&ChatMessage::assistant("the sky is blue"), "msg_1")
            .await
            .unwrap();

        let found = retriever.retrieve("what color is the sky?").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].content, "the sky is blue");
        assert_eq!(found[0].role, Role::Assistant);
    }

    #[tokio::test]
    async fn test_similarity_floor_filters() {
        let (retriever, embedder) = retriever(0.9);
        embedder.set_vector("unrelated", vec![0.0, 1.0]);
        embedder.set_vector("query", vec![1.0, 0.0]);

        retriever
            .add_message(&ChatMessage::user("unrelated"), "msg_1")
            .await
            .unwrap();

        let found = retriever.retrieve("query").await.unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_role_defaults_to_user_when_absent() {
        let (retriever, embedder) = retriever(0.0);
        embedder.set_vector("query", vec![1.0, 0.0]);

        retriever
            .store()
            .add(Document {
                id: "legacy".to_string(),
                content: "written without a role".to_string(),
                embedding: vec![1.0, 0.0],
                role: None,
            })
            .await
            .unwrap();

        let found = retriever.retrieve("query").await.unwrap();
        assert_eq!(found[0].role, Role::User);
    }

    #[tokio::test]
    async fn test_embedding_failure_propagates() {
        let (retriever, embedder) = retriever(0.5);
        embedder.set_error("embedder offline");

        let err = retriever
            .add_message(&ChatMessage::user("hi"), "msg_1")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("embedder offline"));

        assert!(retriever.retrieve("query").await.is_err());
    }

    #[tokio::test]
    async fn test_build_context_formatting() {
        let (retriever, embedder) = retriever(0.0);
        embedder.set_vector("fact one", vec![1.0, 0.0]);
        embedder.set_vector("query", vec![1.0, 0.0]);

        retriever
            .add_message(&ChatMessage::user("fact one"), "msg_1")
            .await
            .unwrap();

        let context = retriever.build_context("query").await.unwrap();
        assert!(context.starts_with("[Relevant context from previous conversations]\n"));
        assert!(context.contains("fact one\n---\n"));
    }

    #[tokio::test]
    async fn test_build_context_empty_when_no_results() {
        let (retriever, embedder) = retriever(0.99);
        embedder.set_vector("query", vec![1.0, 0.0]);
        assert_eq!(retriever.build_context("query").await.unwrap(), "");
    }

    #[test]
    fn test_config_defaults_from_yaml() {
        let config: RetrieverConfig = serde_yaml::from_str("top_k: 3").unwrap();
        assert_eq!(config.top_k, 3);
        assert_eq!(config.min_similarity, 0.7);
    }

    #[test]
    fn test_zero_top_k_replaced_with_default() {
        let embedder = MockEmbedder::new(2);
        let r = Retriever::new(
            Arc::new(embedder),
            Arc::new(InMemoryVectorStore::new()),
            RetrieverConfig {
                top_k: 0,
                min_similarity: 0.5,
            },
        );
        assert_eq!(r.config.top_k, 5);
    }
}
