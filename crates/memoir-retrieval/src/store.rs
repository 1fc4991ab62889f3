//! Vector store trait and the exhaustive in-memory implementation

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use memoir_core::{Result, Role};

use crate::similarity::cosine_similarity;

/// A stored (text, vector) record. The originating message role is kept as a
/// typed field; records written by other tooling may omit it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub content: String,
    pub embedding: Vec<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

/// A search hit. Produced only by [`VectorStore::search`], never stored.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub document: Document,
    pub similarity: f32,
}

/// Stores and retrieves documents by vector similarity.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Inserts a document. Adding an id that already exists replaces the
    /// stored document in place; duplicates never coexist.
    async fn add(&self, document: Document) -> Result<()>;

    async fn add_batch(&self, documents: Vec<Document>) -> Result<()> {
        for document in documents {
            self.add(document).await?;
        }
        Ok(())
    }

    /// Returns the `min(top_k, count)` most similar documents, best first.
    async fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<SearchResult>>;

    /// Removes a document. Deleting an unknown id is a silent no-op.
    async fn delete(&self, id: &str) -> Result<()>;

    async fn clear(&self) -> Result<()>;

    fn count(&self) -> usize;
}

/// Exhaustive in-memory store. Every operation is a linear scan, which is
/// fine at conversation scale; larger corpora need a real nearest-neighbor
/// index behind the same trait.
#[derive(Default)]
pub struct InMemoryVectorStore {
    documents: RwLock<Vec<Document>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn add(&self, document: Document) -> Result<()> {
        let mut documents = self.documents.write();
        if let Some(existing) = documents.iter_mut().find(|d| d.id == document.id) {
            *existing = document;
        } else {
            documents.push(document);
        }
        Ok(())
    }

    async fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<SearchResult>> {
        let documents = self.documents.read();
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let mut results: Vec<SearchResult> = documents
            .iter()
            .map(|document| SearchResult {
                document: document.clone(),
                similarity: cosine_similarity(query, &document.embedding),
            })
            .collect();

        // Stable sort: equal similarities keep insertion order. That is the
        // documented tie-break.
        results.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        results.truncate(top_k);

        Ok(results)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.documents.write().retain(|d| d.id != id);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.documents.write().clear();
        Ok(())
    }

    fn count(&self) -> usize {
        self.documents.read().len()
    }
}
