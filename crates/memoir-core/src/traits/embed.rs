//! Embedding generation

use async_trait::async_trait;

use crate::error::Result;

/// Generates vector embeddings from text.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }

    /// Output vector dimensionality.
    fn dimensions(&self) -> usize;

    fn name(&self) -> &str;
}
