//! Vector similarity store and retrieval engine for Memoir

mod retriever;
mod similarity;
mod store;

pub use retriever::{Retriever, RetrieverConfig};
pub use similarity::cosine_similarity;
pub use store::{Document, InMemoryVectorStore, SearchResult, VectorStore};
