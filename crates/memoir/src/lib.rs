//! Memoir: context window management and retrieval-augmented memory for
//! LLM conversations
//!
//! The pieces compose bottom-up: a token-bounded history buffer, an
//! optional retrieval layer over an in-process vector store, and a
//! conversation session that feeds a provider from the managed window and
//! compacts history as it grows.

pub mod error {
    pub use memoir_core::{MemoirError, Result};
}

pub mod message {
    pub use memoir_core::{ChatMessage, Role};
}

pub mod provider {
    pub use memoir_core::{
        CompletionRequest, CompletionResponse, EventStream, Middleware, Provider, StreamEvent,
        TokenUsage, apply_middleware,
    };
}

pub mod memory {
    pub use memoir_core::{CharTokenCounter, Memory, Summarizer, TokenCounter};
    pub use memoir_memory::{
        LLMSummarizer, MemoryConfig, RagMemory, SUMMARY_SYSTEM_PROMPT, TokenBoundedMemory,
        TruncatingSummarizer,
    };
}

pub mod retrieval {
    pub use memoir_core::Embedder;
    pub use memoir_retrieval::{
        Document, InMemoryVectorStore, Retriever, RetrieverConfig, SearchResult, VectorStore,
        cosine_similarity,
    };
}

pub mod session {
    pub use memoir_session::{AutocompactConfig, ChatSession};
}

pub mod mock {
    pub use memoir_core::mock::{MockEmbedder, MockProvider};
}
