//! Core types and traits for the Memoir conversation memory library

pub mod error;
pub mod message;
pub mod mock;
pub mod traits;
pub mod types;

pub use error::{MemoirError, Result};
pub use message::{ChatMessage, Role};
pub use traits::embed::Embedder;
pub use traits::memory::Memory;
pub use traits::provider::{Middleware, Provider, apply_middleware};
pub use traits::summarize::Summarizer;
pub use traits::tokens::{CharTokenCounter, TokenCounter};
pub use types::{
    CompletionRequest, CompletionResponse, EventStream, StreamEvent, TokenUsage,
};
