//! Bounded and retrieval-augmented conversation memory for Memoir

mod config;
mod rag;
mod summarizer;
mod token_bounded;

pub use config::MemoryConfig;
pub use memoir_core::{Memory, Summarizer};
pub use rag::RagMemory;
pub use summarizer::{LLMSummarizer, SUMMARY_SYSTEM_PROMPT, TruncatingSummarizer};
pub use token_bounded::TokenBoundedMemory;
