//! Collaborator traits consumed by the Memoir components

pub mod embed;
pub mod memory;
pub mod provider;
pub mod summarize;
pub mod tokens;

pub use embed::Embedder;
pub use memory::Memory;
pub use provider::{Middleware, Provider, apply_middleware};
pub use summarize::Summarizer;
pub use tokens::{CharTokenCounter, TokenCounter};
