//! Token counting

/// Estimates the token cost of a piece of text. Pure and synchronous.
pub trait TokenCounter: Send + Sync {
    fn count(&self, text: &str) -> usize;
}

/// Default heuristic: roughly four characters per token.
#[derive(Debug, Clone, Copy, Default)]
pub struct CharTokenCounter;

impl TokenCounter for CharTokenCounter {
    fn count(&self, text: &str) -> usize {
        text.len() / 4
    }
}
