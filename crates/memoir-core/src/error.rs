//! Error types shared across the Memoir crates

use thiserror::Error;

pub type Result<T> = std::result::Result<T, MemoirError>;

/// Errors produced by Memoir components and their collaborators.
///
/// Only provider failures surfaced by [`crate::Provider`] implementations are
/// expected to reach the end of a conversation turn; summarization, indexing
/// and retrieval failures are recovered close to where they occur.
#[derive(Debug, Error)]
pub enum MemoirError {
    #[error("provider error: {message}")]
    Provider {
        message: String,
        status: Option<u16>,
    },

    #[error("network error: {0}")]
    Network(String),

    #[error("rate limited by provider (retry after {retry_after:?})")]
    RateLimited {
        retry_after: Option<std::time::Duration>,
    },

    #[error("embedding error: {0}")]
    Embedding(String),

    #[error("summarization failed: {0}")]
    Summarization(String),

    #[error("vector store error: {0}")]
    Store(String),

    #[error("request canceled")]
    Canceled,

    #[error("{0}")]
    Other(String),
}

impl MemoirError {
    pub fn provider(message: impl Into<String>, status: Option<u16>) -> Self {
        Self::Provider {
            message: message.into(),
            status,
        }
    }

    /// Rate-limit and server-side provider errors are worth retrying;
    /// everything else is not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Network(_) => true,
            Self::Provider { status, .. } => {
                matches!(status, Some(code) if *code == 429 || *code >= 500)
            }
            _ => false,
        }
    }
}
