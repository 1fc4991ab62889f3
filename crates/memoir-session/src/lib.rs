//! Conversation session state machine for Memoir

mod chat;

pub use chat::{AutocompactConfig, ChatSession};
