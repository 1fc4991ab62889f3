//! Memory configuration

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Maximum total tokens to keep in history.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    /// Maximum messages to keep. 0 means unlimited.
    #[serde(default = "default_max_messages")]
    pub max_messages: usize,

    /// Message count that triggers half-split summarization. 0 disables it.
    #[serde(default)]
    pub summarize_after: usize,
}

fn default_max_tokens() -> usize {
    4000
}

fn default_max_messages() -> usize {
    100
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            max_messages: default_max_messages(),
            summarize_after: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MemoryConfig::default();
        assert_eq!(config.max_tokens, 4000);
        assert_eq!(config.max_messages, 100);
        assert_eq!(config.summarize_after, 0);
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let config: MemoryConfig = serde_yaml::from_str("max_tokens: 1000").unwrap();
        assert_eq!(config.max_tokens, 1000);
        assert_eq!(config.max_messages, 100);
        assert_eq!(config.summarize_after, 0);
    }
}
