use serde::{Deserialize, Serialize};

use super::defaults;

/// Embedding capability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Provider name: "hashed-tfidf" is the built-in always-available provider.
    pub provider: String,
    pub l1_cache_size: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: defaults::DEFAULT_EMBEDDING_PROVIDER.to_string(),
            l1_cache_size: defaults::DEFAULT_L1_CACHE_SIZE,
        }
    }
}
