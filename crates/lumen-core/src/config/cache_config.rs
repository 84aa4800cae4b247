use serde::{Deserialize, Serialize};

use super::defaults;

/// Cache layer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_secs: u64,
    pub capacity: u64,
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: defaults::DEFAULT_CACHE_TTL_SECS,
            capacity: defaults::DEFAULT_CACHE_CAPACITY,
            enabled: true,
        }
    }
}
