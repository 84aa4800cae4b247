use serde::{Deserialize, Serialize};

use super::defaults;

/// Vector index configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Vector dimensionality accepted by the index.
    pub dimensions: usize,
    /// Live entry count at which search switches from exact scan to ANN.
    pub ann_threshold: usize,
    /// Max neighbors per node on upper HNSW layers (layer 0 keeps 2x).
    pub hnsw_m: usize,
    pub hnsw_ef_construction: usize,
    pub hnsw_ef_search: usize,
    /// Default snapshot location.
    pub snapshot_path: Option<String>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            dimensions: defaults::DEFAULT_EMBEDDING_DIMENSIONS,
            ann_threshold: defaults::DEFAULT_ANN_THRESHOLD,
            hnsw_m: defaults::DEFAULT_HNSW_M,
            hnsw_ef_construction: defaults::DEFAULT_HNSW_EF_CONSTRUCTION,
            hnsw_ef_search: defaults::DEFAULT_HNSW_EF_SEARCH,
            snapshot_path: None,
        }
    }
}
