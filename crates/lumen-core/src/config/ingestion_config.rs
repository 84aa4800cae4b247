use serde::{Deserialize, Serialize};

use super::defaults;

/// Ingestion gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    /// Bound on a single document's pipeline.
    pub timeout_ms: u64,
    /// Max documents processed concurrently within one batch.
    pub batch_concurrency: usize,
    pub chunk_size_chars: usize,
    pub chunk_overlap_chars: usize,
    /// Extract entities into the knowledge graph on ingest.
    pub build_graph: bool,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            timeout_ms: defaults::DEFAULT_INGEST_TIMEOUT_MS,
            batch_concurrency: defaults::DEFAULT_BATCH_CONCURRENCY,
            chunk_size_chars: defaults::DEFAULT_CHUNK_SIZE_CHARS,
            chunk_overlap_chars: defaults::DEFAULT_CHUNK_OVERLAP_CHARS,
            build_graph: true,
        }
    }
}
