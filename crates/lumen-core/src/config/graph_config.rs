use serde::{Deserialize, Serialize};

use super::defaults;

/// Knowledge graph configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Contextual overlap a same-named candidate needs before it is merged.
    pub merge_threshold: f64,
    /// Evidence count at which co-occurrence saturates (1 - e^-n/scale).
    pub cooccurrence_scale: f64,
    /// Token distance at which proximity halves.
    pub proximity_scale: f64,
    pub max_traversal_depth: usize,
    pub neighbor_limit: usize,
    /// Neighboring sentences (each side) considered for co-occurrence.
    pub sentence_window: usize,
    /// Bound on `query_with_timeout`.
    pub query_timeout_ms: u64,
    pub snapshot_path: Option<String>,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            merge_threshold: defaults::DEFAULT_MERGE_THRESHOLD,
            cooccurrence_scale: defaults::DEFAULT_COOCCURRENCE_SCALE,
            proximity_scale: defaults::DEFAULT_PROXIMITY_SCALE,
            max_traversal_depth: defaults::DEFAULT_MAX_TRAVERSAL_DEPTH,
            neighbor_limit: defaults::DEFAULT_NEIGHBOR_LIMIT,
            sentence_window: defaults::DEFAULT_SENTENCE_WINDOW,
            query_timeout_ms: defaults::DEFAULT_GRAPH_QUERY_TIMEOUT_MS,
            snapshot_path: None,
        }
    }
}
