use serde::{Deserialize, Serialize};

use super::defaults;

/// Retrieval engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub default_top_k: usize,
    /// Vector search fetches `top_k * candidate_multiplier` candidates.
    pub candidate_multiplier: usize,
    pub timeout_ms: u64,
    /// Snippet similarity at or above which two results are near-duplicates.
    pub near_duplicate_threshold: f64,
    /// Max results from one source document.
    pub max_per_document: usize,
    /// Max related entities pulled in by graph expansion.
    pub kg_expansion_limit: usize,
    /// Share of the final score taken from the reranker (rest is vector score).
    pub rerank_weight: f64,
    pub query_expansion: bool,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_top_k: defaults::DEFAULT_TOP_K,
            candidate_multiplier: defaults::DEFAULT_CANDIDATE_MULTIPLIER,
            timeout_ms: defaults::DEFAULT_QUERY_TIMEOUT_MS,
            near_duplicate_threshold: defaults::DEFAULT_NEAR_DUPLICATE_THRESHOLD,
            max_per_document: defaults::DEFAULT_MAX_PER_DOCUMENT,
            kg_expansion_limit: defaults::DEFAULT_KG_EXPANSION_LIMIT,
            rerank_weight: defaults::DEFAULT_RERANK_WEIGHT,
            query_expansion: defaults::DEFAULT_QUERY_EXPANSION,
        }
    }
}
