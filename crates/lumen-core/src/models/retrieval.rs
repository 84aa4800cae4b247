use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Restrictions applied to a search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilters {
    pub document_ids: Option<BTreeSet<String>>,
    pub bucket: Option<String>,
    pub min_credibility: Option<f64>,
}

/// A retrieval query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub top_k: usize,
    #[serde(default)]
    pub filters: SearchFilters,
    #[serde(default)]
    pub enable_kg_expansion: bool,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>, top_k: usize) -> Self {
        Self {
            query: query.into(),
            top_k,
            filters: SearchFilters::default(),
            enable_kg_expansion: false,
        }
    }

    pub fn with_kg_expansion(mut self, enabled: bool) -> Self {
        self.enable_kg_expansion = enabled;
        self
    }

    pub fn with_filters(mut self, filters: SearchFilters) -> Self {
        self.filters = filters;
        self
    }
}

/// How a result entered the candidate set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HitSource {
    Vector,
    GraphExpansion,
}

/// Where a result came from and how it was scored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub chunk_id: String,
    pub origin: Option<String>,
    pub source: HitSource,
    pub vector_score: f64,
    pub rerank_score: Option<f64>,
    /// Entities that led graph expansion to this chunk.
    pub via_entities: Vec<String>,
}

/// One ranked result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub document_id: String,
    pub chunk_offset: usize,
    pub score: f64,
    pub credibility_score: f64,
    pub snippet: String,
    pub provenance: Provenance,
}

/// An optional stage that was skipped or fell back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DegradedStage {
    pub stage: String,
    pub reason: String,
}

/// The full answer to a search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<SearchHit>,
    pub cached: bool,
    /// Empty for a fully ranked result.
    pub degraded: Vec<DegradedStage>,
    pub fingerprint: String,
}

impl SearchResponse {
    pub fn is_degraded(&self) -> bool {
        !self.degraded.is_empty()
    }
}
