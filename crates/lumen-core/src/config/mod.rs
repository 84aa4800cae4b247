pub mod cache_config;
pub mod credibility_config;
pub mod defaults;
pub mod embedding_config;
pub mod graph_config;
pub mod index_config;
pub mod ingestion_config;
pub mod observability_config;
pub mod preprocess_config;
pub mod retrieval_config;

pub use cache_config::CacheConfig;
pub use credibility_config::{CredibilityConfig, CredibilityWeights};
pub use embedding_config::EmbeddingConfig;
pub use graph_config::GraphConfig;
pub use index_config::IndexConfig;
pub use ingestion_config::IngestionConfig;
pub use observability_config::ObservabilityConfig;
pub use preprocess_config::{PreprocessConfig, QualityPolicy};
pub use retrieval_config::RetrievalConfig;

use serde::{Deserialize, Serialize};

use crate::errors::{LumenError, LumenResult};

/// Top-level configuration, one section per subsystem.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LumenConfig {
    pub preprocess: PreprocessConfig,
    pub credibility: CredibilityConfig,
    pub index: IndexConfig,
    pub graph: GraphConfig,
    pub cache: CacheConfig,
    pub ingestion: IngestionConfig,
    pub retrieval: RetrievalConfig,
    pub embedding: EmbeddingConfig,
    pub observability: ObservabilityConfig,
}

impl LumenConfig {
    /// Parse a TOML document. Missing sections and fields take their defaults.
    pub fn from_toml(toml_str: &str) -> LumenResult<Self> {
        let config: Self =
            toml::from_str(toml_str).map_err(|e| LumenError::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize back to TOML.
    pub fn to_toml(&self) -> LumenResult<String> {
        toml::to_string_pretty(self).map_err(|e| LumenError::ConfigError(e.to_string()))
    }

    /// Reject out-of-range values.
    pub fn validate(&self) -> LumenResult<()> {
        let unit = |name: &str, v: f64| -> LumenResult<()> {
            if (0.0..=1.0).contains(&v) {
                Ok(())
            } else {
                Err(LumenError::ValidationError(format!(
                    "{name} must be in [0, 1], got {v}"
                )))
            }
        };
        unit("preprocess.dedup_threshold", self.preprocess.dedup_threshold)?;
        unit("preprocess.quality_threshold", self.preprocess.quality_threshold)?;
        unit("graph.merge_threshold", self.graph.merge_threshold)?;
        unit(
            "retrieval.near_duplicate_threshold",
            self.retrieval.near_duplicate_threshold,
        )?;
        unit("retrieval.rerank_weight", self.retrieval.rerank_weight)?;

        let weights = &self.credibility.weights;
        for (name, w) in [
            ("source_reliability", weights.source_reliability),
            ("internal_consistency", weights.internal_consistency),
            ("cross_document", weights.cross_document),
            ("quality", weights.quality),
            ("timestamp", weights.timestamp),
        ] {
            unit(&format!("credibility.weights.{name}"), w)?;
        }
        if (weights.sum() - 1.0).abs() > 1e-6 {
            return Err(LumenError::ValidationError(format!(
                "credibility weights must sum to 1, got {}",
                weights.sum()
            )));
        }
        for (domain, score) in &self.credibility.source_reliability {
            unit(&format!("credibility.source_reliability[{domain}]"), *score)?;
        }

        if self.index.dimensions == 0 {
            return Err(LumenError::ValidationError(
                "index.dimensions must be positive".into(),
            ));
        }
        if self.index.hnsw_m < 2 {
            return Err(LumenError::ValidationError(
                "index.hnsw_m must be at least 2".into(),
            ));
        }
        if self.graph.cooccurrence_scale <= 0.0 || self.graph.proximity_scale <= 0.0 {
            return Err(LumenError::ValidationError(
                "graph scales must be positive".into(),
            ));
        }
        if self.ingestion.chunk_size_chars == 0
            || self.ingestion.chunk_overlap_chars >= self.ingestion.chunk_size_chars
        {
            return Err(LumenError::ValidationError(
                "ingestion.chunk_overlap_chars must be smaller than a non-zero chunk_size_chars"
                    .into(),
            ));
        }
        if self.ingestion.batch_concurrency == 0 {
            return Err(LumenError::ValidationError(
                "ingestion.batch_concurrency must be positive".into(),
            ));
        }
        if self.graph.query_timeout_ms == 0 {
            return Err(LumenError::ValidationError(
                "graph.query_timeout_ms must be positive".into(),
            ));
        }
        if self.retrieval.candidate_multiplier == 0 {
            return Err(LumenError::ValidationError(
                "retrieval.candidate_multiplier must be positive".into(),
            ));
        }
        Ok(())
    }
}
