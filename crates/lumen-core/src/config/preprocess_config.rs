use serde::{Deserialize, Serialize};

use super::defaults;

/// What to do with a document whose quality score falls below the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityPolicy {
    /// Keep the document but mark it as low quality.
    Flag,
    /// Reject the document outright.
    Reject,
}

/// Multi-stage preprocessor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Cosine similarity at or above which two documents are duplicates.
    pub dedup_threshold: f64,
    /// Upper bound on candidates compared during semantic dedup.
    pub dedup_max_candidates: usize,
    /// Quality score below which the policy applies.
    pub quality_threshold: f64,
    pub quality_policy: QualityPolicy,
    /// Minimum normalized content length for a structurally complete document.
    pub min_content_chars: usize,
    /// Raw content larger than this is a validation error.
    pub max_content_bytes: usize,
    /// Extra safety patterns (regex) appended to the built-in set.
    pub custom_safety_patterns: Vec<String>,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            dedup_threshold: defaults::DEFAULT_DEDUP_THRESHOLD,
            dedup_max_candidates: defaults::DEFAULT_DEDUP_MAX_CANDIDATES,
            quality_threshold: defaults::DEFAULT_QUALITY_THRESHOLD,
            quality_policy: QualityPolicy::Flag,
            min_content_chars: defaults::DEFAULT_MIN_CONTENT_CHARS,
            max_content_bytes: defaults::DEFAULT_MAX_CONTENT_BYTES,
            custom_safety_patterns: Vec::new(),
        }
    }
}
