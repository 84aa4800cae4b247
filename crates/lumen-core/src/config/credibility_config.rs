use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::defaults;

/// Component weights of the composite credibility score. Must sum to 1.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct CredibilityWeights {
    pub source_reliability: f64,
    pub internal_consistency: f64,
    pub cross_document: f64,
    pub quality: f64,
    pub timestamp: f64,
}

impl CredibilityWeights {
    pub fn sum(&self) -> f64 {
        self.source_reliability
            + self.internal_consistency
            + self.cross_document
            + self.quality
            + self.timestamp
    }
}

impl Default for CredibilityWeights {
    fn default() -> Self {
        Self {
            source_reliability: defaults::DEFAULT_WEIGHT_SOURCE,
            internal_consistency: defaults::DEFAULT_WEIGHT_INTERNAL,
            cross_document: defaults::DEFAULT_WEIGHT_CROSS_DOCUMENT,
            quality: defaults::DEFAULT_WEIGHT_QUALITY,
            timestamp: defaults::DEFAULT_WEIGHT_TIMESTAMP,
        }
    }
}

/// Credibility verifier configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CredibilityConfig {
    pub weights: CredibilityWeights,
    /// Documents retrieved longer ago than this are stale.
    pub max_age_days: i64,
    /// Tolerated clock skew before a timestamp counts as "in the future".
    pub clock_skew_secs: i64,
    /// Number of similar corpus passages compared for cross-document consistency.
    pub cross_document_sample: usize,
    /// Domain (or domain suffix such as ".gov") to reliability score.
    pub source_reliability: BTreeMap<String, f64>,
}

impl Default for CredibilityConfig {
    fn default() -> Self {
        let source_reliability = [
            (".gov", 0.9),
            (".edu", 0.85),
            (".org", 0.65),
            ("wikipedia.org", 0.75),
            ("reuters.com", 0.85),
            ("apnews.com", 0.85),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
        Self {
            weights: CredibilityWeights::default(),
            max_age_days: defaults::DEFAULT_MAX_AGE_DAYS,
            clock_skew_secs: defaults::DEFAULT_CLOCK_SKEW_SECS,
            cross_document_sample: defaults::DEFAULT_CROSS_DOCUMENT_SAMPLE,
            source_reliability,
        }
    }
}
