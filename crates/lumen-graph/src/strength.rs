//! Relation strength from accumulated evidence.
//!
//! strength = 0.5 * co-occurrence + 0.3 * proximity + 0.2 * credibility, where
//! co-occurrence = 1 - e^(-n / cooccurrence_scale) over n evidence documents,
//! proximity = mean of 1 / (1 + distance / proximity_scale), and
//! credibility = mean evidence credibility.

use std::collections::BTreeMap;

use lumen_core::config::GraphConfig;
use lumen_core::models::EvidenceStats;

pub const COOCCURRENCE_WEIGHT: f64 = 0.5;
pub const PROXIMITY_WEIGHT: f64 = 0.3;
pub const CREDIBILITY_WEIGHT: f64 = 0.2;

#[derive(Debug, Clone, Copy)]
pub struct StrengthParams {
    pub cooccurrence_scale: f64,
    pub proximity_scale: f64,
}

impl From<&GraphConfig> for StrengthParams {
    fn from(config: &GraphConfig) -> Self {
        Self {
            cooccurrence_scale: config.cooccurrence_scale,
            proximity_scale: config.proximity_scale,
        }
    }
}

/// Strength in [0, 1]. Empty evidence has strength 0.
pub fn compute(evidence: &BTreeMap<String, EvidenceStats>, params: StrengthParams) -> f64 {
    if evidence.is_empty() {
        return 0.0;
    }
    let n = evidence.len() as f64;
    let cooccurrence = 1.0 - (-n / params.cooccurrence_scale.max(f64::EPSILON)).exp();
    let proximity = evidence
        .values()
        .map(|e| 1.0 / (1.0 + e.min_distance as f64 / params.proximity_scale.max(f64::EPSILON)))
        .sum::<f64>()
        / n;
    let credibility = evidence
        .values()
        .map(|e| e.credibility.clamp(0.0, 1.0))
        .sum::<f64>()
        / n;

    let raw = COOCCURRENCE_WEIGHT * cooccurrence
        + PROXIMITY_WEIGHT * proximity
        + CREDIBILITY_WEIGHT * credibility;
    if raw.is_finite() {
        raw.clamp(0.0, 1.0)
    } else {
        0.0
    }
}
