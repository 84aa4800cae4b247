//! CredibilityVerifier: runs the five checks and weighs them.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use lumen_core::config::CredibilityConfig;
use lumen_core::constants::NEUTRAL_SCORE;
use lumen_core::errors::{LumenError, LumenResult};
use lumen_core::models::{ComponentScore, CredibilityComponent, CredibilityReport, Document};
use lumen_core::traits::ICorpusView;
use tracing::{debug, warn};

use crate::{consistency, source, timestamp};

/// Result of a single check before weighting.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckOutcome {
    pub score: f64,
    pub flagged: bool,
    pub detail: String,
}

impl CheckOutcome {
    pub fn new(score: f64, detail: impl Into<String>) -> Self {
        Self {
            score,
            flagged: false,
            detail: detail.into(),
        }
    }

    pub fn flagged(score: f64, detail: impl Into<String>) -> Self {
        Self {
            score,
            flagged: true,
            detail: detail.into(),
        }
    }
}

/// Weighted composite credibility scorer.
pub struct CredibilityVerifier {
    config: CredibilityConfig,
    corpus: Option<Arc<dyn ICorpusView>>,
}

impl CredibilityVerifier {
    pub fn new(config: CredibilityConfig) -> Self {
        Self {
            config,
            corpus: None,
        }
    }

    /// Enable cross-document checks against `corpus`.
    pub fn with_corpus(mut self, corpus: Arc<dyn ICorpusView>) -> Self {
        self.corpus = Some(corpus);
        self
    }

    pub fn config(&self) -> &CredibilityConfig {
        &self.config
    }

    /// Score `doc` as of now.
    pub fn verify(&self, doc: &Document) -> CredibilityReport {
        self.verify_at(doc, Utc::now())
    }

    /// Score `doc` as of `now`.
    pub fn verify_at(&self, doc: &Document, now: DateTime<Utc>) -> CredibilityReport {
        let weights = self.config.weights;
        let checks = [
            (
                CredibilityComponent::SourceReliability,
                weights.source_reliability,
                Ok(source::check(&doc.metadata, &self.config.source_reliability)),
            ),
            (
                CredibilityComponent::InternalConsistency,
                weights.internal_consistency,
                Ok(consistency::internal(&doc.content)),
            ),
            (
                CredibilityComponent::CrossDocument,
                weights.cross_document,
                consistency::cross_document(
                    self.corpus.as_deref(),
                    &doc.id,
                    &doc.content,
                    self.config.cross_document_sample,
                ),
            ),
            (
                CredibilityComponent::Quality,
                weights.quality,
                quality_check(doc),
            ),
            (
                CredibilityComponent::Timestamp,
                weights.timestamp,
                Ok(timestamp::check(
                    &doc.metadata,
                    now,
                    self.config.max_age_days,
                    self.config.clock_skew_secs,
                )),
            ),
        ];

        let components = checks
            .into_iter()
            .map(|(component, weight, outcome)| score_component(&doc.id, component, weight, outcome))
            .collect();
        let report = CredibilityReport::from_components(components, now);
        debug!(document_id = %doc.id, score = report.score, "credibility verified");
        report
    }
}

fn quality_check(doc: &Document) -> LumenResult<CheckOutcome> {
    if !doc.quality_score.is_finite() {
        return Err(LumenError::ValidationError(format!(
            "quality score {} is not finite",
            doc.quality_score
        )));
    }
    let score = doc.quality_score.clamp(0.0, 1.0);
    let low = doc.quality_flags.iter().any(|f| f == "low_quality");
    let detail = if doc.quality_flags.is_empty() {
        format!("quality {score:.2}")
    } else {
        format!("quality {score:.2} [{}]", doc.quality_flags.join(", "))
    };
    Ok(if low {
        CheckOutcome::flagged(score, detail)
    } else {
        CheckOutcome::new(score, detail)
    })
}

/// An errored or out-of-range check contributes the neutral score.
fn score_component(
    document_id: &str,
    component: CredibilityComponent,
    weight: f64,
    outcome: LumenResult<CheckOutcome>,
) -> ComponentScore {
    match outcome {
        Ok(c) if c.score.is_finite() && (0.0..=1.0).contains(&c.score) => ComponentScore {
            component,
            weight,
            score: c.score,
            errored: false,
            flagged: c.flagged,
            detail: c.detail,
        },
        Ok(c) => {
            warn!(document_id, component = component.as_str(), score = c.score, "check out of range");
            neutral(component, weight, format!("score {} out of range", c.score))
        }
        Err(e) => {
            warn!(document_id, component = component.as_str(), error = %e, "check failed");
            neutral(component, weight, e.to_string())
        }
    }
}

fn neutral(component: CredibilityComponent, weight: f64, detail: String) -> ComponentScore {
    ComponentScore {
        component,
        weight,
        score: NEUTRAL_SCORE,
        errored: true,
        flagged: false,
        detail,
    }
}
