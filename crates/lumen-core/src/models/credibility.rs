use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The five weighted components of a credibility score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredibilityComponent {
    SourceReliability,
    InternalConsistency,
    CrossDocument,
    Quality,
    Timestamp,
}

impl CredibilityComponent {
    pub const ALL: [CredibilityComponent; 5] = [
        CredibilityComponent::SourceReliability,
        CredibilityComponent::InternalConsistency,
        CredibilityComponent::CrossDocument,
        CredibilityComponent::Quality,
        CredibilityComponent::Timestamp,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CredibilityComponent::SourceReliability => "source_reliability",
            CredibilityComponent::InternalConsistency => "internal_consistency",
            CredibilityComponent::CrossDocument => "cross_document",
            CredibilityComponent::Quality => "quality",
            CredibilityComponent::Timestamp => "timestamp",
        }
    }
}

/// One itemized component of a credibility report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentScore {
    pub component: CredibilityComponent,
    pub weight: f64,
    /// Component score in [0, 1].
    pub score: f64,
    /// True when the check failed and the neutral score was substituted.
    pub errored: bool,
    /// Marks the check as having found a problem (e.g. future timestamp).
    pub flagged: bool,
    pub detail: String,
}

/// Composite credibility score with its itemized components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredibilityReport {
    pub score: f64,
    pub components: Vec<ComponentScore>,
    pub assessed_at: DateTime<Utc>,
}

impl CredibilityReport {
    /// Build a report whose score is the weighted sum of `components`, clamped to [0, 1].
    pub fn from_components(components: Vec<ComponentScore>, assessed_at: DateTime<Utc>) -> Self {
        let score = components
            .iter()
            .map(|c| c.weight * c.score)
            .sum::<f64>()
            .clamp(0.0, 1.0);
        Self {
            score,
            components,
            assessed_at,
        }
    }

    pub fn component(&self, which: CredibilityComponent) -> Option<&ComponentScore> {
        self.components.iter().find(|c| c.component == which)
    }
}
