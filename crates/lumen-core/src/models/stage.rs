use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of one preprocessing stage.
///
/// Rejection and duplication are expected outcomes, returned by value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StageResult {
    Accepted,
    Rejected { reason: String },
    Duplicate { of_id: String },
}

impl StageResult {
    pub fn rejected(reason: impl Into<String>) -> Self {
        StageResult::Rejected {
            reason: reason.into(),
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, StageResult::Accepted)
    }
}

/// One entry of a document's processing-stage trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageRecord {
    pub stage: String,
    pub result: StageResult,
    /// Free-form note, e.g. a quality flag or detected language.
    pub note: Option<String>,
    pub at: DateTime<Utc>,
}
