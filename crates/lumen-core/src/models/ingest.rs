use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A document as handed to the gateway: extracted text plus free-form metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDocument {
    /// Caller-supplied id.
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl RawDocument {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Per-document ingestion outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestStatus {
    Accepted,
    Rejected,
    Duplicate,
    /// Storage or pipeline error for this document only.
    Failed,
    TimedOut,
    /// The batch was cancelled before this item started.
    Cancelled,
}

/// What `submit` reports back for one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitResult {
    pub document_id: String,
    pub status: IngestStatus,
    pub reasons: Vec<String>,
    pub duplicate_of: Option<String>,
    pub quality_score: Option<f64>,
    pub credibility_score: Option<f64>,
    /// True when this was an identical resubmission and nothing changed.
    pub unchanged: bool,
}

impl SubmitResult {
    pub fn with_status(document_id: &str, status: IngestStatus, reason: impl Into<String>) -> Self {
        Self {
            document_id: document_id.to_string(),
            status,
            reasons: vec![reason.into()],
            duplicate_of: None,
            quality_score: None,
            credibility_score: None,
            unchanged: false,
        }
    }
}
