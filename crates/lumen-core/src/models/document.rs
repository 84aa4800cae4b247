use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CredibilityReport, RawDocument, StageRecord, StageResult};
use crate::constants::CHUNK_ID_SEPARATOR;

/// blake3 hex digest of a text.
pub fn content_hash(text: &str) -> String {
    blake3::hash(text.as_bytes()).to_hex().to_string()
}

/// Canonical source metadata, produced by the metadata-unify stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceMetadata {
    pub origin: Option<String>,
    /// Lowercased host of `origin`, without a leading "www.".
    pub domain: Option<String>,
    pub retrieved_at: Option<DateTime<Utc>>,
    /// The timestamp as supplied, kept so unparseable values stay visible.
    pub retrieved_at_raw: Option<String>,
    pub author: Option<String>,
    pub license: Option<String>,
    /// Dedup candidate partition.
    pub bucket: String,
    /// Keys with no canonical mapping.
    pub extra: BTreeMap<String, String>,
}

/// Where a document stands in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Lifecycle {
    Pending,
    Active,
    /// Retained for audit; `by` is the canonical active document.
    Superseded { by: String },
    Rejected { reason: String },
}

/// A submitted document and everything the pipeline learned about it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub raw_content: String,
    /// Normalized text; empty until the normalize stage runs.
    pub content: String,
    pub raw_hash: String,
    /// Hash of the normalized content; unique among active documents.
    pub content_hash: String,
    pub language: Option<String>,
    pub language_confidence: f64,
    pub raw_metadata: BTreeMap<String, String>,
    pub metadata: SourceMetadata,
    pub stage_trail: Vec<StageRecord>,
    pub quality_score: f64,
    pub quality_flags: Vec<String>,
    pub credibility: Option<CredibilityReport>,
    pub lifecycle: Lifecycle,
    /// Index id of the document-level vector.
    pub embedding_ref: Option<String>,
    pub chunk_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    pub fn from_raw(raw: &RawDocument, now: DateTime<Utc>) -> Self {
        Self {
            id: raw.id.clone(),
            raw_content: raw.content.clone(),
            content: String::new(),
            raw_hash: content_hash(&raw.content),
            content_hash: String::new(),
            language: None,
            language_confidence: 0.0,
            raw_metadata: raw.metadata.clone(),
            metadata: SourceMetadata::default(),
            stage_trail: Vec::new(),
            quality_score: 0.0,
            quality_flags: Vec::new(),
            credibility: None,
            lifecycle: Lifecycle::Pending,
            embedding_ref: None,
            chunk_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.lifecycle == Lifecycle::Active
    }

    /// Credibility score, 0.5 when not yet verified.
    pub fn credibility_score(&self) -> f64 {
        self.credibility
            .as_ref()
            .map(|c| c.score)
            .unwrap_or(crate::constants::NEUTRAL_SCORE)
    }

    pub fn record_stage(&mut self, stage: &str, result: StageResult, note: Option<String>) {
        let at = Utc::now();
        self.stage_trail.push(StageRecord {
            stage: stage.to_string(),
            result,
            note,
            at,
        });
        self.updated_at = at;
    }
}

/// A sub-span of an active document; the unit of chunk-level indexing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub document_id: String,
    pub ordinal: usize,
    /// Byte offset into the document's normalized content.
    pub offset: usize,
    pub text: String,
}

impl Chunk {
    pub fn new(document_id: &str, ordinal: usize, offset: usize, text: String) -> Self {
        Self {
            id: Self::make_id(document_id, ordinal),
            document_id: document_id.to_string(),
            ordinal,
            offset,
            text,
        }
    }

    pub fn make_id(document_id: &str, ordinal: usize) -> String {
        format!("{document_id}{CHUNK_ID_SEPARATOR}{ordinal}")
    }
}
