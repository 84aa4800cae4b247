use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Whether a vector represents a whole document or one chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Document,
    Chunk,
}

/// Metadata stored alongside each vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryMeta {
    pub document_id: String,
    pub chunk_offset: usize,
    pub bucket: String,
    pub kind: EntryKind,
}

/// One stored vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub id: String,
    /// L2-normalized on insert.
    pub vector: Vec<f32>,
    pub meta: EntryMeta,
    /// Store version that wrote this entry.
    pub version: u64,
}

/// Restricts which entries a search may return.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexFilter {
    pub document_ids: Option<BTreeSet<String>>,
    pub bucket: Option<String>,
    pub kind: Option<EntryKind>,
    pub exclude_document: Option<String>,
}

impl IndexFilter {
    pub fn chunks() -> Self {
        Self {
            kind: Some(EntryKind::Chunk),
            ..Self::default()
        }
    }

    pub fn documents_in_bucket(bucket: &str) -> Self {
        Self {
            kind: Some(EntryKind::Document),
            bucket: Some(bucket.to_string()),
            ..Self::default()
        }
    }

    pub fn matches(&self, meta: &EntryMeta) -> bool {
        if let Some(kind) = self.kind {
            if meta.kind != kind {
                return false;
            }
        }
        if let Some(bucket) = &self.bucket {
            if &meta.bucket != bucket {
                return false;
            }
        }
        if let Some(ids) = &self.document_ids {
            if !ids.contains(&meta.document_id) {
                return false;
            }
        }
        if let Some(excluded) = &self.exclude_document {
            if &meta.document_id == excluded {
                return false;
            }
        }
        true
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// A ranked search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexHit {
    pub id: String,
    /// Cosine distance, `1 - score`.
    pub distance: f64,
    /// Cosine similarity.
    pub score: f64,
    pub meta: EntryMeta,
}

/// Score descending, then id ascending.
pub(crate) fn rank(hits: &mut [IndexHit]) {
    hits.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
}
