//! Document registry: every submitted document, its last outcome, and the
//! chunks of active documents.

use std::path::Path;

use dashmap::DashMap;
use lumen_core::constants::{CHUNK_ID_SEPARATOR, DOCUMENT_SCHEMA_VERSION, DOCUMENT_SNAPSHOT_FORMAT};
use lumen_core::errors::LumenResult;
use lumen_core::models::{Chunk, Document, Lifecycle, SubmitResult};
use lumen_core::snapshot::{self, SnapshotHeader};
use serde::{Deserialize, Serialize};
use tracing::info;

/// A document with the outcome of its last submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentEntry {
    pub document: Document,
    pub outcome: SubmitResult,
    /// Empty unless the document is active.
    pub chunks: Vec<Chunk>,
}

impl DocumentEntry {
    pub fn is_active(&self) -> bool {
        self.document.is_active()
    }
}

#[derive(Serialize, Deserialize)]
struct RegistrySnapshot {
    entries: Vec<DocumentEntry>,
}

/// Counts by lifecycle state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleCounts {
    pub pending: usize,
    pub active: usize,
    pub superseded: usize,
    pub rejected: usize,
}

/// Concurrent id → entry map. Writers for one id are serialized by the
/// gateway; the registry itself only guarantees per-entry atomicity.
#[derive(Debug, Default)]
pub struct DocumentRegistry {
    entries: DashMap<String, DocumentEntry>,
}

impl DocumentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<DocumentEntry> {
        self.entries.get(id).map(|e| e.value().clone())
    }

    pub fn document(&self, id: &str) -> Option<Document> {
        self.entries.get(id).map(|e| e.document.clone())
    }

    pub fn insert(&self, entry: DocumentEntry) -> Option<DocumentEntry> {
        self.entries.insert(entry.document.id.clone(), entry)
    }

    pub fn remove(&self, id: &str) -> Option<DocumentEntry> {
        self.entries.remove(id).map(|(_, e)| e)
    }

    /// Chunk by index id (`{document_id}#{ordinal}`), active documents only.
    pub fn chunk(&self, chunk_id: &str) -> Option<Chunk> {
        let (document_id, ordinal) = chunk_id.rsplit_once(CHUNK_ID_SEPARATOR)?;
        let ordinal: usize = ordinal.parse().ok()?;
        let entry = self.entries.get(document_id)?;
        if !entry.is_active() {
            return None;
        }
        entry.chunks.get(ordinal).filter(|c| c.id == chunk_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn active_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_active()).count()
    }

    /// Sorted ids of active documents.
    pub fn active_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .entries
            .iter()
            .filter(|e| e.is_active())
            .map(|e| e.key().clone())
            .collect();
        ids.sort();
        ids
    }

    pub fn lifecycle_counts(&self) -> LifecycleCounts {
        let mut counts = LifecycleCounts::default();
        for entry in self.entries.iter() {
            match entry.document.lifecycle {
                Lifecycle::Pending => counts.pending += 1,
                Lifecycle::Active => counts.active += 1,
                Lifecycle::Superseded { .. } => counts.superseded += 1,
                Lifecycle::Rejected { .. } => counts.rejected += 1,
            }
        }
        counts
    }

    /// All entries, sorted by id.
    pub fn entries(&self) -> Vec<DocumentEntry> {
        let mut all: Vec<DocumentEntry> = self.entries.iter().map(|e| e.value().clone()).collect();
        all.sort_by(|a, b| a.document.id.cmp(&b.document.id));
        all
    }

    pub fn save(&self, path: &Path) -> LumenResult<SnapshotHeader> {
        let body = RegistrySnapshot {
            entries: self.entries(),
        };
        let header = snapshot::write_file(
            path,
            DOCUMENT_SNAPSHOT_FORMAT,
            DOCUMENT_SCHEMA_VERSION,
            body.entries.len(),
            &body,
        )?;
        info!(path = %path.display(), entries = header.entries, "document registry saved");
        Ok(header)
    }

    /// Replace the registry contents with a snapshot.
    pub fn load(&self, path: &Path) -> LumenResult<SnapshotHeader> {
        let staged = Self::stage_load(path)?;
        Ok(self.commit_load(staged))
    }

    /// Read and check a snapshot without touching the live registry.
    pub fn stage_load(path: &Path) -> LumenResult<StagedRegistry> {
        let (header, body): (_, RegistrySnapshot) =
            snapshot::read_file(path, DOCUMENT_SNAPSHOT_FORMAT, DOCUMENT_SCHEMA_VERSION)?;
        Ok(StagedRegistry {
            path: path.display().to_string(),
            header,
            entries: body.entries,
        })
    }

    /// Swap in entries read by [`stage_load`](Self::stage_load).
    pub fn commit_load(&self, staged: StagedRegistry) -> SnapshotHeader {
        self.entries.clear();
        for entry in staged.entries {
            self.entries.insert(entry.document.id.clone(), entry);
        }
        info!(path = %staged.path, entries = staged.header.entries, "document registry loaded");
        staged.header
    }
}

/// A checked registry snapshot waiting to replace the live entries.
pub struct StagedRegistry {
    path: String,
    header: SnapshotHeader,
    entries: Vec<DocumentEntry>,
}

impl StagedRegistry {
    pub fn header(&self) -> &SnapshotHeader {
        &self.header
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use lumen_core::models::{IngestStatus, RawDocument};

    fn entry(id: &str, lifecycle: Lifecycle) -> DocumentEntry {
        let mut document = Document::from_raw(&RawDocument::new(id, "Some text here."), Utc::now());
        document.content = "Some text here.".into();
        document.lifecycle = lifecycle;
        let chunks = if document.is_active() {
            vec![Chunk::new(id, 0, 0, "Some text here.".into())]
        } else {
            Vec::new()
        };
        DocumentEntry {
            document,
            outcome: SubmitResult::with_status(id, IngestStatus::Accepted, "ok"),
            chunks,
        }
    }

    #[test]
    fn chunk_lookup_requires_active_parent() {
        let reg = DocumentRegistry::new();
        reg.insert(entry("a", Lifecycle::Active));
        reg.insert(entry("b", Lifecycle::Superseded { by: "a".into() }));
        assert_eq!(reg.chunk("a#0").map(|c| c.offset), Some(0));
        assert!(reg.chunk("a#1").is_none());
        assert!(reg.chunk("b#0").is_none());
        assert!(reg.chunk("nonsense").is_none());
    }

    #[test]
    fn counts_by_lifecycle() {
        let reg = DocumentRegistry::new();
        reg.insert(entry("a", Lifecycle::Active));
        reg.insert(entry("b", Lifecycle::Superseded { by: "a".into() }));
        reg.insert(entry("c", Lifecycle::Rejected { reason: "x".into() }));
        let counts = reg.lifecycle_counts();
        assert_eq!((counts.active, counts.superseded, counts.rejected), (1, 1, 1));
        assert_eq!(reg.active_ids(), vec!["a".to_string()]);
    }

    #[test]
    fn snapshot_restores_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("documents.lumen");
        let reg = DocumentRegistry::new();
        reg.insert(entry("a", Lifecycle::Active));
        reg.insert(entry("b", Lifecycle::Rejected { reason: "x".into() }));
        reg.save(&path).unwrap();

        let restored = DocumentRegistry::new();
        restored.insert(entry("stale", Lifecycle::Active));
        let header = restored.load(&path).unwrap();
        assert_eq!(header.entries, 2);
        assert_eq!(restored.len(), 2);
        assert!(restored.get("stale").is_none());
        assert!(restored.get("a").unwrap().is_active());
    }
}
