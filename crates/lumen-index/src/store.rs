//! `VectorIndex`: the store service wrapping exact and approximate search.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use lumen_core::config::IndexConfig;
use lumen_core::constants::{INDEX_SCHEMA_VERSION, INDEX_SNAPSHOT_FORMAT};
use lumen_core::errors::{EmbeddingError, LumenError, LumenResult, StorageError};
use lumen_core::models::MutationEvent;
use lumen_core::similarity::normalize;
use lumen_core::snapshot::{self, SnapshotHeader};
use lumen_core::traits::IMutationListener;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::entry::{rank, EntryMeta, IndexEntry, IndexFilter, IndexHit};
use crate::exact::{self, dot};
use crate::hnsw::{Hnsw, HnswParams};

const STORE_NAME: &str = "vector-index";

/// Result of an upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpsertOutcome {
    /// Version assigned to this write.
    pub version: u64,
    /// False when the write was identical to the stored entry.
    pub applied: bool,
}

/// What `rebuild` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebuildReport {
    pub live_entries: usize,
    pub reclaimed_tombstones: usize,
    pub ann_active: bool,
}

/// Point-in-time index statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    pub live_entries: usize,
    pub tombstones: usize,
    pub dimensions: usize,
    pub version: u64,
    pub ann_active: bool,
    pub available: bool,
}

#[derive(Serialize, Deserialize)]
struct IndexSnapshot {
    version: u64,
    dimensions: usize,
    entries: Vec<IndexEntry>,
}

/// A checked snapshot waiting to replace the live entries.
pub struct StagedIndex {
    path: String,
    header: SnapshotHeader,
    body: IndexSnapshot,
}

impl StagedIndex {
    pub fn header(&self) -> &SnapshotHeader {
        &self.header
    }
}

#[derive(Default)]
struct IndexState {
    entries: HashMap<String, IndexEntry>,
    ann: Option<Hnsw>,
}

/// Vector index store.
///
/// Upserts are synchronous: a search issued after `upsert` returns sees the
/// write. Every applied mutation bumps a monotonic version that caches use
/// to detect staleness.
pub struct VectorIndex {
    config: IndexConfig,
    state: RwLock<IndexState>,
    version: AtomicU64,
    available: AtomicBool,
    listeners: RwLock<Vec<Arc<dyn IMutationListener>>>,
}

impl VectorIndex {
    pub fn new(config: IndexConfig) -> Self {
        info!(
            dims = config.dimensions,
            ann_threshold = config.ann_threshold,
            "VectorIndex initialized"
        );
        Self {
            config,
            state: RwLock::new(IndexState::default()),
            version: AtomicU64::new(0),
            available: AtomicBool::new(true),
            listeners: RwLock::new(Vec::new()),
        }
    }

    pub fn with_dimensions(dimensions: usize) -> Self {
        Self::new(IndexConfig {
            dimensions,
            ..IndexConfig::default()
        })
    }

    pub fn dimensions(&self) -> usize {
        self.config.dimensions
    }

    /// Current store version; changes on every applied mutation.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Mark the store (un)available. While unavailable every operation fails
    /// with `StorageError::Unavailable`.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Release);
        if available {
            info!("vector index marked available");
        } else {
            warn!("vector index marked unavailable");
        }
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::Acquire)
    }

    /// Register a listener notified after every committed mutation.
    pub fn subscribe(&self, listener: Arc<dyn IMutationListener>) -> LumenResult<()> {
        self.listeners
            .write()
            .map_err(|e| LumenError::ConcurrencyError(e.to_string()))?
            .push(listener);
        Ok(())
    }

    fn ensure_available(&self) -> LumenResult<()> {
        if self.is_available() {
            Ok(())
        } else {
            Err(StorageError::Unavailable {
                store: STORE_NAME.to_string(),
            }
            .into())
        }
    }

    fn read(&self) -> LumenResult<RwLockReadGuard<'_, IndexState>> {
        self.ensure_available()?;
        self.state
            .read()
            .map_err(|e| LumenError::ConcurrencyError(e.to_string()))
    }

    fn write(&self) -> LumenResult<RwLockWriteGuard<'_, IndexState>> {
        self.ensure_available()?;
        self.state
            .write()
            .map_err(|e| LumenError::ConcurrencyError(e.to_string()))
    }

    fn publish(&self, event: MutationEvent) {
        match self.listeners.read() {
            Ok(listeners) => {
                for l in listeners.iter() {
                    l.on_mutation(&event);
                }
            }
            Err(e) => warn!(error = %e, "listener registry poisoned, event dropped"),
        }
    }

    fn prepare(&self, vector: &[f32]) -> LumenResult<Vec<f32>> {
        if vector.len() != self.config.dimensions {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.config.dimensions,
                actual: vector.len(),
            }
            .into());
        }
        if vector.iter().any(|x| !x.is_finite()) {
            return Err(LumenError::ValidationError(
                "vector contains non-finite values".into(),
            ));
        }
        let mut v = vector.to_vec();
        normalize(&mut v);
        Ok(v)
    }

    fn hnsw_params(&self) -> HnswParams {
        HnswParams::new(self.config.hnsw_m, self.config.hnsw_ef_construction)
    }

    fn build_ann(&self, entries: &HashMap<String, IndexEntry>) -> Hnsw {
        let mut ordered: Vec<&IndexEntry> = entries.values().collect();
        ordered.sort_by(|a, b| a.version.cmp(&b.version).then_with(|| a.id.cmp(&b.id)));
        let mut ann = Hnsw::new(self.hnsw_params());
        for e in ordered {
            ann.insert(&e.id, e.vector.clone());
        }
        ann
    }

    /// Insert or replace the vector stored under `id`.
    ///
    /// The version is taken under the write lock, so of two racing writes to
    /// the same id the one that commits last carries the higher version and
    /// is the one that remains.
    pub fn upsert(&self, id: &str, vector: &[f32], meta: EntryMeta) -> LumenResult<UpsertOutcome> {
        let vector = self.prepare(vector)?;
        let version = {
            let mut state = self.write()?;
            if let Some(existing) = state.entries.get(id) {
                if existing.vector == vector && existing.meta == meta {
                    return Ok(UpsertOutcome {
                        version: existing.version,
                        applied: false,
                    });
                }
            }

            let version = self.version.fetch_add(1, Ordering::AcqRel) + 1;
            state.entries.insert(
                id.to_string(),
                IndexEntry {
                    id: id.to_string(),
                    vector: vector.clone(),
                    meta,
                    version,
                },
            );

            if let Some(ann) = state.ann.as_mut() {
                ann.insert(id, vector);
            } else if state.entries.len() >= self.config.ann_threshold {
                info!(
                    entries = state.entries.len(),
                    "ann threshold reached, building hnsw graph"
                );
                let ann = self.build_ann(&state.entries);
                state.ann = Some(ann);
            }
            version
        };
        self.publish(MutationEvent::IndexUpserted {
            id: id.to_string(),
            version,
        });
        Ok(UpsertOutcome {
            version,
            applied: true,
        })
    }

    /// Remove `id`. Returns whether it existed.
    pub fn delete(&self, id: &str) -> LumenResult<bool> {
        let version = {
            let mut state = self.write()?;
            if state.entries.remove(id).is_none() {
                return Ok(false);
            }
            if let Some(ann) = state.ann.as_mut() {
                ann.remove(id);
            }
            self.version.fetch_add(1, Ordering::AcqRel) + 1
        };
        self.publish(MutationEvent::IndexDeleted {
            id: id.to_string(),
            version,
        });
        Ok(true)
    }

    /// Remove every entry belonging to `document_id`. Returns the count removed.
    pub fn delete_document(&self, document_id: &str) -> LumenResult<usize> {
        let ids: Vec<String> = {
            let state = self.read()?;
            state
                .entries
                .values()
                .filter(|e| e.meta.document_id == document_id)
                .map(|e| e.id.clone())
                .collect()
        };
        let mut removed = 0;
        for id in ids {
            if self.delete(&id)? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    pub fn get(&self, id: &str) -> LumenResult<Option<IndexEntry>> {
        Ok(self.read()?.entries.get(id).cloned())
    }

    pub fn contains(&self, id: &str) -> LumenResult<bool> {
        Ok(self.read()?.entries.contains_key(id))
    }

    pub fn len(&self) -> LumenResult<usize> {
        Ok(self.read()?.entries.len())
    }

    pub fn is_empty(&self) -> LumenResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Top `k` entries by cosine similarity, filtered.
    ///
    /// Uses the HNSW graph once the corpus is above the ANN threshold and
    /// falls back to an exact scan when the graph yields fewer than `k`
    /// filtered hits.
    pub fn search(&self, query: &[f32], k: usize, filter: &IndexFilter) -> LumenResult<Vec<IndexHit>> {
        if k == 0 {
            self.ensure_available()?;
            return Ok(Vec::new());
        }
        let query = self.prepare(query)?;
        let state = self.read()?;

        let ann = state
            .ann
            .as_ref()
            .filter(|_| state.entries.len() >= self.config.ann_threshold);
        if let Some(ann) = ann {
            let ef = self.config.hnsw_ef_search.max(k * 4);
            let mut hits: Vec<IndexHit> = ann
                .search(&query, k, ef, |id| {
                    state
                        .entries
                        .get(id)
                        .is_some_and(|e| filter.matches(&e.meta))
                })
                .into_iter()
                .filter_map(|(id, _)| state.entries.get(&id))
                .map(|e| exact::to_hit(e, dot(&query, &e.vector)))
                .collect();
            if hits.len() >= k {
                rank(&mut hits);
                debug!(k, returned = hits.len(), mode = "ann", "index search");
                return Ok(hits);
            }
            debug!(k, ann_hits = hits.len(), "ann under-filled, falling back to exact scan");
        }

        let hits = exact::scan(&state.entries, &query, k, filter);
        debug!(k, returned = hits.len(), mode = "exact", "index search");
        Ok(hits)
    }

    /// Drop tombstones and rebuild the ANN graph from live entries under the
    /// exclusive lock.
    pub fn rebuild(&self) -> LumenResult<RebuildReport> {
        let (report, version) = {
            let mut state = self.write()?;
            let reclaimed = state.ann.as_ref().map(|a| a.tombstones()).unwrap_or(0);
            state.ann = if state.entries.len() >= self.config.ann_threshold {
                Some(self.build_ann(&state.entries))
            } else {
                None
            };
            let report = RebuildReport {
                live_entries: state.entries.len(),
                reclaimed_tombstones: reclaimed,
                ann_active: state.ann.is_some(),
            };
            (report, self.version.fetch_add(1, Ordering::AcqRel) + 1)
        };
        info!(
            live = report.live_entries,
            reclaimed = report.reclaimed_tombstones,
            ann = report.ann_active,
            "vector index rebuilt"
        );
        self.publish(MutationEvent::IndexRebuilt { version });
        Ok(report)
    }

    /// Write a versioned snapshot of all live entries.
    pub fn save(&self, path: &Path) -> LumenResult<SnapshotHeader> {
        let body = {
            let state = self.read()?;
            let mut entries: Vec<IndexEntry> = state.entries.values().cloned().collect();
            entries.sort_by(|a, b| a.id.cmp(&b.id));
            IndexSnapshot {
                version: self.version(),
                dimensions: self.config.dimensions,
                entries,
            }
        };
        let header = snapshot::write_file(
            path,
            INDEX_SNAPSHOT_FORMAT,
            INDEX_SCHEMA_VERSION,
            body.entries.len(),
            &body,
        )?;
        info!(path = %path.display(), entries = header.entries, "vector index saved");
        Ok(header)
    }

    /// Replace the contents with a snapshot. The version counter never moves
    /// backwards.
    pub fn load(&self, path: &Path) -> LumenResult<SnapshotHeader> {
        let staged = self.stage_load(path)?;
        self.commit_load(staged)
    }

    /// Read and check a snapshot without touching the live entries.
    pub fn stage_load(&self, path: &Path) -> LumenResult<StagedIndex> {
        let (header, body): (SnapshotHeader, IndexSnapshot) =
            snapshot::read_file(path, INDEX_SNAPSHOT_FORMAT, INDEX_SCHEMA_VERSION)?;
        if body.dimensions != self.config.dimensions {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.config.dimensions,
                actual: body.dimensions,
            }
            .into());
        }
        if body.entries.iter().any(|e| e.vector.len() != body.dimensions) {
            return Err(StorageError::Corrupted {
                details: "entry dimensions disagree with snapshot header".into(),
            }
            .into());
        }
        Ok(StagedIndex {
            path: path.display().to_string(),
            header,
            body,
        })
    }

    /// Swap in a snapshot read by [`stage_load`](Self::stage_load).
    pub fn commit_load(&self, staged: StagedIndex) -> LumenResult<SnapshotHeader> {
        let StagedIndex { path, header, body } = staged;
        let version = {
            let mut state = self.write()?;
            state.entries = body
                .entries
                .into_iter()
                .map(|e| (e.id.clone(), e))
                .collect();
            state.ann = if state.entries.len() >= self.config.ann_threshold {
                Some(self.build_ann(&state.entries))
            } else {
                None
            };
            self.version.fetch_max(body.version, Ordering::AcqRel);
            self.version.fetch_add(1, Ordering::AcqRel) + 1
        };
        info!(path = %path, entries = header.entries, "vector index loaded");
        self.publish(MutationEvent::IndexLoaded { version });
        Ok(header)
    }

    pub fn stats(&self) -> LumenResult<IndexStats> {
        let state = self.read()?;
        Ok(IndexStats {
            live_entries: state.entries.len(),
            tombstones: state.ann.as_ref().map(|a| a.tombstones()).unwrap_or(0),
            dimensions: self.config.dimensions,
            version: self.version(),
            ann_active: state.ann.is_some()
                && state.entries.len() >= self.config.ann_threshold,
            available: self.is_available(),
        })
    }
}
