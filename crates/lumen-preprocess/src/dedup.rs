//! Semantic dedup: exact content hash first, then embedding similarity
//! against document-level vectors in the same bucket.
//!
//! Claims are serialized per bucket: the similarity check and the write of
//! the new document-level vector happen under one bucket lock, so of two
//! near-duplicates racing in the same bucket exactly one is accepted.

use std::sync::{Arc, Mutex};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use lumen_core::config::PreprocessConfig;
use lumen_core::constants::DOCUMENT_VECTOR_SUFFIX;
use lumen_core::errors::{LumenError, LumenResult};
use lumen_core::models::StageResult;
use lumen_core::traits::IEmbeddingProvider;
use lumen_index::{EntryKind, EntryMeta, IndexFilter, VectorIndex};
use tracing::debug;

use crate::stage::{Stage, StageContext};

/// Index id of a document's document-level vector.
pub fn document_vector_id(document_id: &str) -> String {
    format!("{document_id}{DOCUMENT_VECTOR_SUFFIX}")
}

/// Dedup stage and registry of claimed content hashes.
pub struct SemanticDedup {
    embedder: Arc<dyn IEmbeddingProvider>,
    index: Arc<VectorIndex>,
    threshold: f64,
    max_candidates: usize,
    /// Content hash to the id of the active document holding it.
    hashes: DashMap<String, String>,
    bucket_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl SemanticDedup {
    pub fn new(
        config: &PreprocessConfig,
        embedder: Arc<dyn IEmbeddingProvider>,
        index: Arc<VectorIndex>,
    ) -> Self {
        Self {
            embedder,
            index,
            threshold: config.dedup_threshold,
            max_candidates: config.dedup_max_candidates.max(1),
            hashes: DashMap::new(),
            bucket_locks: DashMap::new(),
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Holder of `hash` if it is claimed by a document other than `document_id`.
    pub fn hash_holder(&self, hash: &str, document_id: &str) -> Option<String> {
        self.hashes
            .get(hash)
            .map(|holder| holder.value().clone())
            .filter(|holder| holder != document_id)
    }

    /// Record `hash` as held by `document_id` (used when restoring state).
    pub fn register(&self, document_id: &str, hash: &str) {
        self.hashes.insert(hash.to_string(), document_id.to_string());
    }

    /// Drop the claim of `document_id` on `hash`, if it holds it.
    pub fn release(&self, document_id: &str, hash: &str) {
        self.hashes.remove_if(hash, |_, holder| holder == document_id);
    }

    /// Drop every claim.
    pub fn clear(&self) {
        self.hashes.clear();
    }

    /// Number of claimed hashes.
    pub fn claimed(&self) -> usize {
        self.hashes.len()
    }

    fn bucket_lock(&self, bucket: &str) -> Arc<Mutex<()>> {
        self.bucket_locks
            .entry(bucket.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Best same-bucket document at or above the threshold, excluding the
    /// document itself (a new version of the same id is not its own duplicate).
    fn nearest_duplicate(
        &self,
        vector: &[f32],
        bucket: &str,
        document_id: &str,
    ) -> LumenResult<Option<(String, f64)>> {
        let filter = IndexFilter {
            kind: Some(EntryKind::Document),
            bucket: Some(bucket.to_string()),
            exclude_document: Some(document_id.to_string()),
            ..IndexFilter::default()
        };
        let hits = self.index.search(vector, self.max_candidates, &filter)?;
        Ok(hits
            .into_iter()
            .find(|h| h.score >= self.threshold)
            .map(|h| (h.meta.document_id, h.score)))
    }
}

impl Stage for SemanticDedup {
    fn name(&self) -> &'static str {
        "dedup"
    }

    fn execute(&self, ctx: &mut StageContext<'_>) -> LumenResult<StageResult> {
        let doc_id = ctx.document.id.clone();
        let hash = ctx.document.content_hash.clone();
        let bucket = ctx.document.metadata.bucket.clone();

        if let Some(holder) = self.hash_holder(&hash, &doc_id) {
            debug!(document_id = %doc_id, of = %holder, "exact duplicate");
            ctx.note("exact content hash");
            return Ok(StageResult::Duplicate { of_id: holder });
        }

        let vector = self.embedder.embed(&ctx.document.content)?;

        let lock = self.bucket_lock(&bucket);
        let _guard = lock
            .lock()
            .map_err(|e| LumenError::ConcurrencyError(e.to_string()))?;

        if let Some((of_id, score)) = self.nearest_duplicate(&vector, &bucket, &doc_id)? {
            debug!(document_id = %doc_id, of = %of_id, score, "near duplicate");
            ctx.note(format!("similarity {score:.3}"));
            return Ok(StageResult::Duplicate { of_id });
        }

        match self.hashes.entry(hash.clone()) {
            Entry::Occupied(holder) if holder.get() != &doc_id => {
                let of_id = holder.get().clone();
                ctx.note("exact content hash");
                return Ok(StageResult::Duplicate { of_id });
            }
            Entry::Occupied(_) => {}
            Entry::Vacant(slot) => {
                slot.insert(doc_id.clone());
            }
        }

        let vector_id = document_vector_id(&doc_id);
        let meta = EntryMeta {
            document_id: doc_id.clone(),
            chunk_offset: 0,
            bucket: bucket.clone(),
            kind: EntryKind::Document,
        };
        if let Err(e) = self.index.upsert(&vector_id, &vector, meta) {
            self.release(&doc_id, &hash);
            return Err(e);
        }
        debug!(document_id = %doc_id, bucket = %bucket, "dedup claim recorded");
        ctx.document.embedding_ref = Some(vector_id);
        Ok(StageResult::Accepted)
    }
}
