//! IngestionGateway: owns the document lifecycle from submission to indexing.
//!
//! Each document runs on the blocking pool under the per-id lock:
//! preprocess, verify, chunk and embed, then commit (chunk vectors, graph
//! merge, registry). A commit point separates the two halves. When the
//! caller's timeout fires before the pipeline reaches it, the pipeline is
//! marked abandoned and rolls back its dedup claim instead of committing.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use lumen_core::config::{IngestionConfig, LumenConfig};
use lumen_core::constants::CHUNK_ID_SEPARATOR;
use lumen_core::errors::{EmbeddingError, LumenError, LumenResult};
use lumen_core::models::{
    Chunk, Document, IngestStatus, Lifecycle, RawDocument, StageResult, SubmitResult,
};
use lumen_core::traits::{IContentExtractor, IEmbeddingProvider, SourceInput};
use lumen_credibility::CredibilityVerifier;
use lumen_graph::KnowledgeGraph;
use lumen_index::{EntryKind, EntryMeta, IndexEntry, VectorIndex};
use lumen_preprocess::dedup::document_vector_id;
use lumen_preprocess::{Preprocessor, SemanticDedup};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::{debug, info, info_span, warn};
use uuid::Uuid;

use crate::cancellation::CancellationToken;
use crate::chunking::chunk_text;
use crate::corpus::IndexCorpusView;
use crate::extractor::PlainTextExtractor;
use crate::registry::{DocumentEntry, DocumentRegistry};

const RUNNING: u8 = 0;
const COMMITTING: u8 = 1;
const ABANDONED: u8 = 2;

/// Counters since construction plus current registry counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayStats {
    pub submitted: u64,
    pub accepted: u64,
    pub rejected: u64,
    pub duplicates: u64,
    pub failed: u64,
    pub timed_out: u64,
    pub cancelled: u64,
    pub unchanged: u64,
    pub documents: usize,
    pub active_documents: usize,
}

#[derive(Default)]
struct Counters {
    submitted: AtomicU64,
    accepted: AtomicU64,
    rejected: AtomicU64,
    duplicates: AtomicU64,
    failed: AtomicU64,
    timed_out: AtomicU64,
    cancelled: AtomicU64,
    unchanged: AtomicU64,
}

impl Counters {
    fn record(&self, result: &SubmitResult) {
        let counter = if result.unchanged {
            &self.unchanged
        } else {
            match result.status {
                IngestStatus::Accepted => &self.accepted,
                IngestStatus::Rejected => &self.rejected,
                IngestStatus::Duplicate => &self.duplicates,
                IngestStatus::Failed => &self.failed,
                IngestStatus::TimedOut => &self.timed_out,
                IngestStatus::Cancelled => &self.cancelled,
            }
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

struct GatewayInner {
    config: IngestionConfig,
    max_content_bytes: usize,
    preprocessor: Preprocessor,
    dedup: Arc<SemanticDedup>,
    verifier: CredibilityVerifier,
    embedder: Arc<dyn IEmbeddingProvider>,
    index: Arc<VectorIndex>,
    graph: Option<Arc<KnowledgeGraph>>,
    registry: Arc<DocumentRegistry>,
    extractors: RwLock<Vec<Arc<dyn IContentExtractor>>>,
    id_locks: DashMap<String, Arc<Mutex<()>>>,
    counters: Counters,
}

/// Entry point for submitting documents. Cheap to clone.
#[derive(Clone)]
pub struct IngestionGateway {
    inner: Arc<GatewayInner>,
}

impl IngestionGateway {
    /// Wire the standard preprocessor and a verifier whose cross-document
    /// check reads the indexed corpus.
    pub fn new(
        config: &LumenConfig,
        embedder: Arc<dyn IEmbeddingProvider>,
        index: Arc<VectorIndex>,
        graph: Option<Arc<KnowledgeGraph>>,
    ) -> LumenResult<Self> {
        let dedup = Arc::new(SemanticDedup::new(
            &config.preprocess,
            embedder.clone(),
            index.clone(),
        ));
        let preprocessor = Preprocessor::standard(&config.preprocess, dedup.clone())?;
        Self::with_preprocessor(config, preprocessor, dedup, embedder, index, graph)
    }

    /// Like `new`, with a caller-composed stage list. `dedup` must be the
    /// instance the preprocessor runs, since the gateway manages its claims.
    pub fn with_preprocessor(
        config: &LumenConfig,
        preprocessor: Preprocessor,
        dedup: Arc<SemanticDedup>,
        embedder: Arc<dyn IEmbeddingProvider>,
        index: Arc<VectorIndex>,
        graph: Option<Arc<KnowledgeGraph>>,
    ) -> LumenResult<Self> {
        if config.ingestion.batch_concurrency == 0 {
            return Err(LumenError::ConfigError(
                "ingestion.batch_concurrency must be positive".into(),
            ));
        }
        let registry = Arc::new(DocumentRegistry::new());
        let corpus = Arc::new(IndexCorpusView::new(
            embedder.clone(),
            index.clone(),
            registry.clone(),
        ));
        let verifier = CredibilityVerifier::new(config.credibility.clone()).with_corpus(corpus);
        let extractors: Vec<Arc<dyn IContentExtractor>> = vec![Arc::new(PlainTextExtractor)];

        Ok(Self {
            inner: Arc::new(GatewayInner {
                config: config.ingestion.clone(),
                max_content_bytes: config.preprocess.max_content_bytes,
                preprocessor,
                dedup,
                verifier,
                embedder,
                index,
                graph,
                registry,
                extractors: RwLock::new(extractors),
                id_locks: DashMap::new(),
                counters: Counters::default(),
            }),
        })
    }

    /// Register an extractor ahead of the built-in plain-text one.
    pub fn register_extractor(&self, extractor: Arc<dyn IContentExtractor>) -> LumenResult<()> {
        let mut extractors = self
            .inner
            .extractors
            .write()
            .map_err(|e| LumenError::ConcurrencyError(format!("extractor registry poisoned: {e}")))?;
        extractors.insert(0, extractor);
        Ok(())
    }

    pub fn registry(&self) -> &Arc<DocumentRegistry> {
        &self.inner.registry
    }

    pub fn dedup(&self) -> &Arc<SemanticDedup> {
        &self.inner.dedup
    }

    pub fn index(&self) -> &Arc<VectorIndex> {
        &self.inner.index
    }

    pub fn graph(&self) -> Option<&Arc<KnowledgeGraph>> {
        self.inner.graph.as_ref()
    }

    // ── Submission ───────────────────────────────────────────────────────

    /// Ingest one document.
    ///
    /// Rejections, duplicates, and timeouts are statuses. Invalid input and
    /// pipeline errors (an unavailable index, a failing embedder) are `Err`.
    pub async fn submit(&self, raw: RawDocument) -> LumenResult<SubmitResult> {
        self.inner.validate(&raw)?;
        self.inner.counters.submitted.fetch_add(1, Ordering::Relaxed);

        let id = raw.id.clone();
        let span = info_span!("lumen.ingest", document_id = %id);
        let state = Arc::new(AtomicU8::new(RUNNING));
        let inner = self.inner.clone();
        let task_state = state.clone();
        let mut handle = tokio::task::spawn_blocking(move || {
            let _entered = span.enter();
            inner.process(raw, &task_state)
        });

        let millis = self.inner.config.timeout_ms;
        let joined = match tokio::time::timeout(Duration::from_millis(millis), &mut handle).await {
            Ok(joined) => joined,
            Err(_) => {
                if state
                    .compare_exchange(RUNNING, ABANDONED, Ordering::AcqRel, Ordering::Acquire)
                    .is_ok()
                {
                    warn!(document_id = %id, timeout_ms = millis, "ingest timed out, pipeline abandoned");
                    let result = timed_out(&id, millis);
                    self.inner.counters.record(&result);
                    return Ok(result);
                }
                // Already committing: the result is about to land.
                handle.await
            }
        };

        let outcome = joined
            .map_err(|e| LumenError::ConcurrencyError(format!("ingest task failed: {e}")))?;
        match &outcome {
            Ok(result) => self.inner.counters.record(result),
            Err(_) => {
                self.inner.counters.failed.fetch_add(1, Ordering::Relaxed);
            }
        }
        outcome
    }

    /// Ingest many documents with bounded concurrency. One result per input,
    /// in input order. Errors become per-item statuses; nothing aborts the
    /// batch. After `cancel` fires, items that have not started report
    /// `Cancelled` while started items run to completion.
    pub async fn submit_batch(
        &self,
        docs: Vec<RawDocument>,
        cancel: &CancellationToken,
    ) -> Vec<SubmitResult> {
        enum Pending {
            Cancelled(String),
            Running(String, tokio::task::JoinHandle<LumenResult<SubmitResult>>),
        }

        let batch_id = Uuid::new_v4();
        debug!(%batch_id, items = docs.len(), "batch started");
        let semaphore = Arc::new(Semaphore::new(self.inner.config.batch_concurrency.max(1)));
        let mut pending = Vec::with_capacity(docs.len());
        for raw in docs {
            if cancel.is_cancelled() {
                pending.push(Pending::Cancelled(raw.id));
                continue;
            }
            let Ok(permit) = semaphore.clone().acquire_owned().await else {
                pending.push(Pending::Cancelled(raw.id));
                continue;
            };
            if cancel.is_cancelled() {
                pending.push(Pending::Cancelled(raw.id));
                continue;
            }
            let gateway = self.clone();
            let id = raw.id.clone();
            pending.push(Pending::Running(
                id,
                tokio::spawn(async move {
                    let _permit = permit;
                    gateway.submit(raw).await
                }),
            ));
        }

        let mut results = Vec::with_capacity(pending.len());
        for item in pending {
            let result = match item {
                Pending::Cancelled(id) => {
                    let result =
                        SubmitResult::with_status(&id, IngestStatus::Cancelled, "batch cancelled");
                    self.inner.counters.record(&result);
                    result
                }
                Pending::Running(id, handle) => match handle.await {
                    Ok(Ok(result)) => result,
                    Ok(Err(e)) => error_result(&id, &e),
                    Err(e) => SubmitResult::with_status(
                        &id,
                        IngestStatus::Failed,
                        format!("ingest task failed: {e}"),
                    ),
                },
            };
            results.push(result);
        }
        info!(
            %batch_id,
            items = results.len(),
            accepted = results.iter().filter(|r| r.status == IngestStatus::Accepted).count(),
            cancelled = results.iter().filter(|r| r.status == IngestStatus::Cancelled).count(),
            "batch complete"
        );
        results
    }

    /// Extract text from a source with the first extractor that supports
    /// its media type, then submit it.
    pub async fn submit_source(&self, input: SourceInput) -> LumenResult<SubmitResult> {
        let extractor = {
            let extractors = self.inner.extractors.read().map_err(|e| {
                LumenError::ConcurrencyError(format!("extractor registry poisoned: {e}"))
            })?;
            extractors
                .iter()
                .find(|x| x.supports(input.media_type.as_deref()))
                .cloned()
        };
        let Some(extractor) = extractor else {
            return Err(LumenError::ValidationError(format!(
                "no extractor for media type {:?}",
                input.media_type
            )));
        };
        let extracted = extractor.extract(&input)?;
        let mut metadata = input.metadata;
        metadata.extend(extracted.metadata);
        self.submit(RawDocument {
            id: input.id,
            content: extracted.text,
            metadata,
        })
        .await
    }

    // ── Queries and maintenance ──────────────────────────────────────────

    pub fn get(&self, id: &str) -> Option<Document> {
        self.inner.registry.document(id)
    }

    /// Outcome of the last completed submission of `id`.
    pub fn status(&self, id: &str) -> Option<SubmitResult> {
        self.inner.registry.get(id).map(|e| e.outcome)
    }

    pub fn active_count(&self) -> usize {
        self.inner.registry.active_count()
    }

    pub fn stats(&self) -> GatewayStats {
        let c = &self.inner.counters;
        GatewayStats {
            submitted: c.submitted.load(Ordering::Relaxed),
            accepted: c.accepted.load(Ordering::Relaxed),
            rejected: c.rejected.load(Ordering::Relaxed),
            duplicates: c.duplicates.load(Ordering::Relaxed),
            failed: c.failed.load(Ordering::Relaxed),
            timed_out: c.timed_out.load(Ordering::Relaxed),
            cancelled: c.cancelled.load(Ordering::Relaxed),
            unchanged: c.unchanged.load(Ordering::Relaxed),
            documents: self.inner.registry.len(),
            active_documents: self.inner.registry.active_count(),
        }
    }

    /// Physically remove a document, its vectors, its hash claim, and its
    /// graph evidence. Documents it superseded keep pointing at it.
    pub async fn purge(&self, id: &str) -> LumenResult<bool> {
        let inner = self.inner.clone();
        let id = id.to_string();
        tokio::task::spawn_blocking(move || inner.purge(&id))
            .await
            .map_err(|e| LumenError::ConcurrencyError(format!("purge task failed: {e}")))?
    }

    /// Replace all content-hash claims with those of the registry's active
    /// documents, after the registry was loaded from a snapshot. Returns the
    /// number claimed.
    pub fn restore_claims(&self) -> usize {
        self.inner.dedup.clear();
        let mut claimed = 0;
        for entry in self.inner.registry.entries() {
            if entry.is_active() {
                self.inner
                    .dedup
                    .register(&entry.document.id, &entry.document.content_hash);
                claimed += 1;
            }
        }
        claimed
    }
}

fn timed_out(id: &str, millis: u64) -> SubmitResult {
    SubmitResult::with_status(
        id,
        IngestStatus::TimedOut,
        format!("pipeline exceeded {millis}ms"),
    )
}

fn error_result(id: &str, error: &LumenError) -> SubmitResult {
    let status = match error {
        LumenError::ValidationError(_) => IngestStatus::Rejected,
        _ => IngestStatus::Failed,
    };
    SubmitResult::with_status(id, status, error.to_string())
}

/// Whether a prior outcome is final enough to short-circuit an identical
/// resubmission.
fn is_settled(status: IngestStatus) -> bool {
    matches!(
        status,
        IngestStatus::Accepted | IngestStatus::Rejected | IngestStatus::Duplicate
    )
}

impl GatewayInner {
    fn validate(&self, raw: &RawDocument) -> LumenResult<()> {
        if raw.id.trim().is_empty() {
            return Err(LumenError::ValidationError(
                "document id must not be empty".into(),
            ));
        }
        if raw.id.contains(CHUNK_ID_SEPARATOR) {
            return Err(LumenError::ValidationError(format!(
                "document id {:?} must not contain {CHUNK_ID_SEPARATOR:?}",
                raw.id
            )));
        }
        if raw.content.len() > self.max_content_bytes {
            return Err(LumenError::ValidationError(format!(
                "content is {} bytes, limit {}",
                raw.content.len(),
                self.max_content_bytes
            )));
        }
        Ok(())
    }

    fn id_lock(&self, id: &str) -> Arc<Mutex<()>> {
        self.id_locks
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn process(&self, raw: RawDocument, state: &AtomicU8) -> LumenResult<SubmitResult> {
        let lock = self.id_lock(&raw.id);
        let _guard = lock
            .lock()
            .map_err(|e| LumenError::ConcurrencyError(format!("document lock poisoned: {e}")))?;
        if state.load(Ordering::Acquire) == ABANDONED {
            return Ok(timed_out(&raw.id, self.config.timeout_ms));
        }

        let mut doc = Document::from_raw(&raw, Utc::now());
        let prior = self.registry.get(&raw.id);
        if let Some(prior) = &prior {
            if prior.document.raw_hash == doc.raw_hash
                && prior.document.raw_metadata == doc.raw_metadata
                && is_settled(prior.outcome.status)
            {
                debug!(document_id = %raw.id, "identical resubmission");
                let mut outcome = prior.outcome.clone();
                outcome.unchanged = true;
                return Ok(outcome);
            }
            doc.created_at = prior.document.created_at;
        }
        let prior_active = prior.filter(|p| p.is_active());
        let prior_vector = match &prior_active {
            Some(_) => self.index.get(&document_vector_id(&raw.id))?,
            None => None,
        };

        let stage_result = match self.preprocessor.run(&mut doc) {
            Ok(result) => result,
            Err(e) => {
                if begin_commit(state) && prior_active.is_none() {
                    let outcome = SubmitResult::with_status(&doc.id, IngestStatus::Failed, e.to_string());
                    self.registry.insert(DocumentEntry {
                        document: doc,
                        outcome,
                        chunks: Vec::new(),
                    });
                }
                return Err(e);
            }
        };

        let quality_score = doc
            .stage_trail
            .iter()
            .any(|r| r.stage == "quality")
            .then_some(doc.quality_score);

        let outcome = match stage_result {
            StageResult::Accepted => {
                return self.accept(doc, prior_active, prior_vector, quality_score, state);
            }
            StageResult::Rejected { reason } => SubmitResult {
                quality_score,
                ..SubmitResult::with_status(&doc.id, IngestStatus::Rejected, reason)
            },
            StageResult::Duplicate { of_id } => SubmitResult {
                quality_score,
                duplicate_of: Some(of_id.clone()),
                ..SubmitResult::with_status(
                    &doc.id,
                    IngestStatus::Duplicate,
                    format!("duplicate of {of_id}"),
                )
            },
        };
        if !begin_commit(state) {
            return Ok(timed_out(&doc.id, self.config.timeout_ms));
        }
        debug!(document_id = %doc.id, status = ?outcome.status, "not admitted");
        // An active prior version stays in place when its replacement is turned away.
        if prior_active.is_none() {
            self.registry.insert(DocumentEntry {
                document: doc,
                outcome: outcome.clone(),
                chunks: Vec::new(),
            });
        }
        Ok(outcome)
    }

    fn accept(
        &self,
        mut doc: Document,
        prior_active: Option<DocumentEntry>,
        prior_vector: Option<IndexEntry>,
        quality_score: Option<f64>,
        state: &AtomicU8,
    ) -> LumenResult<SubmitResult> {
        let report = self.verifier.verify(&doc);
        let credibility = report.score;
        doc.credibility = Some(report);

        let chunks = chunk_text(
            &doc.id,
            &doc.content,
            self.config.chunk_size_chars,
            self.config.chunk_overlap_chars,
        );
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = match self.embedder.embed_batch(&texts) {
            Ok(v) => v,
            Err(e) => {
                self.release_claim(&doc, prior_active.as_ref(), prior_vector);
                return Err(e);
            }
        };

        if !begin_commit(state) {
            self.release_claim(&doc, prior_active.as_ref(), prior_vector);
            return Ok(timed_out(&doc.id, self.config.timeout_ms));
        }

        // ── Commit ──
        if let Err(e) = self.index_chunks(&doc, &chunks, &vectors, prior_active.as_ref()) {
            warn!(document_id = %doc.id, error = %e, "chunk indexing failed, retiring document");
            self.retire(doc, prior_active.as_ref(), &e);
            return Err(e);
        }

        let mut reasons = doc.quality_flags.clone();
        if self.config.build_graph {
            if let Some(graph) = &self.graph {
                if let Err(e) = graph.merge_document(&doc.id, &doc.content, credibility) {
                    warn!(document_id = %doc.id, error = %e, "graph merge failed");
                    reasons.push(format!("graph merge failed: {e}"));
                }
            }
        }
        if let Some(prior) = &prior_active {
            if prior.document.content_hash != doc.content_hash {
                self.dedup.release(&doc.id, &prior.document.content_hash);
            }
        }

        doc.chunk_ids = chunks.iter().map(|c| c.id.clone()).collect();
        doc.lifecycle = Lifecycle::Active;
        doc.updated_at = Utc::now();
        let outcome = SubmitResult {
            document_id: doc.id.clone(),
            status: IngestStatus::Accepted,
            reasons,
            duplicate_of: None,
            quality_score,
            credibility_score: Some(credibility),
            unchanged: false,
        };
        info!(
            document_id = %doc.id,
            chunks = chunks.len(),
            credibility,
            replaced = prior_active.is_some(),
            "document accepted"
        );
        self.registry.insert(DocumentEntry {
            document: doc,
            outcome: outcome.clone(),
            chunks,
        });
        Ok(outcome)
    }

    fn index_chunks(
        &self,
        doc: &Document,
        chunks: &[Chunk],
        vectors: &[Vec<f32>],
        prior_active: Option<&DocumentEntry>,
    ) -> LumenResult<()> {
        if vectors.len() != chunks.len() {
            return Err(EmbeddingError::InferenceFailed {
                reason: format!("{} vectors for {} chunks", vectors.len(), chunks.len()),
            }
            .into());
        }
        if let Some(prior) = prior_active {
            for stale in prior.chunks.iter().skip(chunks.len()) {
                self.index.delete(&stale.id)?;
            }
        }
        for (chunk, vector) in chunks.iter().zip(vectors) {
            self.index.upsert(
                &chunk.id,
                vector,
                EntryMeta {
                    document_id: doc.id.clone(),
                    chunk_offset: chunk.offset,
                    bucket: doc.metadata.bucket.clone(),
                    kind: EntryKind::Chunk,
                },
            )?;
        }
        Ok(())
    }

    /// Undo the dedup stage's side effects for a document that will not
    /// be committed: restore the prior document vector and drop the claim.
    fn release_claim(
        &self,
        doc: &Document,
        prior_active: Option<&DocumentEntry>,
        prior_vector: Option<IndexEntry>,
    ) {
        if doc.embedding_ref.is_some() {
            let restored = match prior_vector {
                Some(entry) => self.index.upsert(&entry.id, &entry.vector, entry.meta).map(|_| ()),
                None => self.index.delete(&document_vector_id(&doc.id)).map(|_| ()),
            };
            if let Err(e) = restored {
                warn!(document_id = %doc.id, error = %e, "could not restore document vector");
            }
        }
        let shared = prior_active.is_some_and(|p| p.document.content_hash == doc.content_hash);
        if !shared {
            self.dedup.release(&doc.id, &doc.content_hash);
        }
    }

    /// Remove every trace of a document whose commit failed part-way.
    fn retire(&self, mut doc: Document, prior_active: Option<&DocumentEntry>, error: &LumenError) {
        if let Err(e) = self.index.delete_document(&doc.id) {
            warn!(document_id = %doc.id, error = %e, "could not remove vectors");
        }
        self.dedup.release(&doc.id, &doc.content_hash);
        if let Some(prior) = prior_active {
            self.dedup.release(&doc.id, &prior.document.content_hash);
        }
        if let Some(graph) = &self.graph {
            if let Err(e) = graph.retract_document(&doc.id) {
                warn!(document_id = %doc.id, error = %e, "could not retract graph evidence");
            }
        }
        let reason = format!("indexing failed: {error}");
        doc.lifecycle = Lifecycle::Rejected {
            reason: reason.clone(),
        };
        doc.embedding_ref = None;
        self.registry.insert(DocumentEntry {
            outcome: SubmitResult::with_status(&doc.id, IngestStatus::Failed, reason),
            document: doc,
            chunks: Vec::new(),
        });
    }

    fn purge(&self, id: &str) -> LumenResult<bool> {
        let lock = self.id_lock(id);
        let _guard = lock
            .lock()
            .map_err(|e| LumenError::ConcurrencyError(format!("document lock poisoned: {e}")))?;
        let Some(entry) = self.registry.get(id) else {
            return Ok(false);
        };
        let removed = self.index.delete_document(id)?;
        if let Some(graph) = &self.graph {
            graph.retract_document(id)?;
        }
        self.dedup.release(id, &entry.document.content_hash);
        self.registry.remove(id);
        info!(document_id = id, vectors = removed, "document purged");
        Ok(true)
    }
}

fn begin_commit(state: &AtomicU8) -> bool {
    state
        .compare_exchange(RUNNING, COMMITTING, Ordering::AcqRel, Ordering::Acquire)
        .is_ok()
}
