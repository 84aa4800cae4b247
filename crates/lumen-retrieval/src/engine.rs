//! RetrievalEngine: the search pipeline.
//!
//! fingerprint → cache → expand → vector top-N → graph expansion (optional)
//! → rerank → order → diversity → cache write.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use lumen_cache::{fingerprint, CacheStats, Dependencies, TtlCache};
use lumen_core::config::{LumenConfig, RetrievalConfig};
use lumen_core::constants::SNIPPET_MAX_CHARS;
use lumen_core::errors::{LumenError, LumenResult, StorageError};
use lumen_core::models::{
    Chunk, DegradedStage, HitSource, Provenance, SearchFilters, SearchHit, SearchRequest,
    SearchResponse,
};
use lumen_core::similarity::cosine_similarity;
use lumen_core::traits::{IEmbeddingProvider, IReranker};
use lumen_graph::{GraphQuery, GraphQueryResult, KnowledgeGraph};
use lumen_index::{EntryKind, IndexFilter, VectorIndex};
use lumen_ingestion::DocumentRegistry;
use serde::Serialize;
use tracing::{debug, info_span, warn};

use crate::diversity::{diversify, Diversifiable};
use crate::expansion::expanded_query;
use crate::rerank::LexicalReranker;

/// Search responses keyed by request fingerprint.
pub type SearchCache = TtlCache<String, SearchResponse>;

const FINGERPRINT_NAMESPACE: &str = "lumen.search";

/// The request as it affects results; hashed into the cache key.
#[derive(Debug, Serialize)]
struct CacheKey<'a> {
    query: &'a str,
    top_k: usize,
    filters: &'a SearchFilters,
    enable_kg_expansion: bool,
    reranker: Option<&'a str>,
}

#[derive(Debug, Clone)]
struct Candidate {
    chunk: Chunk,
    origin: Option<String>,
    credibility: f64,
    source: HitSource,
    vector_score: f64,
    rerank_score: Option<f64>,
    score: f64,
    via_entities: BTreeSet<String>,
}

impl Diversifiable for Candidate {
    fn document_id(&self) -> &str {
        &self.chunk.document_id
    }

    fn text(&self) -> &str {
        &self.chunk.text
    }
}

struct EngineInner {
    config: RetrievalConfig,
    embedder: Arc<dyn IEmbeddingProvider>,
    index: Arc<VectorIndex>,
    graph: Option<Arc<KnowledgeGraph>>,
    registry: Arc<DocumentRegistry>,
    reranker: Option<Arc<dyn IReranker>>,
    cache: Option<Arc<SearchCache>>,
}

/// Answers search requests over the indexed corpus. Cheap to clone.
#[derive(Clone)]
pub struct RetrievalEngine {
    inner: Arc<EngineInner>,
}

impl RetrievalEngine {
    /// Build an engine with the lexical reranker and, when enabled in
    /// `config.cache`, a result cache subscribed to both stores.
    pub fn new(
        config: &LumenConfig,
        embedder: Arc<dyn IEmbeddingProvider>,
        index: Arc<VectorIndex>,
        graph: Option<Arc<KnowledgeGraph>>,
        registry: Arc<DocumentRegistry>,
    ) -> LumenResult<Self> {
        let cache = if config.cache.enabled {
            let cache = Arc::new(SearchCache::new(
                "search",
                Duration::from_secs(config.cache.ttl_secs),
                config.cache.capacity,
            ));
            index.subscribe(cache.clone())?;
            if let Some(graph) = &graph {
                graph.subscribe(cache.clone())?;
            }
            Some(cache)
        } else {
            None
        };
        Ok(Self {
            inner: Arc::new(EngineInner {
                config: config.retrieval.clone(),
                embedder,
                index,
                graph,
                registry,
                reranker: Some(Arc::new(LexicalReranker)),
                cache,
            }),
        })
    }

    /// Replace the reranker; `None` ranks by vector score alone.
    pub fn with_reranker(self, reranker: Option<Arc<dyn IReranker>>) -> Self {
        let inner = EngineInner {
            config: self.inner.config.clone(),
            embedder: self.inner.embedder.clone(),
            index: self.inner.index.clone(),
            graph: self.inner.graph.clone(),
            registry: self.inner.registry.clone(),
            reranker,
            cache: self.inner.cache.clone(),
        };
        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.inner.cache.as_ref().map(|c| c.stats())
    }

    /// Search with the configured timeout.
    ///
    /// Results are totally ordered: score descending, then document id
    /// ascending, then chunk offset ascending. Equal inputs against the same
    /// index and graph versions always give the same order.
    pub async fn search(&self, request: SearchRequest) -> LumenResult<SearchResponse> {
        let millis = self.inner.config.timeout_ms;
        let inner = self.inner.clone();
        let task = tokio::task::spawn_blocking(move || inner.search(&request));
        match tokio::time::timeout(Duration::from_millis(millis), task).await {
            Ok(joined) => joined
                .map_err(|e| LumenError::ConcurrencyError(format!("search task failed: {e}")))?,
            Err(_) => Err(LumenError::Timeout {
                operation: "search".into(),
                millis,
            }),
        }
    }

    /// Search on the calling thread, without a timeout. Ordering is the same
    /// as [`search`](Self::search).
    pub fn search_blocking(&self, request: &SearchRequest) -> LumenResult<SearchResponse> {
        self.inner.search(request)
    }
}

impl EngineInner {
    fn search(&self, request: &SearchRequest) -> LumenResult<SearchResponse> {
        let query = request.query.trim();
        let span = info_span!("lumen.retrieval", query_len = query.len());
        let _entered = span.enter();
        let started = Instant::now();

        if query.is_empty() {
            return Err(LumenError::ValidationError("query must not be empty".into()));
        }
        if !self.index.is_available() {
            return Err(StorageError::Unavailable {
                store: "vector-index".into(),
            }
            .into());
        }
        let top_k = if request.top_k == 0 {
            self.config.default_top_k
        } else {
            request.top_k
        };
        let key = fingerprint(
            FINGERPRINT_NAMESPACE,
            &CacheKey {
                query,
                top_k,
                filters: &request.filters,
                enable_kg_expansion: request.enable_kg_expansion,
                reranker: self.reranker.as_ref().map(|r| r.name()),
            },
        );
        let deps = self.dependencies(request.enable_kg_expansion);

        if let Some(cache) = &self.cache {
            if let Some(mut hit) = cache.get(&key, &deps) {
                debug!(fingerprint = %key, "search served from cache");
                hit.cached = true;
                return Ok(hit);
            }
        }

        let text = if self.config.query_expansion {
            expanded_query(query)
        } else {
            query.to_string()
        };
        let vector = self.embedder.embed(&text)?;
        let n = top_k.saturating_mul(self.config.candidate_multiplier).max(top_k);
        let filter = IndexFilter {
            document_ids: request.filters.document_ids.clone(),
            bucket: request.filters.bucket.clone(),
            kind: Some(EntryKind::Chunk),
            exclude_document: None,
        };
        let hits = self.index.search(&vector, n, &filter)?;

        let mut candidates: BTreeMap<String, Candidate> = BTreeMap::new();
        for hit in hits {
            if let Some(c) = self.candidate(&hit.id, hit.score, HitSource::Vector, request) {
                candidates.insert(hit.id, c);
            }
        }

        let mut degraded = Vec::new();
        if request.enable_kg_expansion {
            match &self.graph {
                Some(graph) => {
                    if let Err(e) = self.expand_via_graph(graph, query, &vector, n, request, &mut candidates) {
                        warn!(error = %e, "graph expansion failed, continuing with vector candidates");
                        degraded.push(DegradedStage {
                            stage: "kg_expansion".into(),
                            reason: e.to_string(),
                        });
                    }
                }
                None => degraded.push(DegradedStage {
                    stage: "kg_expansion".into(),
                    reason: "no knowledge graph configured".into(),
                }),
            }
        }

        let mut ranked: Vec<Candidate> = candidates.into_values().collect();
        if let Some(reason) = self.rerank(query, &mut ranked) {
            degraded.push(DegradedStage {
                stage: "rerank".into(),
                reason,
            });
        }
        ranked.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.chunk.document_id.cmp(&b.chunk.document_id))
                .then_with(|| a.chunk.offset.cmp(&b.chunk.offset))
        });
        let kept = diversify(
            ranked,
            self.config.near_duplicate_threshold,
            self.config.max_per_document,
            top_k,
        );

        let response = SearchResponse {
            results: kept.into_iter().map(into_hit).collect(),
            cached: false,
            degraded,
            fingerprint: key.clone(),
        };
        debug!(
            results = response.results.len(),
            degraded = response.degraded.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "search complete"
        );

        // Degraded answers are not cached so the next call can retry the stage.
        match &self.cache {
            Some(cache) if !response.is_degraded() => Ok(cache.insert_if_absent(key, response, deps)),
            _ => Ok(response),
        }
    }

    fn dependencies(&self, uses_graph: bool) -> Dependencies {
        match (&self.graph, uses_graph) {
            (Some(graph), true) => Dependencies::both(self.index.version(), graph.version()),
            _ => Dependencies::index(self.index.version()),
        }
    }

    /// A candidate for an indexed chunk of an active document that passes
    /// the request filters.
    fn candidate(
        &self,
        chunk_id: &str,
        vector_score: f64,
        source: HitSource,
        request: &SearchRequest,
    ) -> Option<Candidate> {
        let chunk = self.registry.chunk(chunk_id)?;
        let document = self.registry.document(&chunk.document_id)?;
        let filters = &request.filters;
        if let Some(ids) = &filters.document_ids {
            if !ids.contains(&document.id) {
                return None;
            }
        }
        if let Some(bucket) = &filters.bucket {
            if &document.metadata.bucket != bucket {
                return None;
            }
        }
        let credibility = document.credibility_score();
        if filters.min_credibility.is_some_and(|min| credibility < min) {
            return None;
        }
        Some(Candidate {
            chunk,
            origin: document.metadata.origin.clone(),
            credibility,
            source,
            vector_score,
            rerank_score: None,
            score: vector_score,
            via_entities: BTreeSet::new(),
        })
    }

    /// Add chunks of documents that mention entities related to the query.
    fn expand_via_graph(
        &self,
        graph: &KnowledgeGraph,
        query: &str,
        query_vector: &[f32],
        limit: usize,
        request: &SearchRequest,
        candidates: &mut BTreeMap<String, Candidate>,
    ) -> LumenResult<()> {
        let mentioned = graph.entities_in_text(query)?;
        if mentioned.is_empty() {
            return Ok(());
        }

        // entity id → display name, mentioned entities first
        let mut related: Vec<(String, String)> = mentioned
            .iter()
            .map(|e| (e.id.clone(), e.name.clone()))
            .collect();
        let mut neighbors = Vec::new();
        for entity in &mentioned {
            let answer = graph.query(&GraphQuery::neighbors(entity.id.clone()))?;
            if let GraphQueryResult::Neighbors { items } = answer.result {
                neighbors.extend(items);
            }
        }
        neighbors.sort_by(|a, b| {
            b.strength
                .total_cmp(&a.strength)
                .then_with(|| a.entity.id.cmp(&b.entity.id))
        });
        for n in neighbors.into_iter().take(self.config.kg_expansion_limit) {
            if !related.iter().any(|(id, _)| *id == n.entity.id) {
                related.push((n.entity.id, n.entity.name));
            }
        }

        let mut added = 0;
        for (entity_id, name) in &related {
            for document_id in graph.documents_for(entity_id)? {
                let Some(entry) = self.registry.get(&document_id) else {
                    continue;
                };
                if !entry.is_active() {
                    continue;
                }
                for chunk in &entry.chunks {
                    if let Some(existing) = candidates.get_mut(&chunk.id) {
                        existing.via_entities.insert(name.clone());
                        continue;
                    }
                    if added >= limit {
                        continue;
                    }
                    let Some(stored) = self.index.get(&chunk.id)? else {
                        continue;
                    };
                    let score = cosine_similarity(query_vector, &stored.vector).max(0.0);
                    if let Some(mut c) =
                        self.candidate(&chunk.id, score, HitSource::GraphExpansion, request)
                    {
                        c.via_entities.insert(name.clone());
                        candidates.insert(chunk.id.clone(), c);
                        added += 1;
                    }
                }
            }
        }
        debug!(entities = related.len(), added, "graph expansion");
        Ok(())
    }

    /// Blend reranker scores into candidate scores. Returns the reason when
    /// the reranker failed and vector order was kept.
    fn rerank(&self, query: &str, candidates: &mut [Candidate]) -> Option<String> {
        let reranker = self.reranker.as_ref()?;
        if candidates.is_empty() {
            return None;
        }
        let passages: Vec<&str> = candidates.iter().map(|c| c.chunk.text.as_str()).collect();
        let scores = match reranker.rerank(query, &passages) {
            Ok(scores) => scores,
            Err(e) => {
                warn!(reranker = reranker.name(), error = %e, "rerank failed, keeping vector order");
                return Some(e.to_string());
            }
        };
        if scores.len() != candidates.len() || scores.iter().any(|s| !s.is_finite()) {
            warn!(
                reranker = reranker.name(),
                expected = candidates.len(),
                got = scores.len(),
                "reranker returned unusable scores, keeping vector order"
            );
            return Some(format!(
                "{} returned {} scores for {} passages",
                reranker.name(),
                scores.len(),
                candidates.len()
            ));
        }
        let weight = self.config.rerank_weight.clamp(0.0, 1.0);
        for (candidate, score) in candidates.iter_mut().zip(scores) {
            let score = score.clamp(0.0, 1.0);
            candidate.rerank_score = Some(score);
            candidate.score = (1.0 - weight) * candidate.vector_score + weight * score;
        }
        None
    }
}

fn snippet(text: &str) -> String {
    match text.char_indices().nth(SNIPPET_MAX_CHARS) {
        Some((cut, _)) => text[..cut].trim_end().to_string(),
        None => text.to_string(),
    }
}

fn into_hit(c: Candidate) -> SearchHit {
    SearchHit {
        document_id: c.chunk.document_id.clone(),
        chunk_offset: c.chunk.offset,
        score: c.score,
        credibility_score: c.credibility,
        snippet: snippet(&c.chunk.text),
        provenance: Provenance {
            chunk_id: c.chunk.id,
            origin: c.origin,
            source: c.source,
            vector_score: c.vector_score,
            rerank_score: c.rerank_score,
            via_entities: c.via_entities.into_iter().collect(),
        },
    }
}
