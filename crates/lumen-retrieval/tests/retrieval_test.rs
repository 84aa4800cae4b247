use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use lumen_core::config::{GraphConfig, LumenConfig};
use lumen_core::errors::{LumenError, LumenResult, StorageError};
use lumen_core::models::{HitSource, RawDocument, SearchFilters, SearchRequest, SearchResponse};
use lumen_core::traits::{IEmbeddingProvider, IReranker};
use lumen_embeddings::HashedTfIdf;
use lumen_graph::KnowledgeGraph;
use lumen_index::VectorIndex;
use lumen_ingestion::IngestionGateway;
use lumen_retrieval::RetrievalEngine;

const DIMS: usize = 128;

const TOWER: &str = "The Eiffel Tower is a wrought-iron lattice tower on the Champ de Mars in Paris. \
                     It was designed by the company of Gustave Eiffel and completed in 1889.";
const LOUVRE: &str = "The Louvre is the most visited museum in Paris and in the world. \
                      It holds the Mona Lisa and thousands of other works of art.";
const RIVER: &str = "The Seine flows through Paris before reaching the English Channel at Le Havre. \
                     Barges carry freight along its banks every day.";
const ALPS: &str = "The Alps stretch across eight countries and include Mont Blanc. \
                    Skiers visit the resorts there each winter.";
const MOON: &str = "The Moon orbits the Earth roughly every twenty seven days. \
                    Its gravity drives the ocean tides along every coastline.";

struct SlowEmbedder {
    inner: HashedTfIdf,
    delay: Duration,
}

impl IEmbeddingProvider for SlowEmbedder {
    fn embed(&self, text: &str) -> LumenResult<Vec<f32>> {
        std::thread::sleep(self.delay);
        self.inner.embed(text)
    }

    fn dimensions(&self) -> usize {
        DIMS
    }

    fn name(&self) -> &str {
        "slow"
    }

    fn is_available(&self) -> bool {
        true
    }
}

struct FailingReranker;

impl IReranker for FailingReranker {
    fn rerank(&self, _query: &str, _passages: &[&str]) -> LumenResult<Vec<f64>> {
        Err(LumenError::DegradedMode {
            component: "reranker".into(),
            fallback: "vector order".into(),
        })
    }

    fn name(&self) -> &str {
        "failing"
    }
}

struct Fixture {
    gateway: IngestionGateway,
    engine: RetrievalEngine,
    index: Arc<VectorIndex>,
    graph: Arc<KnowledgeGraph>,
}

async fn fixture_with(config: LumenConfig) -> Fixture {
    let embedder: Arc<dyn IEmbeddingProvider> = Arc::new(HashedTfIdf::new(DIMS));
    let index = Arc::new(VectorIndex::with_dimensions(DIMS));
    let graph = Arc::new(KnowledgeGraph::new(GraphConfig::default()));
    let gateway = IngestionGateway::new(
        &config,
        Arc::clone(&embedder),
        Arc::clone(&index),
        Some(Arc::clone(&graph)),
    )
    .unwrap();
    for (id, text) in [("tower", TOWER), ("louvre", LOUVRE), ("river", RIVER), ("alps", ALPS), ("moon", MOON)] {
        let doc = RawDocument::new(id, text).with_meta("origin", format!("https://example.org/{id}"));
        gateway.submit(doc).await.unwrap();
    }
    let engine = RetrievalEngine::new(
        &config,
        embedder,
        Arc::clone(&index),
        Some(Arc::clone(&graph)),
        Arc::clone(gateway.registry()),
    )
    .unwrap();
    Fixture {
        gateway,
        engine,
        index,
        graph,
    }
}

async fn fixture() -> Fixture {
    fixture_with(LumenConfig::default()).await
}

fn assert_ordered(response: &SearchResponse) {
    for pair in response.results.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        assert!(
            a.score > b.score
                || (a.score == b.score
                    && (a.document_id < b.document_id
                        || (a.document_id == b.document_id && a.chunk_offset <= b.chunk_offset))),
            "results out of order: {a:?} before {b:?}"
        );
    }
}

// =============================================================================
// RANKING
// =============================================================================

#[tokio::test]
async fn most_relevant_document_ranks_first() {
    let f = fixture().await;
    let response = f.engine.search(SearchRequest::new("Eiffel Tower Champ de Mars", 3)).await.unwrap();
    assert!(!response.cached);
    assert!(!response.is_degraded());
    assert!(!response.results.is_empty());
    assert!(response.results.len() <= 3);
    let top = &response.results[0];
    assert_eq!(top.document_id, "tower");
    assert_eq!(top.provenance.source, HitSource::Vector);
    assert_eq!(top.provenance.chunk_id, "tower#0");
    assert_eq!(top.provenance.origin.as_deref(), Some("https://example.org/tower"));
    assert!(top.provenance.rerank_score.is_some());
    assert!(top.credibility_score > 0.0 && top.credibility_score <= 1.0);
    assert!(top.snippet.contains("Eiffel Tower"));
    assert_ordered(&response);
}

#[tokio::test]
async fn ranking_is_deterministic_across_engines() {
    let mut config = LumenConfig::default();
    config.cache.enabled = false;
    let a = fixture_with(config.clone()).await;
    let b = fixture_with(config).await;
    let request = SearchRequest::new("river through Paris", 5);
    let ra = a.engine.search(request.clone()).await.unwrap();
    let rb = b.engine.search(request).await.unwrap();
    assert_eq!(ra.results, rb.results);
    assert_ordered(&ra);
}

#[tokio::test]
async fn zero_top_k_uses_the_default() {
    let f = fixture().await;
    let response = f.engine.search(SearchRequest::new("Paris", 0)).await.unwrap();
    assert!(!response.results.is_empty());
    assert!(response.results.len() <= LumenConfig::default().retrieval.default_top_k);
}

#[tokio::test]
async fn empty_query_is_rejected() {
    let f = fixture().await;
    let err = f.engine.search(SearchRequest::new("   ", 3)).await.unwrap_err();
    assert!(matches!(err, LumenError::ValidationError(_)));
}

// =============================================================================
// FILTERS
// =============================================================================

#[tokio::test]
async fn document_filter_restricts_results() {
    let f = fixture().await;
    let filters = SearchFilters {
        document_ids: Some(BTreeSet::from(["river".to_string()])),
        ..SearchFilters::default()
    };
    let response = f
        .engine
        .search(SearchRequest::new("Paris", 5).with_filters(filters))
        .await
        .unwrap();
    assert!(!response.results.is_empty());
    assert!(response.results.iter().all(|h| h.document_id == "river"));
}

#[tokio::test]
async fn credibility_floor_above_one_excludes_everything() {
    let f = fixture().await;
    let filters = SearchFilters {
        min_credibility: Some(1.01),
        ..SearchFilters::default()
    };
    let response = f
        .engine
        .search(SearchRequest::new("Paris", 5).with_filters(filters))
        .await
        .unwrap();
    assert!(response.results.is_empty());
}

// =============================================================================
// CACHE
// =============================================================================

#[tokio::test]
async fn repeated_query_is_served_from_cache() {
    let f = fixture().await;
    let request = SearchRequest::new("museum with the Mona Lisa", 3);
    let first = f.engine.search(request.clone()).await.unwrap();
    let second = f.engine.search(request).await.unwrap();
    assert!(!first.cached);
    assert!(second.cached);
    assert_eq!(first.fingerprint, second.fingerprint);

    let mut a = serde_json::to_value(&first).unwrap();
    let mut b = serde_json::to_value(&second).unwrap();
    a["cached"] = serde_json::Value::Bool(true);
    b["cached"] = serde_json::Value::Bool(true);
    assert_eq!(a, b);

    let stats = f.engine.cache_stats().unwrap();
    assert_eq!(stats.hits, 1);
}

#[tokio::test]
async fn ingest_invalidates_cached_results() {
    let f = fixture().await;
    let request = SearchRequest::new("Gustave Eiffel", 3);
    f.engine.search(request.clone()).await.unwrap();
    assert!(f.engine.search(request.clone()).await.unwrap().cached);

    let version = f.index.version();
    f.gateway
        .submit(RawDocument::new("bio", "Gustave Eiffel was a French civil engineer born in Dijon."))
        .await
        .unwrap();
    assert!(f.index.version() > version);

    let fresh = f.engine.search(request).await.unwrap();
    assert!(!fresh.cached);
    assert!(fresh.results.iter().any(|h| h.document_id == "bio"));
}

#[tokio::test]
async fn disabled_cache_never_reports_cached() {
    let mut config = LumenConfig::default();
    config.cache.enabled = false;
    let f = fixture_with(config).await;
    let request = SearchRequest::new("Paris", 3);
    f.engine.search(request.clone()).await.unwrap();
    assert!(!f.engine.search(request).await.unwrap().cached);
    assert!(f.engine.cache_stats().is_none());
}

// =============================================================================
// GRAPH EXPANSION
// =============================================================================

#[tokio::test]
async fn graph_expansion_tags_results_with_entities() {
    let f = fixture().await;
    let response = f
        .engine
        .search(SearchRequest::new("What is there to see in Paris?", 5).with_kg_expansion(true))
        .await
        .unwrap();
    assert!(!response.is_degraded(), "{:?}", response.degraded);
    assert!(response
        .results
        .iter()
        .any(|h| h.provenance.via_entities.iter().any(|e| e == "Paris")));
    let paris: Vec<_> = response
        .results
        .iter()
        .filter(|h| h.provenance.via_entities.iter().any(|e| e == "Paris"))
        .map(|h| h.document_id.as_str())
        .collect();
    assert!(paris.iter().all(|d| ["tower", "louvre", "river"].contains(d)));
}

#[tokio::test]
async fn unavailable_graph_degrades_instead_of_failing() {
    let f = fixture().await;
    f.graph.set_available(false);
    let request = SearchRequest::new("Paris", 3).with_kg_expansion(true);
    let response = f.engine.search(request.clone()).await.unwrap();
    assert!(!response.results.is_empty());
    assert_eq!(response.degraded.len(), 1);
    assert_eq!(response.degraded[0].stage, "kg_expansion");

    // degraded answers are not cached
    assert!(!f.engine.search(request.clone()).await.unwrap().cached);

    f.graph.set_available(true);
    let healthy = f.engine.search(request).await.unwrap();
    assert!(!healthy.is_degraded());
}

#[tokio::test]
async fn expansion_without_a_graph_is_degraded() {
    let f = fixture().await;
    let engine = RetrievalEngine::new(
        &LumenConfig::default(),
        Arc::new(HashedTfIdf::new(DIMS)),
        Arc::clone(&f.index),
        None,
        Arc::clone(f.gateway.registry()),
    )
    .unwrap();
    let response = engine
        .search(SearchRequest::new("Paris", 3).with_kg_expansion(true))
        .await
        .unwrap();
    assert_eq!(response.degraded[0].stage, "kg_expansion");
    assert!(!response.results.is_empty());
}

// =============================================================================
// RERANK FALLBACK
// =============================================================================

#[tokio::test]
async fn failing_reranker_keeps_vector_order() {
    let f = fixture().await;
    let engine = f.engine.clone().with_reranker(Some(Arc::new(FailingReranker)));
    let response = engine.search(SearchRequest::new("Seine barges", 5)).await.unwrap();
    assert_eq!(response.degraded.len(), 1);
    assert_eq!(response.degraded[0].stage, "rerank");
    assert!(!response.results.is_empty());
    for hit in &response.results {
        assert_eq!(hit.score, hit.provenance.vector_score);
        assert!(hit.provenance.rerank_score.is_none());
    }
    assert_ordered(&response);
}

#[tokio::test]
async fn no_reranker_is_not_degraded() {
    let f = fixture().await;
    let engine = f.engine.clone().with_reranker(None);
    let response = engine.search(SearchRequest::new("Seine barges", 5)).await.unwrap();
    assert!(!response.is_degraded());
    assert_eq!(response.results[0].document_id, "river");
}

// =============================================================================
// FAILURES
// =============================================================================

#[tokio::test]
async fn unavailable_index_is_a_storage_error() {
    let f = fixture().await;
    let request = SearchRequest::new("Paris", 3);
    f.engine.search(request.clone()).await.unwrap();

    f.index.set_available(false);
    let err = f.engine.search(request).await.unwrap_err();
    assert!(matches!(
        err,
        LumenError::StorageError(StorageError::Unavailable { .. })
    ));
}

#[tokio::test]
async fn slow_search_times_out() {
    let mut config = LumenConfig::default();
    config.retrieval.timeout_ms = 50;
    let f = fixture_with(config.clone()).await;
    let engine = RetrievalEngine::new(
        &config,
        Arc::new(SlowEmbedder {
            inner: HashedTfIdf::new(DIMS),
            delay: Duration::from_millis(300),
        }),
        Arc::clone(&f.index),
        Some(Arc::clone(&f.graph)),
        Arc::clone(f.gateway.registry()),
    )
    .unwrap();
    let err = engine.search(SearchRequest::new("Paris", 3)).await.unwrap_err();
    assert!(matches!(err, LumenError::Timeout { millis: 50, .. }));
}

#[tokio::test]
async fn purged_documents_disappear_from_results() {
    let f = fixture().await;
    assert!(f.gateway.purge("tower").await.unwrap());
    let response = f.engine.search(SearchRequest::new("Eiffel Tower", 5)).await.unwrap();
    assert!(response.results.iter().all(|h| h.document_id != "tower"));
}
