use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use lumen_core::config::EmbeddingConfig;
use lumen_core::errors::{EmbeddingError, LumenResult};
use lumen_core::traits::IEmbeddingProvider;
use lumen_embeddings::{EmbeddingEngine, HashedTfIdf};

const DIMS: usize = 32;

/// Reports itself available but fails every call.
#[derive(Default)]
struct FlakyRemote {
    calls: AtomicUsize,
}

impl IEmbeddingProvider for FlakyRemote {
    fn embed(&self, _text: &str) -> LumenResult<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(EmbeddingError::InferenceFailed {
            reason: "connection reset".to_string(),
        }
        .into())
    }
    fn dimensions(&self) -> usize {
        DIMS
    }
    fn name(&self) -> &str {
        "flaky-remote"
    }
    fn is_available(&self) -> bool {
        true
    }
}

struct Offline;

impl IEmbeddingProvider for Offline {
    fn embed(&self, _text: &str) -> LumenResult<Vec<f32>> {
        Ok(vec![0.0; DIMS])
    }
    fn dimensions(&self) -> usize {
        DIMS
    }
    fn name(&self) -> &str {
        "offline"
    }
    fn is_available(&self) -> bool {
        false
    }
}

// =============================================================================
// CHAIN CONSTRUCTION
// =============================================================================

#[test]
fn builtin_provider_is_not_chained_twice() {
    let engine = EmbeddingEngine::new(&EmbeddingConfig::default(), DIMS);
    assert_eq!(engine.provider_count(), 1);
    assert_eq!(engine.active_provider(), "hashed-tfidf");

    let explicit = EmbeddingEngine::with_providers(
        vec![Arc::new(HashedTfIdf::new(DIMS))],
        &EmbeddingConfig::default(),
        DIMS,
    );
    assert_eq!(explicit.provider_count(), 1);
}

#[test]
fn injected_primary_gets_tfidf_behind_it() {
    let engine = EmbeddingEngine::with_providers(
        vec![Arc::new(FlakyRemote::default())],
        &EmbeddingConfig::default(),
        DIMS,
    );
    assert_eq!(engine.provider_count(), 2);
    assert_eq!(engine.active_provider(), "flaky-remote");
}

// =============================================================================
// FALLBACK
// =============================================================================

#[test]
fn failing_primary_falls_back_and_records_event() {
    let remote = Arc::new(FlakyRemote::default());
    let engine = EmbeddingEngine::with_providers(
        vec![remote.clone() as Arc<dyn IEmbeddingProvider>],
        &EmbeddingConfig::default(),
        DIMS,
    );

    let v = engine.embed("the tower stands in Paris").unwrap();
    assert_eq!(v.len(), DIMS);
    assert_eq!(v, HashedTfIdf::new(DIMS).embed("the tower stands in Paris").unwrap());

    let events = engine.drain_fallback_events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].failed_provider, "flaky-remote");
    assert_eq!(events[0].fallback_used, "hashed-tfidf");
    assert!(events[0].reason.contains("connection reset"), "{}", events[0].reason);
    assert!(engine.drain_fallback_events().is_empty());

    // Served from the L1 cache: the primary is not retried.
    engine.embed("the tower stands in Paris").unwrap();
    assert_eq!(remote.calls.load(Ordering::SeqCst), 1);
    assert!(engine.drain_fallback_events().is_empty());
}

#[test]
fn unavailable_primary_is_skipped() {
    let engine = EmbeddingEngine::with_providers(
        vec![Arc::new(Offline)],
        &EmbeddingConfig::default(),
        DIMS,
    );
    assert_eq!(engine.active_provider(), "hashed-tfidf");

    let v = engine.embed("museum on the river").unwrap();
    assert!(v.iter().any(|x| *x != 0.0));
    let events = engine.drain_fallback_events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].failed_provider, "offline");
    assert_eq!(events[0].reason, "unavailable");
}
