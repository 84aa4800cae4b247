//! EmbeddingEngine: the entry point of lumen-embeddings.
//!
//! Coordinates the provider fallback chain and the L1 cache, and checks every
//! vector against the configured dimensionality. Implements `IEmbeddingProvider`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use lumen_core::config::EmbeddingConfig;
use lumen_core::errors::{EmbeddingError, LumenResult};
use lumen_core::traits::IEmbeddingProvider;
use tracing::{debug, info};

use crate::cache::L1MemoryCache;
use crate::degradation::{FallbackChain, FallbackEvent};
use crate::providers::{self, HashedTfIdf};

/// Cached, fallback-aware embedding provider.
pub struct EmbeddingEngine {
    chain: FallbackChain,
    cache: L1MemoryCache,
    dimensions: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl EmbeddingEngine {
    /// Engine with the configured built-in provider.
    pub fn new(config: &EmbeddingConfig, dimensions: usize) -> Self {
        Self::with_providers(
            vec![providers::create_provider(config, dimensions)],
            config,
            dimensions,
        )
    }

    /// Engine over injected providers, in priority order. The hashed TF-IDF
    /// provider is appended as the last resort unless the chain already has it.
    pub fn with_providers(
        primary: Vec<Arc<dyn IEmbeddingProvider>>,
        config: &EmbeddingConfig,
        dimensions: usize,
    ) -> Self {
        let last_resort = HashedTfIdf::new(dimensions);
        let has_last_resort = primary.iter().any(|p| p.name() == last_resort.name());
        let mut chain = FallbackChain::new();
        for p in primary {
            chain.push(p);
        }
        if !has_last_resort {
            chain.push(Arc::new(last_resort));
        }

        info!(
            provider = chain.active_provider_name(),
            dims = dimensions,
            "EmbeddingEngine initialized"
        );

        Self {
            chain,
            cache: L1MemoryCache::new(config.l1_cache_size),
            dimensions,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn check_dimensions(&self, v: &[f32]) -> LumenResult<()> {
        if v.len() != self.dimensions {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimensions,
                actual: v.len(),
            }
            .into());
        }
        Ok(())
    }

    pub fn active_provider(&self) -> &str {
        self.chain.active_provider_name()
    }

    /// Number of providers in the fallback chain.
    pub fn provider_count(&self) -> usize {
        self.chain.len()
    }

    pub fn drain_fallback_events(&self) -> Vec<FallbackEvent> {
        self.chain.drain_events()
    }

    /// (hits, misses) of the L1 cache.
    pub fn cache_stats(&self) -> (u64, u64) {
        (
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
        )
    }
}

impl IEmbeddingProvider for EmbeddingEngine {
    fn embed(&self, text: &str) -> LumenResult<Vec<f32>> {
        let key = L1MemoryCache::key_for(text);
        if let Some(v) = self.cache.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!(hash = %key, "embedding cache hit");
            return Ok(v);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        let v = self.chain.embed(text)?;
        self.check_dimensions(&v)?;
        self.cache.insert(key, v.clone());
        Ok(v)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "lumen-embedding-engine"
    }

    fn is_available(&self) -> bool {
        !self.chain.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct WrongDims;
    impl IEmbeddingProvider for WrongDims {
        fn embed(&self, _text: &str) -> LumenResult<Vec<f32>> {
            Ok(vec![1.0; 3])
        }
        fn dimensions(&self) -> usize {
            3
        }
        fn name(&self) -> &str {
            "wrong-dims"
        }
        fn is_available(&self) -> bool {
            true
        }
    }

    #[test]
    fn embed_returns_configured_dims() {
        let engine = EmbeddingEngine::new(&EmbeddingConfig::default(), 64);
        assert_eq!(engine.embed("test query").unwrap().len(), 64);
        assert_eq!(engine.active_provider(), "hashed-tfidf");
    }

    #[test]
    fn second_embed_is_a_cache_hit() {
        let engine = EmbeddingEngine::new(&EmbeddingConfig::default(), 32);
        let a = engine.embed("same text").unwrap();
        let b = engine.embed("same text").unwrap();
        assert_eq!(a, b);
        assert_eq!(engine.cache_stats(), (1, 1));
    }

    #[test]
    fn dimension_mismatch_is_an_error() {
        let engine =
            EmbeddingEngine::with_providers(vec![Arc::new(WrongDims)], &EmbeddingConfig::default(), 8);
        let err = engine.embed("x").unwrap_err();
        assert!(err.to_string().contains("dimension mismatch"));
    }
}
