//! Fallback chain for embedding generation.
//!
//! Providers are tried in priority order; each fallback is logged and recorded.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use lumen_core::errors::{EmbeddingError, LumenResult};
use lumen_core::traits::IEmbeddingProvider;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Record of one fallback from the primary provider to a later one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackEvent {
    pub failed_provider: String,
    pub fallback_used: String,
    pub reason: String,
    pub timestamp: DateTime<Utc>,
}

/// Ordered list of providers; the first that succeeds wins.
#[derive(Default)]
pub struct FallbackChain {
    chain: Vec<Arc<dyn IEmbeddingProvider>>,
    events: Mutex<Vec<FallbackEvent>>,
}

impl FallbackChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a provider to the end of the chain.
    pub fn push(&mut self, provider: Arc<dyn IEmbeddingProvider>) {
        self.chain.push(provider);
    }

    /// Embed with the first available provider that succeeds.
    pub fn embed(&self, text: &str) -> LumenResult<Vec<f32>> {
        self.run(|p| p.embed(text))
    }

    /// Batch variant of [`FallbackChain::embed`].
    pub fn embed_batch(&self, texts: &[String]) -> LumenResult<Vec<Vec<f32>>> {
        self.run(|p| p.embed_batch(texts))
    }

    fn run<T>(
        &self,
        mut call: impl FnMut(&dyn IEmbeddingProvider) -> LumenResult<T>,
    ) -> LumenResult<T> {
        let mut last_error = None;
        let mut failed: Option<(String, String)> = None;

        for provider in &self.chain {
            if !provider.is_available() {
                if failed.is_none() {
                    failed = Some((provider.name().to_string(), "unavailable".to_string()));
                }
                continue;
            }
            match call(provider.as_ref()) {
                Ok(out) => {
                    if let Some((failed_provider, reason)) = failed {
                        self.record(FallbackEvent {
                            failed_provider,
                            fallback_used: provider.name().to_string(),
                            reason,
                            timestamp: Utc::now(),
                        });
                    }
                    return Ok(out);
                }
                Err(e) => {
                    warn!(
                        provider = provider.name(),
                        error = %e,
                        "provider failed, trying next in chain"
                    );
                    if failed.is_none() {
                        failed = Some((provider.name().to_string(), e.to_string()));
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            EmbeddingError::ProviderUnavailable {
                provider: format!("all {} providers exhausted", self.chain.len()),
            }
            .into()
        }))
    }

    fn record(&self, event: FallbackEvent) {
        warn!(
            failed = %event.failed_provider,
            fallback = %event.fallback_used,
            "embedding fell back to secondary provider"
        );
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }

    /// Name of the first available provider.
    pub fn active_provider_name(&self) -> &str {
        self.chain
            .iter()
            .find(|p| p.is_available())
            .map(|p| p.name())
            .unwrap_or("none")
    }

    /// Drain accumulated fallback events.
    pub fn drain_events(&self) -> Vec<FallbackEvent> {
        self.events
            .lock()
            .map(|mut e| std::mem::take(&mut *e))
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::HashedTfIdf;

    /// A mock provider that always fails.
    struct FailingProvider;
    impl IEmbeddingProvider for FailingProvider {
        fn embed(&self, _text: &str) -> LumenResult<Vec<f32>> {
            Err(EmbeddingError::InferenceFailed {
                reason: "mock failure".to_string(),
            }
            .into())
        }
        fn dimensions(&self) -> usize {
            16
        }
        fn name(&self) -> &str {
            "failing"
        }
        fn is_available(&self) -> bool {
            true
        }
    }

    #[test]
    fn falls_back_and_records_event() {
        let mut chain = FallbackChain::new();
        chain.push(Arc::new(FailingProvider));
        chain.push(Arc::new(HashedTfIdf::new(16)));

        let v = chain.embed("hello world").unwrap();
        assert_eq!(v.len(), 16);

        let events = chain.drain_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].failed_provider, "failing");
        assert_eq!(events[0].fallback_used, "hashed-tfidf");
        assert!(chain.drain_events().is_empty());
    }

    #[test]
    fn empty_chain_errors() {
        let chain = FallbackChain::new();
        assert!(chain.embed("x").is_err());
        assert_eq!(chain.active_provider_name(), "none");
    }

    #[test]
    fn all_failing_returns_last_error() {
        let mut chain = FallbackChain::new();
        chain.push(Arc::new(FailingProvider));
        let err = chain.embed("x").unwrap_err();
        assert!(err.to_string().contains("mock failure"));
    }
}
