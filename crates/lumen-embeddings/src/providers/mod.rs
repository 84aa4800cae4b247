mod hashed_tfidf;

use std::sync::Arc;

use lumen_core::config::EmbeddingConfig;
use lumen_core::traits::IEmbeddingProvider;
use tracing::warn;

pub use hashed_tfidf::HashedTfIdf;

/// Build the built-in provider named in config.
///
/// Unknown names fall back to the hashed TF-IDF provider; real model-backed
/// providers are injected by the host through `EmbeddingEngine::with_providers`.
pub fn create_provider(config: &EmbeddingConfig, dimensions: usize) -> Arc<dyn IEmbeddingProvider> {
    match config.provider.as_str() {
        "hashed-tfidf" | "tfidf" => Arc::new(HashedTfIdf::new(dimensions)),
        other => {
            warn!(
                provider = other,
                "unknown embedding provider, using hashed-tfidf"
            );
            Arc::new(HashedTfIdf::new(dimensions))
        }
    }
}
