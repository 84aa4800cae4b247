//! # lumen-embeddings
//!
//! The embedding capability is injected: any `IEmbeddingProvider` can be placed
//! in the fallback chain. This crate ships a deterministic hashed TF-IDF
//! provider that is always available, a fallback chain, and an L1 cache.

pub mod cache;
pub mod degradation;
pub mod engine;
pub mod providers;

pub use degradation::{FallbackChain, FallbackEvent};
pub use engine::EmbeddingEngine;
pub use providers::HashedTfIdf;
