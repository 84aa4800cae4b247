//! # lumen-retrieval
//!
//! Retrieval engine. A query is fingerprinted and served from the cache when
//! the index and graph are unchanged; otherwise it is expanded, searched
//! against chunk vectors, optionally widened through the knowledge graph,
//! reranked, diversified, and cached. Optional stages that fail degrade the
//! response instead of failing it.

pub mod diversity;
pub mod engine;
pub mod expansion;
pub mod rerank;

pub use engine::{RetrievalEngine, SearchCache};
pub use rerank::LexicalReranker;
