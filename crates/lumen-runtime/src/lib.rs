//! # lumen-runtime
//!
//! Loads a [`LumenConfig`](lumen_core::config::LumenConfig), installs
//! tracing, and wires the embedder, vector index, knowledge graph, ingestion
//! gateway, and retrieval engine together. Also snapshots and restores the
//! whole runtime state.

pub mod engine;
pub mod observability;

pub use engine::{LumenRuntime, RestoreReport};
pub use observability::init_tracing;
