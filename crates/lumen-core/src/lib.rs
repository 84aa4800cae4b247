//! # lumen-core
//!
//! Foundation crate for the Lumen ingestion and retrieval engine.
//! Defines all shared types, traits, errors, config, and constants.
//! Every other crate in the workspace depends on this.

pub mod config;
pub mod constants;
pub mod errors;
pub mod models;
pub mod similarity;
pub mod snapshot;
pub mod traits;

// Re-export the most commonly used types at the crate root.
pub use config::LumenConfig;
pub use errors::{LumenError, LumenResult};
pub use models::{
    Chunk, CredibilityReport, Document, Entity, EntityType, Lifecycle, MutationEvent, RawDocument,
    Relation, SourceMetadata, StageResult,
};
