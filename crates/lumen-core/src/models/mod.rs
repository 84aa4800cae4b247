mod credibility;
mod document;
mod entity;
mod event;
mod ingest;
mod merge_decision;
mod retrieval;
mod stage;

pub use credibility::{ComponentScore, CredibilityComponent, CredibilityReport};
pub use document::{content_hash, Chunk, Document, Lifecycle, SourceMetadata};
pub use entity::{Entity, EntityType, EvidenceStats, Relation, ValidTime};
pub use event::{MutationDomain, MutationEvent};
pub use ingest::{IngestStatus, RawDocument, SubmitResult};
pub use merge_decision::{MergeDecision, MergeReason};
pub use retrieval::{
    DegradedStage, HitSource, Provenance, SearchFilters, SearchHit, SearchRequest, SearchResponse,
};
pub use stage::{StageRecord, StageResult};
