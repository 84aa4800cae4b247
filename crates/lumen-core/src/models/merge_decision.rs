use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::EntityType;

/// Why a mention was (or was not) merged into an existing entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeReason {
    /// No entity with the same normalized name existed.
    NoCandidate,
    /// Same name, incompatible types: kept as a homonym.
    TypeMismatch,
    /// Same name and type, but contexts did not overlap enough.
    BelowThreshold,
    /// Same name, compatible type, sufficient overlap.
    ContextOverlap,
    /// The candidate had no context yet, so type agreement decided.
    NoContext,
    /// Merged during an explicit rebuild.
    Rebuild,
}

/// Append-only audit record of a disambiguation decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeDecision {
    pub normalized_name: String,
    pub mention_type: EntityType,
    pub document_id: Option<String>,
    /// The best existing candidate considered, if any.
    pub candidate_id: Option<String>,
    /// The entity the mention ended up attached to.
    pub chosen_id: String,
    pub merged: bool,
    pub overlap: f64,
    pub reason: MergeReason,
    pub timestamp: DateTime<Utc>,
}
