use serde::{Deserialize, Serialize};

/// Which store a mutation happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationDomain {
    Index,
    Graph,
}

/// A store mutation, published to registered listeners after it commits.
///
/// `version` is the store's version after the mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MutationEvent {
    IndexUpserted { id: String, version: u64 },
    IndexDeleted { id: String, version: u64 },
    IndexRebuilt { version: u64 },
    IndexLoaded { version: u64 },
    GraphMerged { document_id: String, version: u64 },
    GraphRetracted { document_id: String, version: u64 },
    GraphRebuilt { version: u64 },
    GraphLoaded { version: u64 },
}

impl MutationEvent {
    pub fn domain(&self) -> MutationDomain {
        match self {
            MutationEvent::IndexUpserted { .. }
            | MutationEvent::IndexDeleted { .. }
            | MutationEvent::IndexRebuilt { .. }
            | MutationEvent::IndexLoaded { .. } => MutationDomain::Index,
            MutationEvent::GraphMerged { .. }
            | MutationEvent::GraphRetracted { .. }
            | MutationEvent::GraphRebuilt { .. }
            | MutationEvent::GraphLoaded { .. } => MutationDomain::Graph,
        }
    }

    pub fn version(&self) -> u64 {
        match self {
            MutationEvent::IndexUpserted { version, .. }
            | MutationEvent::IndexDeleted { version, .. }
            | MutationEvent::IndexRebuilt { version }
            | MutationEvent::IndexLoaded { version }
            | MutationEvent::GraphMerged { version, .. }
            | MutationEvent::GraphRetracted { version, .. }
            | MutationEvent::GraphRebuilt { version }
            | MutationEvent::GraphLoaded { version } => *version,
        }
    }
}
