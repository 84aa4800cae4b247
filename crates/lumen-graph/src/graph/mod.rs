pub mod maintenance;
pub mod stable_graph;

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

pub use stable_graph::IndexedGraph;

/// What one merged document contributed to the graph, kept so the document
/// can be retracted or re-merged exactly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub credibility: f64,
    /// Entity id to this document's mentions of it.
    pub mentions: BTreeMap<String, DocMention>,
    /// Relations backed by this document, as (source, target) entity ids.
    pub relations: BTreeSet<(String, String)>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocMention {
    pub count: u64,
    /// Normalized names co-mentioned in the document.
    pub context: BTreeSet<String>,
}
