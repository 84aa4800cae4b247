//! # lumen-graph
//!
//! Knowledge graph store. Documents are merged incrementally: entity mentions
//! are extracted, disambiguated against same-named entities (every decision
//! is audited), and linked by co-occurrence relations whose strength in
//! [0, 1] reflects how often, how closely, and how credibly they co-occur.
//! Relations may carry a valid-time range. `rebuild()` repairs the graph
//! globally under an exclusive lock.

pub mod disambiguation;
pub mod engine;
pub mod extraction;
pub mod graph;
pub mod query;
pub mod strength;
pub mod temporal;

pub use engine::{
    GraphQueryCache, GraphStats, KnowledgeGraph, MergeReport, RebuildReport, StagedGraph,
};
pub use query::{
    EntityDetail, EntityRef, GraphAnswer, GraphPath, GraphQuery, GraphQueryResult, Neighbor,
    RelationView, TimeWindow,
};
