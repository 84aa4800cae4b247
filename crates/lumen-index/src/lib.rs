//! # lumen-index
//!
//! Vector Index Store. Small corpora are searched with an exact linear cosine
//! scan; once the live entry count reaches `ann_threshold` an HNSW graph is
//! built and maintained incrementally. The switch is transparent to callers.

mod entry;
mod exact;
mod hnsw;
mod store;

pub use entry::{EntryKind, EntryMeta, IndexEntry, IndexFilter, IndexHit};
pub use store::{IndexStats, RebuildReport, StagedIndex, UpsertOutcome, VectorIndex};
