//! # lumen-cache
//!
//! Generic TTL-bounded key/value cache used by retrieval and graph queries.
//! Entries remember the store versions they were computed against and are
//! dropped by `invalidate_on(event)` or lazily on a version mismatch.

mod fingerprint;
mod ttl_cache;

pub use fingerprint::fingerprint;
pub use ttl_cache::{CacheStats, Dependencies, TtlCache};
