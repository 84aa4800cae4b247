use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use lumen_core::models::{MutationDomain, MutationEvent};
use lumen_core::traits::IMutationListener;
use moka::sync::Cache;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Store versions a cached value was computed against.
///
/// `None` means the value does not depend on that store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependencies {
    pub index: Option<u64>,
    pub graph: Option<u64>,
}

impl Dependencies {
    pub fn index(version: u64) -> Self {
        Self {
            index: Some(version),
            graph: None,
        }
    }

    pub fn graph(version: u64) -> Self {
        Self {
            index: None,
            graph: Some(version),
        }
    }

    pub fn both(index: u64, graph: u64) -> Self {
        Self {
            index: Some(index),
            graph: Some(graph),
        }
    }

    fn depends_on(&self, domain: MutationDomain) -> bool {
        match domain {
            MutationDomain::Index => self.index.is_some(),
            MutationDomain::Graph => self.graph.is_some(),
        }
    }

    /// An entry is valid for `current` if every version it depends on matches.
    fn satisfied_by(&self, current: &Dependencies) -> bool {
        let matches = |mine: Option<u64>, now: Option<u64>| match (mine, now) {
            (Some(a), Some(b)) => a == b,
            (Some(_), None) => true,
            (None, _) => true,
        };
        matches(self.index, current.index) && matches(self.graph, current.graph)
    }
}

struct Entry<V> {
    value: V,
    created: Instant,
    deps: Dependencies,
}

/// Hit/miss counters and size of a cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: u64,
    pub invalidations: u64,
    /// Writes dropped because a newer store version was already known.
    pub stale_writes: u64,
}

/// TTL-bounded cache with version-aware entries.
///
/// Writes are first-writer-wins: while a valid entry exists for a key, later
/// writes for the same key are discarded and the existing value is returned.
pub struct TtlCache<K, V> {
    name: String,
    cache: Cache<K, Arc<Entry<V>>>,
    ttl: Duration,
    index_version: AtomicU64,
    graph_version: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    invalidations: AtomicU64,
    stale_writes: AtomicU64,
}

impl<K, V> TtlCache<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(name: impl Into<String>, ttl: Duration, capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(capacity)
            .time_to_live(ttl)
            .build();
        Self {
            name: name.into(),
            cache,
            ttl,
            index_version: AtomicU64::new(0),
            graph_version: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            invalidations: AtomicU64::new(0),
            stale_writes: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn live(&self, entry: &Entry<V>, current: &Dependencies) -> bool {
        entry.created.elapsed() < self.ttl && entry.deps.satisfied_by(current)
    }

    /// Look up `key`, treating entries past TTL or computed against a version
    /// other than `current` as misses.
    pub fn get(&self, key: &K, current: &Dependencies) -> Option<V> {
        match self.cache.get(key) {
            Some(entry) if self.live(&entry, current) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.value.clone())
            }
            Some(_) => {
                self.cache.invalidate(key);
                self.invalidations.fetch_add(1, Ordering::Relaxed);
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store `value` unless a live entry already exists; returns the value
    /// that is cached afterwards (the first writer's).
    ///
    /// Values computed against a version older than one already announced
    /// through `invalidate_on` are not stored.
    pub fn insert_if_absent(&self, key: K, value: V, deps: Dependencies) -> V {
        if self.is_stale(&deps) {
            self.stale_writes.fetch_add(1, Ordering::Relaxed);
            debug!(cache = %self.name, "dropping write computed against stale version");
            return value;
        }
        if let Some(existing) = self.cache.get(&key) {
            if self.live(&existing, &deps) {
                return existing.value.clone();
            }
            self.cache.invalidate(&key);
        }
        let entry = self
            .cache
            .entry(key)
            .or_insert_with(|| {
                Arc::new(Entry {
                    value,
                    created: Instant::now(),
                    deps,
                })
            })
            .into_value();
        entry.value.clone()
    }

    fn is_stale(&self, deps: &Dependencies) -> bool {
        deps.index
            .is_some_and(|v| v < self.index_version.load(Ordering::Acquire))
            || deps
                .graph
                .is_some_and(|v| v < self.graph_version.load(Ordering::Acquire))
    }

    /// Drop every entry that depends on the store `event` mutated.
    /// Returns the number of entries removed.
    pub fn invalidate_on(&self, event: &MutationEvent) -> usize {
        let domain = event.domain();
        let counter = match domain {
            MutationDomain::Index => &self.index_version,
            MutationDomain::Graph => &self.graph_version,
        };
        counter.fetch_max(event.version(), Ordering::AcqRel);

        self.cache.run_pending_tasks();
        let doomed: Vec<K> = self
            .cache
            .iter()
            .filter_map(|(k, e)| e.deps.depends_on(domain).then(|| k.as_ref().clone()))
            .collect();
        for key in &doomed {
            self.cache.invalidate(key);
        }
        if !doomed.is_empty() {
            self.invalidations
                .fetch_add(doomed.len() as u64, Ordering::Relaxed);
            debug!(
                cache = %self.name,
                removed = doomed.len(),
                domain = ?domain,
                "invalidated on mutation"
            );
        }
        doomed.len()
    }

    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.run_pending_tasks();
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.cache.entry_count(),
            invalidations: self.invalidations.load(Ordering::Relaxed),
            stale_writes: self.stale_writes.load(Ordering::Relaxed),
        }
    }

    /// Cache hit rate in [0, 1].
    pub fn hit_rate(&self) -> f64 {
        let h = self.hits.load(Ordering::Relaxed) as f64;
        let total = h + self.misses.load(Ordering::Relaxed) as f64;
        if total == 0.0 {
            0.0
        } else {
            h / total
        }
    }
}

impl<K, V> IMutationListener for TtlCache<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn on_mutation(&self, event: &MutationEvent) {
        self.invalidate_on(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache() -> TtlCache<String, Vec<u32>> {
        TtlCache::new("test", Duration::from_secs(60), 100)
    }

    #[test]
    fn miss_then_hit() {
        let c = cache();
        let deps = Dependencies::index(1);
        assert!(c.get(&"k".to_string(), &deps).is_none());
        c.insert_if_absent("k".into(), vec![1, 2], deps);
        assert_eq!(c.get(&"k".to_string(), &deps), Some(vec![1, 2]));
        let stats = c.stats();
        assert_eq!((stats.hits, stats.misses), (1, 1));
    }

    #[test]
    fn first_writer_wins() {
        let c = cache();
        let deps = Dependencies::index(1);
        let first = c.insert_if_absent("k".into(), vec![1], deps);
        let second = c.insert_if_absent("k".into(), vec![2], deps);
        assert_eq!(first, vec![1]);
        assert_eq!(second, vec![1]);
        assert_eq!(c.get(&"k".to_string(), &deps), Some(vec![1]));
    }

    #[test]
    fn version_mismatch_is_a_miss() {
        let c = cache();
        c.insert_if_absent("k".into(), vec![1], Dependencies::index(1));
        assert!(c.get(&"k".to_string(), &Dependencies::index(2)).is_none());
    }

    #[test]
    fn invalidate_on_only_touches_dependent_entries() {
        let c = cache();
        c.insert_if_absent("idx".into(), vec![1], Dependencies::index(1));
        c.insert_if_absent("kg".into(), vec![2], Dependencies::graph(1));
        let removed = c.invalidate_on(&MutationEvent::GraphMerged {
            document_id: "d".into(),
            version: 2,
        });
        assert_eq!(removed, 1);
        assert!(c.get(&"idx".to_string(), &Dependencies::index(1)).is_some());
        assert!(c.get(&"kg".to_string(), &Dependencies::graph(1)).is_none());
    }

    #[test]
    fn writes_against_old_versions_are_dropped() {
        let c = cache();
        c.invalidate_on(&MutationEvent::IndexUpserted {
            id: "x".into(),
            version: 5,
        });
        c.insert_if_absent("k".into(), vec![1], Dependencies::index(4));
        assert!(c.get(&"k".to_string(), &Dependencies::index(4)).is_none());
        assert_eq!(c.stats().stale_writes, 1);
    }

    #[test]
    fn expired_entries_are_not_served() {
        let c: TtlCache<String, u8> = TtlCache::new("short", Duration::from_millis(30), 10);
        c.insert_if_absent("k".into(), 1, Dependencies::default());
        std::thread::sleep(Duration::from_millis(60));
        assert!(c.get(&"k".to_string(), &Dependencies::default()).is_none());
    }
}
