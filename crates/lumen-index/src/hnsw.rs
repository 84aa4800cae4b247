//! Hierarchical navigable small-world graph over normalized vectors.
//!
//! Node levels are derived from a hash of the entry id, so the same inserts in
//! the same order always produce the same graph. Deletes and overwrites leave
//! tombstones that are still traversed but never returned; `rebuild` on the
//! store reclaims them.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap, HashSet};

use crate::exact::dot;

/// Upper bound on node level.
const MAX_LEVEL: usize = 16;

#[derive(Debug, Clone, Copy)]
pub(crate) struct HnswParams {
    /// Max neighbors per node on layers above 0.
    pub m: usize,
    /// Max neighbors per node on layer 0.
    pub m0: usize,
    pub ef_construction: usize,
    level_mult: f64,
}

impl HnswParams {
    pub fn new(m: usize, ef_construction: usize) -> Self {
        let m = m.max(2);
        Self {
            m,
            m0: m * 2,
            ef_construction: ef_construction.max(m),
            level_mult: 1.0 / (m as f64).ln(),
        }
    }
}

struct Node {
    id: String,
    vector: Vec<f32>,
    neighbors: Vec<Vec<u32>>,
    deleted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Candidate {
    sim: f64,
    node: u32,
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sim
            .total_cmp(&other.sim)
            .then_with(|| other.node.cmp(&self.node))
    }
}

pub(crate) struct Hnsw {
    params: HnswParams,
    nodes: Vec<Node>,
    by_id: HashMap<String, u32>,
    entry: Option<u32>,
    max_level: usize,
    tombstones: usize,
}

impl Hnsw {
    pub fn new(params: HnswParams) -> Self {
        Self {
            params,
            nodes: Vec::new(),
            by_id: HashMap::new(),
            entry: None,
            max_level: 0,
            tombstones: 0,
        }
    }

    pub fn tombstones(&self) -> usize {
        self.tombstones
    }

    pub fn live(&self) -> usize {
        self.by_id.len()
    }

    fn level_for(&self, id: &str) -> usize {
        let hash = blake3::hash(id.as_bytes());
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&hash.as_bytes()[..8]);
        // Uniform in (0, 1].
        let r = ((u64::from_le_bytes(buf) >> 11) as f64 + 1.0) / (1u64 << 53) as f64;
        ((-r.ln() * self.params.level_mult).floor() as usize).min(MAX_LEVEL)
    }

    fn sim(&self, query: &[f32], node: u32) -> f64 {
        dot(query, &self.nodes[node as usize].vector)
    }

    /// Mark the live node for `id` as deleted. Returns whether one existed.
    pub fn remove(&mut self, id: &str) -> bool {
        match self.by_id.remove(id) {
            Some(idx) => {
                self.nodes[idx as usize].deleted = true;
                self.tombstones += 1;
                true
            }
            None => false,
        }
    }

    /// Insert `vector` under `id`, tombstoning any previous node for that id.
    pub fn insert(&mut self, id: &str, vector: Vec<f32>) {
        self.remove(id);

        let level = self.level_for(id);
        let idx = self.nodes.len() as u32;
        self.nodes.push(Node {
            id: id.to_string(),
            vector,
            neighbors: vec![Vec::new(); level + 1],
            deleted: false,
        });
        self.by_id.insert(id.to_string(), idx);

        let Some(mut ep) = self.entry else {
            self.entry = Some(idx);
            self.max_level = level;
            return;
        };

        let query = self.nodes[idx as usize].vector.clone();
        for lc in (level + 1..=self.max_level).rev() {
            if let Some(best) = self.search_layer(&query, &[ep], 1, lc).first() {
                ep = best.node;
            }
        }

        let mut eps = vec![ep];
        for lc in (0..=level.min(self.max_level)).rev() {
            let found = self.search_layer(&query, &eps, self.params.ef_construction, lc);
            let cap = if lc == 0 { self.params.m0 } else { self.params.m };
            let selected: Vec<u32> = found
                .iter()
                .filter(|c| c.node != idx)
                .take(cap)
                .map(|c| c.node)
                .collect();
            self.nodes[idx as usize].neighbors[lc] = selected.clone();
            for nb in selected {
                self.link(nb, idx, lc, cap);
            }
            eps = found.iter().map(|c| c.node).collect();
            if eps.is_empty() {
                eps.push(ep);
            }
        }

        if level > self.max_level {
            self.max_level = level;
            self.entry = Some(idx);
        }
    }

    /// Add `to` to `from`'s adjacency on `level`, pruning to the `cap` closest.
    fn link(&mut self, from: u32, to: u32, level: usize, cap: usize) {
        let list = &mut self.nodes[from as usize].neighbors[level];
        if list.contains(&to) {
            return;
        }
        list.push(to);
        if list.len() <= cap {
            return;
        }
        let current = list.clone();
        let base = &self.nodes[from as usize].vector;
        let mut scored: Vec<Candidate> = current
            .into_iter()
            .map(|n| Candidate {
                sim: dot(base, &self.nodes[n as usize].vector),
                node: n,
            })
            .collect();
        scored.sort_by(|a, b| b.cmp(a));
        scored.truncate(cap);
        self.nodes[from as usize].neighbors[level] = scored.into_iter().map(|c| c.node).collect();
    }

    /// Best-first search on one layer. Returns up to `ef` candidates, most
    /// similar first.
    fn search_layer(&self, query: &[f32], entry: &[u32], ef: usize, level: usize) -> Vec<Candidate> {
        let mut visited: HashSet<u32> = HashSet::new();
        let mut frontier: BinaryHeap<Candidate> = BinaryHeap::new();
        let mut results: BinaryHeap<Reverse<Candidate>> = BinaryHeap::new();

        for &ep in entry {
            if visited.insert(ep) {
                let c = Candidate {
                    sim: self.sim(query, ep),
                    node: ep,
                };
                frontier.push(c);
                results.push(Reverse(c));
                if results.len() > ef {
                    results.pop();
                }
            }
        }

        while let Some(current) = frontier.pop() {
            let worst = results.peek().map(|r| r.0.sim).unwrap_or(f64::MIN);
            if results.len() >= ef && current.sim < worst {
                break;
            }
            let Some(adjacent) = self.nodes[current.node as usize].neighbors.get(level) else {
                continue;
            };
            for &nb in adjacent {
                if !visited.insert(nb) {
                    continue;
                }
                let sim = self.sim(query, nb);
                let worst = results.peek().map(|r| r.0.sim).unwrap_or(f64::MIN);
                if results.len() < ef || sim > worst {
                    let c = Candidate { sim, node: nb };
                    frontier.push(c);
                    results.push(Reverse(c));
                    if results.len() > ef {
                        results.pop();
                    }
                }
            }
        }

        results.into_sorted_vec().into_iter().map(|r| r.0).collect()
    }

    /// Up to `k` live ids closest to `query` that pass `accept`.
    pub fn search(
        &self,
        query: &[f32],
        k: usize,
        ef: usize,
        accept: impl Fn(&str) -> bool,
    ) -> Vec<(String, f64)> {
        let Some(mut ep) = self.entry else {
            return Vec::new();
        };
        for lc in (1..=self.max_level).rev() {
            if let Some(best) = self.search_layer(query, &[ep], 1, lc).first() {
                ep = best.node;
            }
        }
        self.search_layer(query, &[ep], ef.max(k), 0)
            .into_iter()
            .filter_map(|c| {
                let node = &self.nodes[c.node as usize];
                (!node.deleted && accept(&node.id)).then(|| (node.id.clone(), c.sim))
            })
            .take(k)
            .collect()
    }
}
