//! Exact linear cosine scan.

use std::collections::HashMap;

use rayon::prelude::*;

use crate::entry::{rank, IndexEntry, IndexFilter, IndexHit};

/// Above this many entries the scan runs on the rayon pool.
const PARALLEL_SCAN_THRESHOLD: usize = 4_096;

/// Dot product of two normalized vectors.
pub(crate) fn dot(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (*x as f64) * (*y as f64))
        .sum::<f64>()
        .clamp(-1.0, 1.0)
}

pub(crate) fn to_hit(entry: &IndexEntry, score: f64) -> IndexHit {
    IndexHit {
        id: entry.id.clone(),
        distance: 1.0 - score,
        score,
        meta: entry.meta.clone(),
    }
}

/// Top `k` entries by cosine similarity to the normalized `query`.
pub(crate) fn scan(
    entries: &HashMap<String, IndexEntry>,
    query: &[f32],
    k: usize,
    filter: &IndexFilter,
) -> Vec<IndexHit> {
    let score = |e: &IndexEntry| to_hit(e, dot(query, &e.vector));
    let mut hits: Vec<IndexHit> = if entries.len() >= PARALLEL_SCAN_THRESHOLD {
        entries
            .par_iter()
            .filter(|(_, e)| filter.matches(&e.meta))
            .map(|(_, e)| score(e))
            .collect()
    } else {
        entries
            .values()
            .filter(|e| filter.matches(&e.meta))
            .map(score)
            .collect()
    };
    rank(&mut hits);
    hits.truncate(k);
    hits
}
