use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use lumen_core::config::IndexConfig;
use lumen_core::similarity::normalize;
use lumen_index::{EntryKind, EntryMeta, IndexFilter, VectorIndex};

const DIMS: usize = 64;

fn vector(seed: u64) -> Vec<f32> {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
    let mut v: Vec<f32> = (0..DIMS)
        .map(|_| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
            ((state >> 40) as f32 / (1u64 << 24) as f32) - 0.5
        })
        .collect();
    normalize(&mut v);
    v
}

fn build(n: u64, ann_threshold: usize) -> VectorIndex {
    let idx = VectorIndex::new(IndexConfig {
        dimensions: DIMS,
        ann_threshold,
        ..IndexConfig::default()
    });
    for i in 0..n {
        let meta = EntryMeta {
            document_id: format!("d{}", i / 10),
            chunk_offset: 0,
            bucket: "b".into(),
            kind: EntryKind::Chunk,
        };
        let _ = idx.upsert(&format!("c{i}"), &vector(i), meta);
    }
    idx
}

fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("index_search");
    for n in [1_000u64, 10_000] {
        let exact = build(n, usize::MAX);
        let ann = build(n, 500);
        let q = vector(999_999);
        group.bench_with_input(BenchmarkId::new("exact", n), &n, |b, _| {
            b.iter(|| exact.search(black_box(&q), 10, &IndexFilter::default()))
        });
        group.bench_with_input(BenchmarkId::new("hnsw", n), &n, |b, _| {
            b.iter(|| ann.search(black_box(&q), 10, &IndexFilter::default()))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_search);
criterion_main!(benches);
