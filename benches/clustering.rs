//! Benchmarks for the clustering hot paths: tokenizing, index building,
//! union-find and bucket linking.

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use rapidcluster::dsu::ClusterForest;
use rapidcluster::test_support::generate_rows;
use rapidcluster::{cluster_index, BigramTokenizer, IndexBuilder};
use std::hint::black_box;
use std::time::Duration;

// =============================================================================
// TOKENIZER
// =============================================================================

fn bench_tokenize(c: &mut Criterion) {
    let tokenizer = BigramTokenizer::default();
    let mut group = c.benchmark_group("tokenize");

    for &(name, value) in &[
        ("single", "widget"),
        ("short", "red cotton shirt"),
        ("long", "heavy duty stainless steel kitchen mixing bowl set with lids and measuring cups"),
    ] {
        group.bench_with_input(BenchmarkId::new("for_each_bigram", name), value, |b, value| {
            b.iter(|| {
                let mut bytes = 0usize;
                tokenizer.for_each_bigram(black_box(value), |bigram| bytes += bigram.len());
                black_box(bytes)
            })
        });
    }
    group.finish();
}

// =============================================================================
// INDEX BUILD
// =============================================================================

fn bench_index_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("index_build");
    group.sample_size(20);
    group.warm_up_time(Duration::from_millis(500));

    let tokenizer = BigramTokenizer::default();
    for &count in &[10_000u64, 100_000] {
        let rows = generate_rows(count, 2_000, 0.3, 42);
        group.throughput(Throughput::Elements(count));

        group.bench_with_input(BenchmarkId::new("sequential", count), &rows, |b, rows| {
            b.iter(|| {
                let mut builder = IndexBuilder::new(tokenizer.clone()).with_progress_interval(0);
                builder.add_rows(rows);
                black_box(builder.finish())
            })
        });
        group.bench_with_input(BenchmarkId::new("parallel", count), &rows, |b, rows| {
            b.iter(|| black_box(IndexBuilder::build_parallel(&tokenizer, rows)))
        });
    }
    group.finish();
}

// =============================================================================
// UNION-FIND
// =============================================================================

fn bench_forest(c: &mut Criterion) {
    let mut group = c.benchmark_group("cluster_forest");

    for &size in &[10_000u32, 1_000_000] {
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("chain_then_compress", size), &size, |b, &size| {
            b.iter_batched(
                || ClusterForest::with_capacity(size as usize),
                |mut forest| {
                    let mut previous = forest.make_set();
                    for _ in 1..size {
                        let next = forest.make_set();
                        let _ = forest.attach(previous, next);
                        previous = next;
                    }
                    forest.compress_all();
                    black_box(forest.num_roots())
                },
                BatchSize::LargeInput,
            )
        });
    }
    group.finish();
}

// =============================================================================
// LINKING
// =============================================================================

fn bench_cluster(c: &mut Criterion) {
    let mut group = c.benchmark_group("cluster_index");
    group.sample_size(20);

    for &(count, vocabulary) in &[(50_000u64, 200u32), (50_000, 20_000)] {
        let rows = generate_rows(count, vocabulary, 0.3, 7);
        let (index, _) = IndexBuilder::build_parallel(&BigramTokenizer::default(), &rows);
        let capacity = index.capacity_hint();

        group.throughput(Throughput::Elements(count));
        group.bench_with_input(
            BenchmarkId::new(format!("vocab_{vocabulary}"), count),
            &index,
            |b, index| b.iter(|| black_box(cluster_index(index, capacity))),
        );
    }
    group.finish();
}

criterion_group!(tokenizer_benches, bench_tokenize);
criterion_group!(index_benches, bench_index_build);
criterion_group!(linker_benches, bench_forest, bench_cluster);

criterion_main!(tokenizer_benches, index_benches, linker_benches);
