//! # Pipeline Benchmarks
//!
//! Throughput of sequences pulled through chains of stages.
//!
//! Run with: `cargo bench -p basho-core`

use basho_core::{Collaborators, ExprEvaluator, Sequence, run};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use futures::executor::block_on;
use std::hint::black_box;
use std::sync::Arc;

fn tokens(line: &[&str]) -> Vec<String> {
    line.iter().map(|s| (*s).to_string()).collect()
}

fn range_literal(size: usize) -> String {
    serde_json::json!((0..size).collect::<Vec<_>>()).to_string()
}

fn collaborators() -> Collaborators {
    Collaborators::new(Arc::new(ExprEvaluator))
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_map_filter_reduce(c: &mut Criterion) {
    let mut group = c.benchmark_group("map_filter_reduce");

    for size in [100, 1000, 10000].iter() {
        let literal = range_literal(*size);
        let line = tokens(&[
            literal.as_str(), "-j", "x * 2", "-f", "x % 3 == 0", "-r", "acc + x", "0",
        ]);
        group.bench_with_input(BenchmarkId::from_parameter(size), &line, |b, line| {
            b.iter(|| {
                let items = block_on(async {
                    let out = run(collaborators(), line).await.expect("pipeline");
                    out.sequence.to_vec().await
                });
                black_box(items)
            });
        });
    }

    group.finish();
}

fn bench_combine(c: &mut Criterion) {
    let mut group = c.benchmark_group("combine");

    for size in [100, 1000].iter() {
        let literal = range_literal(*size);
        let line = tokens(&[
            literal.as_str(), "-n", "a", "-j", "x + 1", "-n", "b", "-j", "x * 2", "-n", "c", "-c",
            "a,b,c",
        ]);
        group.bench_with_input(BenchmarkId::from_parameter(size), &line, |b, line| {
            b.iter(|| {
                let items = block_on(async {
                    let out = run(collaborators(), line).await.expect("pipeline");
                    out.sequence.to_vec().await
                });
                black_box(items)
            });
        });
    }

    group.finish();
}

fn bench_replay(c: &mut Criterion) {
    let values = (0..1000).map(serde_json::Value::from).collect();
    let base = Sequence::from_values(values).map(|item, _| async move { item });

    c.bench_function("replay_plain_1000", |b| {
        b.iter(|| black_box(block_on(base.to_vec())));
    });

    let memoized = base.memoized();
    c.bench_function("replay_memoized_1000", |b| {
        b.iter(|| black_box(block_on(memoized.to_vec())));
    });
}

criterion_group!(benches, bench_map_filter_reduce, bench_combine, bench_replay);
criterion_main!(benches);
