//! Chunk planning benchmarks.

use budgetsync_bench::generate_transactions;
use budgetsync_engine::{Chunker, SyncConfig};
use budgetsync_protocol::TrackedField;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

/// Benchmark planning chunk boundaries over growing inputs.
fn bench_plan(c: &mut Criterion) {
    let mut group = c.benchmark_group("plan");
    let chunker = Chunker::new(SyncConfig::default().effective_budget(), 160);

    for count in [1_000, 12_000, 50_000] {
        let items = generate_transactions(count);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &items, |b, items| {
            b.iter(|| {
                let ranges = chunker.plan(black_box(items), TrackedField::Transactions).unwrap();
                black_box(ranges);
            });
        });
    }

    group.finish();
}

/// Benchmark planning with items near the budget.
fn bench_plan_large_items(c: &mut Criterion) {
    let budget = SyncConfig::default().effective_budget();
    let chunker = Chunker::new(budget, 160);
    let items: Vec<_> = (0..20)
        .map(|i| serde_json::json!({"id": i, "note": "x".repeat(budget * 7 / 10)}))
        .collect();

    c.bench_function("plan_large_items", |b| {
        b.iter(|| {
            let ranges = chunker.plan(black_box(&items), TrackedField::Debts).unwrap();
            black_box(ranges);
        });
    });
}

criterion_group!(benches, bench_plan, bench_plan_large_items);
criterion_main!(benches);
