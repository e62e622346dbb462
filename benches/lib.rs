use criterion::{criterion_group, criterion_main};


criterion_group!(
    benches,
    evaluator::bench_evaluator,
    evaluator::bench_scorer,
    transit_search::bench_transit_search,
);
criterion_main!(benches);
