use bog_core::core::types::Side;
use bog_core::position::PositionStore;
use bog_core::risk::var::CovarianceMatrix;
use bog_core::risk::{OrderIntent, RiskEngine, RiskLimits};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn engine_and_positions() -> (RiskEngine, PositionStore) {
    let engine = RiskEngine::new(RiskLimits::default(), CovarianceMatrix::identity(4, 0.0001));
    let positions = PositionStore::new();
    positions.get_or_insert(1);
    (engine, positions)
}

fn bench_check_order_approved(c: &mut Criterion) {
    let (engine, positions) = engine_and_positions();
    let intent = OrderIntent { symbol_id: 1, side: Side::Buy, price: 1_000, quantity: 10 };
    let weights = vec![0.25; 4];
    c.bench_function("risk/check_order_approved", |b| {
        b.iter(|| {
            black_box(engine.check_order(
                black_box(&intent),
                black_box(&positions),
                black_box(0),
                black_box(&weights),
                black_box(&weights),
                black_box(1_000_000_000),
            ))
        })
    });
}

fn bench_check_order_rate_limited(c: &mut Criterion) {
    let limits = RiskLimits { rate_limit_per_sec: 1, ..RiskLimits::default() };
    let engine = RiskEngine::new(limits, CovarianceMatrix::identity(4, 0.0001));
    let positions = PositionStore::new();
    positions.get_or_insert(1);
    let intent = OrderIntent { symbol_id: 1, side: Side::Buy, price: 1_000, quantity: 10 };
    let weights = vec![0.25; 4];
    engine.check_order(&intent, &positions, 0, &weights, &weights, 1_000_000_000);

    c.bench_function("risk/check_order_rate_limited", |b| {
        b.iter(|| {
            black_box(engine.check_order(
                black_box(&intent),
                black_box(&positions),
                black_box(0),
                black_box(&weights),
                black_box(&weights),
                black_box(1_000_000_000),
            ))
        })
    });
}

fn bench_observe_quote(c: &mut Criterion) {
    let (engine, _) = engine_and_positions();
    c.bench_function("risk/observe_quote", |b| {
        b.iter(|| black_box(engine.observe_quote(1, 999, 1001)))
    });
}

criterion_group!(benches, bench_check_order_approved, bench_check_order_rate_limited, bench_observe_quote);
criterion_main!(benches);
