use bog_core::book::{Book, BookConfig};
use bog_core::core::types::{OrderId, Side};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn populated_book() -> Book {
    let mut book = Book::new(1, BookConfig::default());
    for i in 0..500u64 {
        book.add_order(OrderId::new(i + 1), 1_000_000 - i, 100, Side::Buy, i).unwrap();
        book.add_order(OrderId::new(i + 501), 1_000_100 + i, 100, Side::Sell, i).unwrap();
    }
    book
}

fn bench_add_order(c: &mut Criterion) {
    c.bench_function("book/add_order_new_level", |b| {
        let mut book = populated_book();
        let mut next_id = 2000u64;
        b.iter(|| {
            next_id += 1;
            black_box(book.add_order(OrderId::new(next_id), 900_000, 10, Side::Buy, next_id).ok());
        })
    });
}

fn bench_cancel_order(c: &mut Criterion) {
    c.bench_function("book/cancel_order", |b| {
        b.iter_batched(
            populated_book,
            |mut book| black_box(book.cancel_order(OrderId::new(1), 0).ok()),
            criterion::BatchSize::SmallInput,
        )
    });
}

fn bench_best_bid_ask(c: &mut Criterion) {
    let book = populated_book();
    c.bench_function("book/best_bid_ask", |b| {
        b.iter(|| black_box(book.best_bid_ask()))
    });
}

fn bench_snapshot_publish(c: &mut Criterion) {
    c.bench_function("book/apply_fill_publishes_snapshot", |b| {
        b.iter_batched(
            populated_book,
            |mut book| black_box(book.apply_fill(OrderId::new(1), 10, 0).ok()),
            criterion::BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_add_order, bench_cancel_order, bench_best_bid_ask, bench_snapshot_publish);
criterion_main!(benches);
