//! Cancel-ratio tracking: cancels-to-orders over a trailing window, used
//! by the risk engine to catch a strategy stuck in a cancel/resubmit
//! loop. Shares the same bucket-rotation idea as
//! [`crate::risk::rate_limiter::RateLimiter`] but tracks two counters per
//! bucket instead of one.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

const WINDOW_BUCKETS: usize = 60;
const BUCKET_NANOS: u64 = 1_000_000_000;

struct Counters {
    orders: [AtomicU32; WINDOW_BUCKETS],
    cancels: [AtomicU32; WINDOW_BUCKETS],
    current_bucket: AtomicU64,
}

impl Counters {
    fn new() -> Self {
        Self {
            orders: std::array::from_fn(|_| AtomicU32::new(0)),
            cancels: std::array::from_fn(|_| AtomicU32::new(0)),
            current_bucket: AtomicU64::new(0),
        }
    }

    fn rotate(&self, bucket_idx: u64) {
        let prev = self.current_bucket.swap(bucket_idx, Ordering::AcqRel);
        if bucket_idx == prev {
            return;
        }
        let advanced = bucket_idx.saturating_sub(prev);
        if advanced as usize >= WINDOW_BUCKETS {
            for b in &self.orders {
                b.store(0, Ordering::Relaxed);
            }
            for b in &self.cancels {
                b.store(0, Ordering::Relaxed);
            }
        } else {
            for step in 1..=advanced {
                let idx = ((prev + step) % WINDOW_BUCKETS as u64) as usize;
                self.orders[idx].store(0, Ordering::Relaxed);
                self.cancels[idx].store(0, Ordering::Relaxed);
            }
        }
    }

    fn sums(&self) -> (u32, u32) {
        let o: u32 = self.orders.iter().map(|b| b.load(Ordering::Relaxed)).sum();
        let c: u32 = self.cancels.iter().map(|b| b.load(Ordering::Relaxed)).sum();
        (o, c)
    }
}

/// Per-symbol cancels/orders ratio over the trailing 60s window.
pub struct CancelRatioTracker {
    limit: f64,
    min_orders: u32,
    per_symbol: DashMap<u32, Counters>,
}

impl CancelRatioTracker {
    pub fn new(limit: f64, min_orders: u32) -> Self {
        Self {
            limit,
            min_orders,
            per_symbol: DashMap::new(),
        }
    }

    fn bucket_index(now_ns: u64) -> u64 {
        now_ns / BUCKET_NANOS
    }

    pub fn record_order(&self, symbol_id: u32, now_ns: u64) {
        let idx = Self::bucket_index(now_ns);
        let counters = self.per_symbol.entry(symbol_id).or_insert_with(Counters::new);
        counters.rotate(idx);
        counters.orders[(idx % WINDOW_BUCKETS as u64) as usize].fetch_add(1, Ordering::AcqRel);
    }

    pub fn record_cancel(&self, symbol_id: u32, now_ns: u64) {
        let idx = Self::bucket_index(now_ns);
        let counters = self.per_symbol.entry(symbol_id).or_insert_with(Counters::new);
        counters.rotate(idx);
        counters.cancels[(idx % WINDOW_BUCKETS as u64) as usize].fetch_add(1, Ordering::AcqRel);
    }

    /// `Some(ratio)` if the trailing-window ratio exceeds the limit (and
    /// there have been enough orders to make the ratio meaningful).
    pub fn check(&self, symbol_id: u32, now_ns: u64) -> Option<f64> {
        let idx = Self::bucket_index(now_ns);
        let counters = self.per_symbol.entry(symbol_id).or_insert_with(Counters::new);
        counters.rotate(idx);
        let (orders, cancels) = counters.sums();
        if orders < self.min_orders {
            return None;
        }
        let ratio = cancels as f64 / orders as f64;
        if ratio > self.limit {
            Some(ratio)
        } else {
            None
        }
    }
}
