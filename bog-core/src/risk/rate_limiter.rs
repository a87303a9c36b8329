//! Sliding-window rate limiting (component E, rule 2): per-symbol and
//! global counters over the trailing 60 one-second buckets. Bucket
//! rotation is driven by the hardware timestamp, not a background timer —
//! the risk thread is the only writer, so rotation happens inline on the
//! next check once the bucket index has moved on.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

const WINDOW_BUCKETS: usize = 60;
const BUCKET_NANOS: u64 = 1_000_000_000;

/// One sliding 60x1s window of order counts.
struct Window {
    buckets: [AtomicU32; WINDOW_BUCKETS],
    /// Bucket index (wall-clock seconds) the buckets array was last
    /// rotated to align with.
    current_bucket: AtomicU64,
}

impl Window {
    fn new() -> Self {
        Self {
            buckets: std::array::from_fn(|_| AtomicU32::new(0)),
            current_bucket: AtomicU64::new(0),
        }
    }

    /// Zero out buckets that have rolled out of the window since the last
    /// touch, then return the sum over the live window.
    fn rotate_and_sum(&self, bucket_idx: u64) -> u32 {
        let prev = self.current_bucket.swap(bucket_idx, Ordering::AcqRel);
        if bucket_idx != prev {
            let advanced = bucket_idx.saturating_sub(prev);
            if advanced as usize >= WINDOW_BUCKETS {
                for b in &self.buckets {
                    b.store(0, Ordering::Relaxed);
                }
            } else {
                // Clear every bucket strictly between prev and bucket_idx,
                // inclusive of bucket_idx, since the window rotated past them.
                for step in 1..=advanced {
                    let idx = ((prev + step) % WINDOW_BUCKETS as u64) as usize;
                    self.buckets[idx].store(0, Ordering::Relaxed);
                }
            }
        }
        self.buckets.iter().map(|b| b.load(Ordering::Relaxed)).sum()
    }

    fn increment(&self, bucket_idx: u64) {
        let idx = (bucket_idx % WINDOW_BUCKETS as u64) as usize;
        self.buckets[idx].fetch_add(1, Ordering::AcqRel);
    }
}

/// Sliding-window order-rate limiter: a global window plus one window per
/// symbol, both capped at `limit_per_window` orders per trailing 60s.
pub struct RateLimiter {
    limit_per_window: u32,
    global: Window,
    per_symbol: DashMap<u32, Window>,
}

impl RateLimiter {
    pub fn new(limit_per_window: u32) -> Self {
        Self {
            limit_per_window,
            global: Window::new(),
            per_symbol: DashMap::new(),
        }
    }

    fn bucket_index(now_ns: u64) -> u64 {
        now_ns / BUCKET_NANOS
    }

    /// Returns `true` if an order may be admitted (and records it),
    /// `false` if the trailing-window count already meets the cap.
    pub fn try_admit(&self, symbol_id: u32, now_ns: u64) -> bool {
        let bucket_idx = Self::bucket_index(now_ns);

        let global_count = self.global.rotate_and_sum(bucket_idx);
        if global_count >= self.limit_per_window {
            return false;
        }
        let symbol_window = self
            .per_symbol
            .entry(symbol_id)
            .or_insert_with(Window::new);
        let symbol_count = symbol_window.rotate_and_sum(bucket_idx);
        if symbol_count >= self.limit_per_window {
            return false;
        }

        self.global.increment(bucket_idx);
        symbol_window.increment(bucket_idx);
        true
    }

    /// Current trailing-window count without mutating state, for metrics.
    pub fn global_count(&self, now_ns: u64) -> u32 {
        self.global.rotate_and_sum(Self::bucket_index(now_ns))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEC: u64 = BUCKET_NANOS;

    #[test]
    fn admits_up_to_limit_in_same_bucket() {
        let rl = RateLimiter::new(5);
        for _ in 0..5 {
            assert!(rl.try_admit(1, 0));
        }
        assert!(!rl.try_admit(1, 0));
    }

    #[test]
    fn new_bucket_after_rotation_resets_symbol_count() {
        let rl = RateLimiter::new(5);
        for _ in 0..5 {
            assert!(rl.try_admit(1, 0));
        }
        assert!(!rl.try_admit(1, 0));
        assert!(rl.try_admit(1, 61 * SEC));
    }

    #[test]
    fn global_limit_applies_across_symbols() {
        let rl = RateLimiter::new(3);
        assert!(rl.try_admit(1, 0));
        assert!(rl.try_admit(2, 0));
        assert!(rl.try_admit(3, 0));
        assert!(!rl.try_admit(4, 0));
    }

    #[test]
    fn full_window_rollover_clears_all_buckets() {
        let rl = RateLimiter::new(5);
        for _ in 0..5 {
            assert!(rl.try_admit(1, 0));
        }
        assert!(rl.try_admit(1, 200 * SEC));
    }
}
