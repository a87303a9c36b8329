//! Monotonic timestamp source used everywhere a component needs "now" for
//! ordering or latency measurement.
//!
//! Hot-path code never calls `SystemTime::now()` (which can step backwards
//! under NTP correction); it reads [`Clock::now_tsc`], a monotonic
//! nanosecond counter calibrated once at startup against the wall clock so
//! persisted timestamps remain interpretable across a restart.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Startup-calibrated monotonic clock.
///
/// `now_tsc()` returns nanoseconds since `Instant::now()`'s reference
/// point, offset so it is comparable to wall-clock nanoseconds since the
/// Unix epoch. The offset is computed once; all subsequent reads are a
/// single `Instant::now()` plus an `i64` add, no syscalls.
pub struct Clock {
    started_at: Instant,
    epoch_offset_ns: i64,
}

impl Clock {
    /// Calibrate against the wall clock now.
    pub fn calibrate() -> Self {
        let started_at = Instant::now();
        let epoch_offset_ns = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as i64)
            .unwrap_or(0);
        Self {
            started_at,
            epoch_offset_ns,
        }
    }

    /// Nanoseconds since the Unix epoch, monotonic for the lifetime of this
    /// `Clock` (never steps backwards, unlike `SystemTime::now()`).
    #[inline(always)]
    pub fn now_ns(&self) -> u64 {
        let elapsed = self.started_at.elapsed().as_nanos() as i64;
        (self.epoch_offset_ns + elapsed) as u64
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::calibrate()
    }
}

/// Process-wide high-water-mark tracker built on a single atomic. Used by
/// the risk engine to record the daily peak of a monotone quantity
/// (e.g. realized PnL) without a lock: readers never block a concurrent
/// writer racing to raise the mark.
#[derive(Debug, Default)]
pub struct HighWaterMark {
    value: AtomicI64,
}

impl HighWaterMark {
    pub const fn new(initial: i64) -> Self {
        Self {
            value: AtomicI64::new(initial),
        }
    }

    /// Raise the mark if `candidate` exceeds the current value. Returns the
    /// mark after the call (the new value if raised, the prior value
    /// otherwise).
    #[inline(always)]
    pub fn raise(&self, candidate: i64) -> i64 {
        self.value.fetch_max(candidate, Ordering::AcqRel).max(candidate)
    }

    #[inline(always)]
    pub fn get(&self) -> i64 {
        self.value.load(Ordering::Acquire)
    }

    pub fn reset(&self, value: i64) {
        self.value.store(value, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn clock_is_monotonic() {
        let clock = Clock::calibrate();
        let a = clock.now_ns();
        let b = clock.now_ns();
        assert!(b >= a);
    }

    #[test]
    fn clock_tracks_wall_time_roughly() {
        let clock = Clock::calibrate();
        let wall = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos() as u64;
        let diff = wall.abs_diff(clock.now_ns());
        assert!(diff < 1_000_000_000, "clock diverged from wall time by {diff}ns");
    }

    #[test]
    fn high_water_mark_only_rises() {
        let hwm = HighWaterMark::new(0);
        assert_eq!(hwm.raise(10), 10);
        assert_eq!(hwm.raise(5), 10);
        assert_eq!(hwm.raise(20), 20);
        assert_eq!(hwm.get(), 20);
    }

    #[test]
    fn high_water_mark_concurrent_raises_converge_to_max() {
        let hwm = std::sync::Arc::new(HighWaterMark::new(0));
        let mut handles = vec![];
        for i in 1..=100 {
            let hwm = hwm.clone();
            handles.push(thread::spawn(move || {
                hwm.raise(i);
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(hwm.get(), 100);
    }
}
