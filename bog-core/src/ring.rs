//! Lock-free bounded queues used to move data between the pinned hot-path
//! threads (market data, risk/strategy, OMS) without ever blocking.
//!
//! Both queue flavors wrap [`crossbeam::queue::ArrayQueue`], the same
//! primitive already used by [`crate::perf::pools::ObjectPool`] and the
//! simulated venue's fill queue. A full queue never blocks the producer;
//! it returns [`QueueFull`] and the caller decides whether to drop, retry,
//! or escalate (the risk engine treats a full audit queue as a kill-switch
//! trigger, for instance).

use crossbeam::queue::ArrayQueue;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Returned when a push would overflow the queue's fixed capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("queue is full (capacity exceeded)")]
pub struct QueueFull;

/// A single-producer single-consumer bounded queue. Intended for exactly
/// one writer thread and one reader thread (e.g. market-data thread to
/// strategy thread); using it with multiple producers is safe but loses
/// the ordering guarantee SPSC callers usually rely on.
pub struct SpscQueue<T> {
    inner: Arc<ArrayQueue<T>>,
    dropped: AtomicU64,
}

impl<T> SpscQueue<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(ArrayQueue::new(capacity)),
            dropped: AtomicU64::new(0),
        }
    }

    #[inline(always)]
    pub fn push(&self, value: T) -> Result<(), QueueFull> {
        self.inner.push(value).map_err(|_| QueueFull)
    }

    /// Push, incrementing the drop counter instead of returning an error
    /// on overflow. For paths where the caller has decided dropping is an
    /// acceptable degradation (e.g. a metrics sample).
    #[inline(always)]
    pub fn push_or_drop(&self, value: T) {
        if self.inner.push(value).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline(always)]
    pub fn pop(&self) -> Option<T> {
        self.inner.pop()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// A multi-producer single-consumer bounded queue (e.g. several strategy
/// threads pushing signals, one OMS thread consuming them).
pub struct MpscQueue<T> {
    inner: Arc<ArrayQueue<T>>,
    dropped: AtomicU64,
}

impl<T> MpscQueue<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(ArrayQueue::new(capacity)),
            dropped: AtomicU64::new(0),
        }
    }

    #[inline(always)]
    pub fn push(&self, value: T) -> Result<(), QueueFull> {
        self.inner.push(value).map_err(|_| QueueFull)
    }

    #[inline(always)]
    pub fn push_or_drop(&self, value: T) {
        if self.inner.push(value).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline(always)]
    pub fn pop(&self) -> Option<T> {
        self.inner.pop()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl<T> Clone for MpscQueue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            dropped: AtomicU64::new(self.dropped.load(Ordering::Relaxed)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spsc_push_pop_round_trip() {
        let q: SpscQueue<u32> = SpscQueue::new(4);
        q.push(1).unwrap();
        q.push(2).unwrap();
        assert_eq!(q.pop(), Some(1));
        assert_eq!(q.pop(), Some(2));
        assert_eq!(q.pop(), None);
    }

    #[test]
    fn spsc_reports_queue_full() {
        let q: SpscQueue<u32> = SpscQueue::new(1);
        q.push(1).unwrap();
        assert_eq!(q.push(2), Err(QueueFull));
    }

    #[test]
    fn spsc_push_or_drop_increments_counter() {
        let q: SpscQueue<u32> = SpscQueue::new(1);
        q.push_or_drop(1);
        q.push_or_drop(2);
        q.push_or_drop(3);
        assert_eq!(q.dropped_count(), 2);
    }

    #[test]
    fn mpsc_multiple_producers() {
        let q: MpscQueue<u32> = MpscQueue::new(100);
        let mut handles = vec![];
        for i in 0..10 {
            let q = q.clone();
            handles.push(std::thread::spawn(move || {
                for j in 0..10 {
                    q.push_or_drop(i * 10 + j);
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(q.len(), 100);
    }
}
