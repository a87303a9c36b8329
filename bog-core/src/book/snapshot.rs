//! Immutable, cheaply-clonable top-of-book/depth snapshot, published by the
//! book's writer thread through an atomic pointer swap so reader threads
//! (strategy shard workers) never block the writer and never observe a
//! torn level.

use crate::core::types::{Price, Quantity};

pub const MAX_DEPTH: usize = 10;

/// One level of the published depth array.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DepthLevel {
    pub price: Price,
    pub qty: Quantity,
}

/// A point-in-time view of one symbol's book, cheap to `Clone` and safe to
/// hand to reader threads via `arc_swap::ArcSwap<BookSnapshot>::load()`.
#[derive(Debug, Clone)]
pub struct BookSnapshot {
    pub symbol_id: u32,
    pub sequence: u64,
    pub best_bid: Option<Price>,
    pub best_ask: Option<Price>,
    pub bid_depth: [DepthLevel; MAX_DEPTH],
    pub ask_depth: [DepthLevel; MAX_DEPTH],
    pub bid_levels: usize,
    pub ask_levels: usize,
    pub last_update_tsc: u64,
}

impl BookSnapshot {
    pub fn empty(symbol_id: u32) -> Self {
        Self {
            symbol_id,
            sequence: 0,
            best_bid: None,
            best_ask: None,
            bid_depth: [DepthLevel::default(); MAX_DEPTH],
            ask_depth: [DepthLevel::default(); MAX_DEPTH],
            bid_levels: 0,
            ask_levels: 0,
            last_update_tsc: 0,
        }
    }

    pub fn mid_price(&self) -> Option<u64> {
        match (self.best_bid, self.best_ask) {
            (Some(b), Some(a)) => Some((b + a) / 2),
            _ => None,
        }
    }

    /// Spread in basis points; `0` if either side is empty.
    pub fn spread_bps(&self) -> u32 {
        crate::book::helpers::spread_bps_from_prices(
            self.best_bid.unwrap_or(0),
            self.best_ask.unwrap_or(0),
        )
    }

    pub fn is_crossed(&self) -> bool {
        matches!((self.best_bid, self.best_ask), (Some(b), Some(a)) if b >= a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_snapshot_has_no_mid_price() {
        let snap = BookSnapshot::empty(1);
        assert_eq!(snap.mid_price(), None);
        assert_eq!(snap.spread_bps(), 0);
    }

    #[test]
    fn mid_price_averages_best_bid_ask() {
        let mut snap = BookSnapshot::empty(1);
        snap.best_bid = Some(100);
        snap.best_ask = Some(200);
        assert_eq!(snap.mid_price(), Some(150));
    }

    #[test]
    fn crossed_detection() {
        let mut snap = BookSnapshot::empty(1);
        snap.best_bid = Some(200);
        snap.best_ask = Some(100);
        assert!(snap.is_crossed());
    }
}
