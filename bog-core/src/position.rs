//! Position store (component D): one [`Position`](crate::core::types::Position)
//! per symbol, owned exclusively by the OMS/risk thread, plus the
//! portfolio-level aggregates the risk engine reads on every VaR and
//! exposure check.
//!
//! Strategies and other readers never hold a `&mut` to a `Position`; they
//! get a cheap `Arc<Position>` clone from [`PositionStore::get_or_insert`]
//! and call [`crate::core::types::Position::snapshot`] for a torn-free read.

use crate::clock::HighWaterMark;
use crate::core::types::{Position, PositionSnapshot, Price};
use dashmap::DashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Portfolio-wide aggregates derived from the position store plus a mark
/// price per symbol. See §3 Data Model: `gross_exposure`, `net_exposure`,
/// `daily_pnl`, `hwm`, `drawdown`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PortfolioAggregates {
    pub gross_exposure: i64,
    pub net_exposure: i64,
    pub realized_pnl: i64,
    pub unrealized_pnl: i64,
    pub daily_pnl: i64,
    pub hwm: i64,
    /// `(hwm - value) / hwm`, zero when `hwm <= 0`.
    pub drawdown: f64,
}

/// Owns every symbol's [`Position`] plus the session high-water-mark used
/// for drawdown. Read by the risk engine inline in the order-submission
/// path, so lookups must stay allocation-free once a symbol's entry
/// exists (the `DashMap` insert only happens once, on first sight of a
/// new symbol).
pub struct PositionStore {
    positions: DashMap<u32, Arc<Position>>,
    hwm: HighWaterMark,
    session_realized_pnl: AtomicI64,
}

impl PositionStore {
    pub fn new() -> Self {
        Self {
            positions: DashMap::new(),
            hwm: HighWaterMark::new(0),
            session_realized_pnl: AtomicI64::new(0),
        }
    }

    /// Fetch the position for `symbol_id`, creating a zeroed one on first
    /// access. Returned handle is cheap to clone and safe to share with
    /// reader threads.
    pub fn get_or_insert(&self, symbol_id: u32) -> Arc<Position> {
        self.positions
            .entry(symbol_id)
            .or_insert_with(|| Arc::new(Position::new(symbol_id)))
            .clone()
    }

    pub fn get(&self, symbol_id: u32) -> Option<Arc<Position>> {
        self.positions.get(&symbol_id).map(|e| e.clone())
    }

    /// Restore a position from a persisted snapshot (hydration on startup).
    pub fn restore(&self, snap: &PositionSnapshot) {
        let pos = self.get_or_insert(snap.symbol_id);
        pos.restore(snap);
    }

    pub fn iter_snapshots(&self) -> Vec<PositionSnapshot> {
        self.positions.iter().map(|e| e.snapshot()).collect()
    }

    /// Recompute portfolio aggregates against a mark-price table. Callers
    /// mark every position to market first (e.g. from the latest book
    /// best-bid/ask midpoint) so `unrealized_pnl` is current.
    pub fn aggregates(&self, mark_price: impl Fn(u32) -> Option<Price>) -> PortfolioAggregates {
        let mut gross: i128 = 0;
        let mut net: i128 = 0;
        let mut realized: i64 = 0;
        let mut unrealized: i64 = 0;

        for entry in self.positions.iter() {
            let snap = entry.value().snapshot();
            let mark = mark_price(snap.symbol_id).unwrap_or(0) as i128;
            gross += (snap.net_qty as i128 * mark).abs();
            net += snap.net_qty as i128 * mark;
            realized += snap.realized_pnl;
            unrealized += snap.unrealized_pnl;
        }

        let daily_pnl = realized.saturating_add(unrealized);
        let portfolio_value = realized.saturating_add(unrealized);
        let hwm = self.hwm.raise(portfolio_value);
        let drawdown = if hwm > 0 {
            (hwm - portfolio_value) as f64 / hwm as f64
        } else {
            0.0
        };

        PortfolioAggregates {
            gross_exposure: gross.clamp(i64::MIN as i128, i64::MAX as i128) as i64,
            net_exposure: net.clamp(i64::MIN as i128, i64::MAX as i128) as i64,
            realized_pnl: realized,
            unrealized_pnl: unrealized,
            daily_pnl,
            hwm,
            drawdown: drawdown.max(0.0),
        }
    }

    pub fn symbol_count(&self) -> usize {
        self.positions.len()
    }

    /// Reset the session high-water-mark and realized-pnl counter; called
    /// by the supervisor at session rollover, never mid-session.
    pub fn reset_session(&self) {
        self.hwm.reset(0);
        self.session_realized_pnl.store(0, Ordering::Relaxed);
    }
}

impl Default for PositionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Side;

    #[test]
    fn get_or_insert_is_idempotent() {
        let store = PositionStore::new();
        let a = store.get_or_insert(1);
        let b = store.get_or_insert(1);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn aggregates_sum_across_symbols() {
        let store = PositionStore::new();
        let p1 = store.get_or_insert(1);
        p1.apply_fill(Side::Buy, 10, 100, 1);
        let p2 = store.get_or_insert(2);
        p2.apply_fill(Side::Sell, 5, 50, 1);

        let agg = store.aggregates(|sym| if sym == 1 { Some(100) } else { Some(50) });
        assert_eq!(agg.net_exposure, 10 * 100 + (-5 * 50));
        assert_eq!(agg.gross_exposure, 10 * 100 + 5 * 50);
    }

    #[test]
    fn drawdown_is_zero_at_new_high() {
        let store = PositionStore::new();
        let p = store.get_or_insert(1);
        p.apply_fill(Side::Buy, 10, 90, 1);
        p.apply_fill(Side::Sell, 10, 100, 2);
        let agg = store.aggregates(|_| Some(0));
        assert_eq!(agg.drawdown, 0.0);
    }

    #[test]
    fn restore_round_trips_through_snapshot() {
        let store = PositionStore::new();
        let p = store.get_or_insert(1);
        p.apply_fill(Side::Buy, 7, 42, 3);
        let snap = p.snapshot();

        let restored = PositionStore::new();
        restored.restore(&snap);
        assert_eq!(restored.get(1).unwrap().snapshot(), snap);
    }
}
