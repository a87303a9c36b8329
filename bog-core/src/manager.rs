//! Strategy manager (component G): capital allocation, per-strategy
//! limits, signal collection and scaling. Disabling a strategy is
//! one-way — the manager never automatically re-enables it once its
//! per-strategy limit trips (§4.4).

use crate::core::signal::Signal;
use crate::core::types::{Fill, Order};
use crate::strategy::indicators::RollingWindow;
use crate::strategy::{MarketDataEvent, Strategy, StrategyMetrics};
use std::collections::HashMap;

/// Trailing sample count below which a strategy's trailing Sharpe-like
/// ratio is considered unreliable and `rebalance` leaves its allocation
/// untouched rather than chasing a noisy estimate.
const MIN_REBALANCE_SAMPLES: usize = 5;

/// Window of recent per-trade realized PnL samples feeding the
/// rebalancing ratio.
const TRADE_PNL_LOOKBACK: usize = 50;

/// Per-strategy capital allocation and limits, mirroring the teacher's
/// allocation table but with the fixed fields §4.4 enumerates.
#[derive(Debug, Clone, Copy)]
pub struct Allocation {
    pub capital: u64,
    pub max_drawdown: f64,
    pub daily_loss_limit: i64,
    pub enabled: bool,
}

impl Allocation {
    pub fn new(capital: u64, max_drawdown: f64, daily_loss_limit: i64) -> Self {
        Self { capital, max_drawdown, daily_loss_limit, enabled: true }
    }
}

struct Entry {
    strategy: Strategy,
    allocation: Allocation,
    realized_pnl_today: i64,
    peak_capital: u64,
    trade_pnl: RollingWindow,
}

/// Why a strategy was disabled, recorded for the supervisor notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisableReason {
    DrawdownBreach,
    DailyLossBreach,
    OperatorCommand,
}

/// A disable event the manager surfaces for the supervisor to log/alert
/// on; never auto-cleared.
#[derive(Debug, Clone, Copy)]
pub struct DisableNotice {
    pub strategy_id: u32,
    pub reason: DisableReason,
}

pub struct StrategyManager {
    strategies: HashMap<u32, Entry>,
    rebalance_interval_ns: u64,
    last_rebalance_tsc: u64,
    total_capital_cap: u64,
    pending_disables: Vec<DisableNotice>,
}

impl StrategyManager {
    pub fn new(total_capital_cap: u64, rebalance_interval_ns: u64) -> Self {
        Self {
            strategies: HashMap::new(),
            rebalance_interval_ns,
            last_rebalance_tsc: 0,
            total_capital_cap,
            pending_disables: Vec::new(),
        }
    }

    pub fn add_strategy(&mut self, strategy_id: u32, strategy: Strategy, allocation: Allocation) {
        self.strategies.insert(
            strategy_id,
            Entry {
                strategy,
                allocation,
                realized_pnl_today: 0,
                peak_capital: allocation.capital,
                trade_pnl: RollingWindow::new(TRADE_PNL_LOOKBACK),
            },
        );
    }

    pub fn is_enabled(&self, strategy_id: u32) -> bool {
        self.strategies.get(&strategy_id).map(|e| e.allocation.enabled).unwrap_or(false)
    }

    pub fn disable(&mut self, strategy_id: u32, reason: DisableReason) {
        if let Some(entry) = self.strategies.get_mut(&strategy_id) {
            if entry.allocation.enabled {
                entry.allocation.enabled = false;
                self.pending_disables.push(DisableNotice { strategy_id, reason });
            }
        }
    }

    pub fn drain_disable_notices(&mut self) -> Vec<DisableNotice> {
        std::mem::take(&mut self.pending_disables)
    }

    pub fn on_market_data(&mut self, event: &MarketDataEvent) {
        for entry in self.strategies.values_mut() {
            if entry.allocation.enabled {
                entry.strategy.on_market_data(event);
            }
        }
    }

    pub fn on_order_fill(&mut self, strategy_id: u32, order: &Order, fill: &Fill) {
        if let Some(entry) = self.strategies.get_mut(&strategy_id) {
            entry.strategy.on_order_fill(order, fill);
            let pnl_delta = match order.side {
                crate::core::types::Side::Buy => -(fill.price as i64 * fill.quantity as i64),
                crate::core::types::Side::Sell => fill.price as i64 * fill.quantity as i64,
            };
            entry.realized_pnl_today += pnl_delta;
            entry.trade_pnl.push(pnl_delta as f64);
        }
    }

    pub fn on_tick(&mut self, now_tsc: u64) {
        for entry in self.strategies.values_mut() {
            if entry.allocation.enabled {
                entry.strategy.on_tick(now_tsc);
            }
        }
        if self.rebalance_interval_ns > 0
            && now_tsc.saturating_sub(self.last_rebalance_tsc) >= self.rebalance_interval_ns
        {
            self.rebalance();
            self.last_rebalance_tsc = now_tsc;
        }
    }

    /// Checks every enabled strategy's per-strategy limits and disables it
    /// on breach. Called by the supervisor after `on_tick` with freshly
    /// marked-to-market capital figures.
    pub fn evaluate_limits(&mut self, current_capital: impl Fn(u32) -> u64) {
        let ids: Vec<u32> = self.strategies.keys().copied().collect();
        for id in ids {
            let (drawdown, daily_loss, enabled) = {
                let entry = self.strategies.get_mut(&id).unwrap();
                let capital_now = current_capital(id);
                entry.peak_capital = entry.peak_capital.max(capital_now);
                let drawdown = if entry.peak_capital > 0 {
                    (entry.peak_capital - capital_now) as f64 / entry.peak_capital as f64
                } else {
                    0.0
                };
                (drawdown, entry.realized_pnl_today, entry.allocation.enabled)
            };
            if !enabled {
                continue;
            }
            let limit = self.strategies[&id].allocation.max_drawdown;
            let loss_limit = self.strategies[&id].allocation.daily_loss_limit;
            if drawdown > limit {
                self.disable(id, DisableReason::DrawdownBreach);
            } else if daily_loss < 0 && daily_loss.unsigned_abs() as i64 > loss_limit {
                self.disable(id, DisableReason::DailyLossBreach);
            }
        }
    }

    /// Collect signals from every enabled strategy, scale each by its
    /// strategy's capital share of the total cap, and return them ready
    /// for risk+OMS.
    pub fn drain_scaled_signals(&mut self) -> Vec<Signal> {
        let mut scaled = Vec::new();
        for entry in self.strategies.values_mut() {
            if !entry.allocation.enabled {
                entry.strategy.drain_signals();
                continue;
            }
            let share = if self.total_capital_cap > 0 {
                entry.allocation.capital as f64 / self.total_capital_cap as f64
            } else {
                0.0
            };
            for mut signal in entry.strategy.drain_signals() {
                let scaled_qty = (signal.suggested_qty as f64 * share).round() as u64;
                signal.suggested_qty = scaled_qty.max(1);
                scaled.push(signal);
            }
        }
        scaled
    }

    pub fn metrics(&self, strategy_id: u32) -> Option<StrategyMetrics> {
        self.strategies.get(&strategy_id).map(|e| e.strategy.metrics())
    }

    /// Reweight allocations by each strategy's trailing Sharpe-like ratio
    /// (mean per-trade realized PnL over its sample standard deviation),
    /// never exceeding `total_capital_cap` in aggregate. Strategies below
    /// `MIN_REBALANCE_SAMPLES` trades keep their prior allocation since a
    /// ratio computed over too few samples is noise, not signal.
    fn rebalance(&mut self) {
        let ratios: HashMap<u32, f64> = self
            .strategies
            .iter()
            .filter(|(_, e)| e.allocation.enabled && e.trade_pnl.len() >= MIN_REBALANCE_SAMPLES)
            .map(|(&id, e)| {
                let mean = e.trade_pnl.mean();
                let std_dev = e.trade_pnl.std_dev();
                let ratio = if std_dev > 0.0 { mean / std_dev } else { 0.0 };
                (id, ratio.max(0.0))
            })
            .collect();

        let total: f64 = ratios.values().sum();
        if total <= 0.0 {
            return;
        }
        for (id, ratio) in &ratios {
            let entry = self.strategies.get_mut(id).unwrap();
            let share = ratio / total;
            let target = (self.total_capital_cap as f64 * share) as u64;
            entry.allocation.capital = target.min(self.total_capital_cap);
        }
    }

    pub fn reset_daily(&mut self) {
        for entry in self.strategies.values_mut() {
            entry.realized_pnl_today = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{OrderId, OrderState, OrderType, Side, Tif};
    use crate::strategy::{ScalpingParams, ScalpingStrategy};

    fn manager() -> StrategyManager {
        StrategyManager::new(1_000_000, 0)
    }

    fn sell_fill(strategy_id: u32, price: u64) -> (Order, Fill) {
        let order = Order {
            order_id: OrderId::default(),
            symbol_id: 1,
            side: Side::Sell,
            state: OrderState::Pending,
            order_type: OrderType::Limit,
            tif: Tif::GTC,
            price,
            quantity: 1,
            filled_qty: 1,
            created_tsc: 0,
            last_update_tsc: 0,
            strategy_id,
            venue_id: 0,
            client_order_id: 0,
        };
        let fill = Fill { order_id: order.order_id, price, quantity: 1, venue_id: 0, tsc: 0 };
        (order, fill)
    }

    #[test]
    fn disabling_is_one_way() {
        let mut mgr = manager();
        mgr.add_strategy(1, Strategy::Scalping(ScalpingStrategy::new(1, 1, ScalpingParams::default())), Allocation::new(100_000, 0.1, 1_000));
        mgr.disable(1, DisableReason::DrawdownBreach);
        assert!(!mgr.is_enabled(1));
        // Re-enabling is simply not exposed: no method sets enabled back to true.
        assert_eq!(mgr.drain_disable_notices().len(), 1);
    }

    #[test]
    fn evaluate_limits_disables_on_drawdown_breach() {
        let mut mgr = manager();
        mgr.add_strategy(1, Strategy::Scalping(ScalpingStrategy::new(1, 1, ScalpingParams::default())), Allocation::new(100_000, 0.1, 1_000));
        mgr.evaluate_limits(|_| 80_000);
        assert!(!mgr.is_enabled(1));
    }

    #[test]
    fn scaled_signals_respect_capital_share() {
        let mut mgr = StrategyManager::new(200_000, 0);
        mgr.add_strategy(
            1,
            Strategy::Scalping(ScalpingStrategy::new(1, 1, ScalpingParams { momentum_lookback: 1, ..ScalpingParams::default() })),
            Allocation::new(100_000, 0.5, 10_000),
        );
        let mut book = crate::book::snapshot::BookSnapshot::empty(1);
        book.best_bid = Some(1000);
        book.best_ask = Some(1002);
        let event = MarketDataEvent { symbol_id: 1, book, trade_price: Some(1000), trade_qty: Some(10_000), timestamp_tsc: 0 };
        mgr.on_market_data(&event);
        let mut book2 = crate::book::snapshot::BookSnapshot::empty(1);
        book2.best_bid = Some(1100);
        book2.best_ask = Some(1102);
        let event2 = MarketDataEvent { symbol_id: 1, book: book2, trade_price: Some(1100), trade_qty: Some(10_000), timestamp_tsc: 1 };
        mgr.on_market_data(&event2);
        let signals = mgr.drain_scaled_signals();
        for s in &signals {
            assert!(s.suggested_qty <= 100);
        }
    }

    #[test]
    fn rebalance_leaves_allocation_untouched_below_min_samples() {
        let mut mgr = manager();
        mgr.add_strategy(1, Strategy::Scalping(ScalpingStrategy::new(1, 1, ScalpingParams::default())), Allocation::new(50_000, 0.5, 10_000));
        for price in [100, 101] {
            let (order, fill) = sell_fill(1, price);
            mgr.on_order_fill(1, &order, &fill);
        }
        mgr.rebalance();
        assert_eq!(mgr.strategies[&1].allocation.capital, 50_000);
    }

    #[test]
    fn rebalance_favors_the_steadier_trade_pnl_stream() {
        let mut mgr = StrategyManager::new(200_000, 0);
        mgr.add_strategy(1, Strategy::Scalping(ScalpingStrategy::new(1, 1, ScalpingParams::default())), Allocation::new(50_000, 0.5, 10_000));
        mgr.add_strategy(2, Strategy::Scalping(ScalpingStrategy::new(2, 1, ScalpingParams::default())), Allocation::new(50_000, 0.5, 10_000));

        // Strategy 1: mean ~100, low variance per trade.
        for price in [100, 101, 99, 101, 99, 100] {
            let (order, fill) = sell_fill(1, price);
            mgr.on_order_fill(1, &order, &fill);
        }
        // Strategy 2: same mean, much higher variance per trade.
        for price in [50, 150, 30, 170, 10, 190] {
            let (order, fill) = sell_fill(2, price);
            mgr.on_order_fill(2, &order, &fill);
        }

        mgr.rebalance();
        let cap1 = mgr.strategies[&1].allocation.capital;
        let cap2 = mgr.strategies[&2].allocation.capital;
        assert!(cap1 > cap2, "lower-variance trade stream should earn the larger allocation");
        assert!(cap1 + cap2 <= 200_000);
    }
}
