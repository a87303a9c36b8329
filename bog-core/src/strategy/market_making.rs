//! Market-making strategy: two-sided quotes around mid, skewed by current
//! inventory and sized inversely by inventory ratio and realized
//! volatility. Refreshes when the market moves by a tick or after a
//! refresh interval elapses; pulls quotes entirely when the adverse-
//! selection ratio (losing fills vs. total fills) exceeds a bound.

use super::indicators::RollingWindow;
use super::{MarketDataEvent, StrategyBehavior, StrategyMetrics};
use crate::core::signal::{Signal, SignalKind};
use crate::core::types::{fixed_point, Fill, Order, Price, Quantity, Side};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct MarketMakingParams {
    /// Target fraction of the spread to capture on each side.
    pub spread_capture_ratio: f64,
    /// Inventory as a fraction of `max_inventory` beyond which quoting
    /// skews aggressively toward flattening.
    pub max_inventory: i64,
    pub skew_adjustment: f64,
    pub volatility_adjustment: f64,
    pub min_quote_size: Quantity,
    pub max_quote_size: Quantity,
    pub refresh_interval_ns: u64,
    pub adverse_selection_threshold: f64,
    pub volatility_lookback: usize,
}

impl Default for MarketMakingParams {
    fn default() -> Self {
        Self {
            spread_capture_ratio: 0.5,
            max_inventory: 1_000,
            skew_adjustment: 0.1,
            volatility_adjustment: 0.05,
            min_quote_size: 100,
            max_quote_size: 1_000,
            refresh_interval_ns: 100_000_000,
            adverse_selection_threshold: 0.6,
            volatility_lookback: 30,
        }
    }
}

struct SymbolState {
    inventory: i64,
    last_quote_mid: Option<Price>,
    last_quote_tsc: u64,
    mid_history: RollingWindow,
    fills_total: u64,
    fills_adverse: u64,
    quoting: bool,
}

impl SymbolState {
    fn new(params: &MarketMakingParams) -> Self {
        Self {
            inventory: 0,
            last_quote_mid: None,
            last_quote_tsc: 0,
            mid_history: RollingWindow::new(params.volatility_lookback),
            fills_total: 0,
            fills_adverse: 0,
            quoting: true,
        }
    }

    fn adverse_selection_ratio(&self) -> f64 {
        if self.fills_total == 0 {
            0.0
        } else {
            self.fills_adverse as f64 / self.fills_total as f64
        }
    }
}

pub struct MarketMakingStrategy {
    strategy_id: u32,
    #[allow(dead_code)]
    symbol_id: u32,
    params: MarketMakingParams,
    symbols: HashMap<u32, SymbolState>,
    pending: Vec<Signal>,
    metrics: StrategyMetrics,
}

impl MarketMakingStrategy {
    pub fn new(strategy_id: u32, symbol_id: u32, params: MarketMakingParams) -> Self {
        Self {
            strategy_id,
            symbol_id,
            params,
            symbols: HashMap::new(),
            pending: Vec::new(),
            metrics: StrategyMetrics::default(),
        }
    }

    fn emit(&mut self, symbol_id: u32, now_tsc: u64, kind: SignalKind, side: Side, qty: Quantity, price: Price) {
        let strength = fixed_point::from_f64(side.sign() as f64);
        self.pending.push(Signal::new(now_tsc, symbol_id, self.strategy_id, kind, 0, strength, fixed_point::from_f64(1.0), qty, price));
        self.metrics.signals_generated += 1;
    }
}

impl StrategyBehavior for MarketMakingStrategy {
    fn on_market_data(&mut self, event: &MarketDataEvent) {
        let (Some(bid), Some(ask)) = (event.book.best_bid, event.book.best_ask) else { return };
        if ask <= bid {
            return;
        }
        let mid = bid / 2 + ask / 2;
        let spread = ask - bid;
        let params = self.params;
        let symbol_id = event.symbol_id;
        let now_tsc = event.timestamp_tsc;

        let state = self.symbols.entry(symbol_id).or_insert_with(|| SymbolState::new(&params));
        state.mid_history.push(mid as f64);

        if state.adverse_selection_ratio() > params.adverse_selection_threshold {
            // Pulling out of the market: on the transition (not every tick
            // while pulled) cancel resting inventory exposure rather than
            // just suppressing new quotes, since a held position still
            // bleeds while quoting is off.
            let was_quoting = state.quoting;
            let inventory = state.inventory;
            state.quoting = false;
            if was_quoting && inventory != 0 {
                let flatten_side = if inventory > 0 { Side::Sell } else { Side::Buy };
                let qty = inventory.unsigned_abs().clamp(params.min_quote_size, params.max_quote_size);
                self.emit(symbol_id, now_tsc, SignalKind::RiskReduce, flatten_side, qty, 0);
            }
            return;
        }
        state.quoting = true;

        let moved = state.last_quote_mid.map(|prev| prev != mid).unwrap_or(true);
        let interval_elapsed = now_tsc.saturating_sub(state.last_quote_tsc) >= params.refresh_interval_ns;
        if !moved && !interval_elapsed {
            return;
        }

        let inventory_ratio = (state.inventory as f64 / params.max_inventory.max(1) as f64).clamp(-1.0, 1.0);
        let volatility = state.mid_history.std_dev() / mid.max(1) as f64;
        let capture = (spread as f64 * params.spread_capture_ratio) as u64;
        let skew = (inventory_ratio * params.skew_adjustment * spread as f64) as i64;

        let bid_price = (mid as i64 - capture as i64 - skew).max(1) as u64;
        let ask_price = (mid as i64 + capture as i64 - skew).max(bid_price as i64 + 1) as u64;

        let size_scale = (1.0 - inventory_ratio.abs()) * (1.0 - (volatility * params.volatility_adjustment).min(1.0));
        let qty = ((params.max_quote_size as f64 * size_scale.max(0.0)) as u64).clamp(params.min_quote_size, params.max_quote_size);

        state.last_quote_mid = Some(mid);
        state.last_quote_tsc = now_tsc;

        // Skip the buy side entirely at max long inventory, sell side at
        // max short inventory.
        if inventory_ratio < 1.0 {
            self.emit(symbol_id, now_tsc, SignalKind::Entry, Side::Buy, qty, bid_price);
        }
        if inventory_ratio > -1.0 {
            self.emit(symbol_id, now_tsc, SignalKind::Entry, Side::Sell, qty, ask_price);
        }
    }

    fn on_order_fill(&mut self, order: &Order, fill: &Fill) {
        self.metrics.fills_received += 1;
        let state = self
            .symbols
            .entry(order.symbol_id)
            .or_insert_with(|| SymbolState::new(&self.params));
        state.fills_total += 1;
        match order.side {
            Side::Buy => state.inventory += fill.quantity as i64,
            Side::Sell => state.inventory -= fill.quantity as i64,
        }
        if let Some(last_mid) = state.last_quote_mid {
            let adverse = match order.side {
                Side::Buy => fill.price > last_mid,
                Side::Sell => fill.price < last_mid,
            };
            if adverse {
                state.fills_adverse += 1;
            }
        }
    }

    fn on_tick(&mut self, _now_tsc: u64) {}

    fn drain_signals(&mut self) -> Vec<Signal> {
        std::mem::take(&mut self.pending)
    }

    fn metrics(&self) -> StrategyMetrics {
        self.metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::snapshot::BookSnapshot;
    use crate::core::types::OrderId;

    fn event(symbol_id: u32, bid: Price, ask: Price, tsc: u64) -> MarketDataEvent {
        let mut book = BookSnapshot::empty(symbol_id);
        book.best_bid = Some(bid);
        book.best_ask = Some(ask);
        MarketDataEvent { symbol_id, book, trade_price: None, trade_qty: None, timestamp_tsc: tsc }
    }

    #[test]
    fn quotes_both_sides_at_flat_inventory() {
        let mut s = MarketMakingStrategy::new(1, 1, MarketMakingParams::default());
        s.on_market_data(&event(1, 10_000, 10_010, 0));
        let signals = s.drain_signals();
        assert_eq!(signals.len(), 2);
    }

    #[test]
    fn pulls_quotes_after_adverse_selection_breach() {
        let mut s = MarketMakingStrategy::new(1, 1, MarketMakingParams::default());
        s.on_market_data(&event(1, 10_000, 10_010, 0));
        s.drain_signals();

        let order = Order {
            order_id: OrderId::default(),
            symbol_id: 1,
            side: Side::Buy,
            state: crate::core::types::OrderState::Pending,
            order_type: crate::core::types::OrderType::Limit,
            tif: crate::core::types::Tif::GTC,
            price: 10_005,
            quantity: 100,
            filled_qty: 100,
            created_tsc: 0,
            last_update_tsc: 0,
            strategy_id: 1,
            venue_id: 0,
            client_order_id: 0,
        };
        let fill = Fill { order_id: order.order_id, price: 10_020, quantity: 100, venue_id: 0, tsc: 1 };
        for _ in 0..10 {
            s.on_order_fill(&order, &fill);
        }
        s.on_market_data(&event(1, 10_050, 10_060, 200_000_000));
        // The transition into the pulled state cancels resting inventory
        // exposure with a RiskReduce signal rather than emitting nothing.
        let signals = s.drain_signals();
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].kind, SignalKind::RiskReduce);
        assert!(signals[0].strength < 0, "long inventory flattens via a sell-side signal");

        // Subsequent ticks while still pulled emit nothing further.
        s.on_market_data(&event(1, 10_060, 10_070, 300_000_000));
        assert!(s.drain_signals().is_empty());
    }
}
