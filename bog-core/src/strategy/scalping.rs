//! Scalping strategy: enter on a short-window momentum burst confirmed by
//! a volume surge, exit at a fixed tick target, a fixed tick stop, or a
//! hold-time timeout. One position at a time per symbol.

use super::indicators::RollingWindow;
use super::{MarketDataEvent, StrategyBehavior, StrategyMetrics};
use crate::core::signal::{Signal, SignalKind};
use crate::core::types::{fixed_point, Fill, Order, Price, Quantity};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct ScalpingParams {
    pub profit_target_ticks: u64,
    pub stop_loss_ticks: u64,
    pub momentum_threshold_bps: u32,
    pub momentum_lookback: usize,
    pub volume_surge_multiplier: f64,
    pub max_hold_time_ns: u64,
    pub order_qty: Quantity,
}

impl Default for ScalpingParams {
    fn default() -> Self {
        Self {
            profit_target_ticks: 2,
            stop_loss_ticks: 3,
            momentum_threshold_bps: 2,
            momentum_lookback: 20,
            volume_surge_multiplier: 2.0,
            max_hold_time_ns: 30_000_000_000,
            order_qty: 100,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Long,
    Short,
}

struct OpenTrade {
    direction: Direction,
    entry_price: Price,
    entry_tsc: u64,
    target_price: Price,
    stop_price: Price,
}

#[derive(Default)]
struct SymbolState {
    mid_history: Option<RollingWindow>,
    volume_history: Option<RollingWindow>,
    open_trade: Option<OpenTrade>,
}

pub struct ScalpingStrategy {
    strategy_id: u32,
    #[allow(dead_code)]
    symbol_id: u32,
    params: ScalpingParams,
    symbols: HashMap<u32, SymbolState>,
    pending: Vec<Signal>,
    metrics: StrategyMetrics,
}

impl ScalpingStrategy {
    pub fn new(strategy_id: u32, symbol_id: u32, params: ScalpingParams) -> Self {
        Self {
            strategy_id,
            symbol_id,
            params,
            symbols: HashMap::new(),
            pending: Vec::new(),
            metrics: StrategyMetrics::default(),
        }
    }

    fn state_for(&mut self, symbol_id: u32) -> &mut SymbolState {
        self.symbols.entry(symbol_id).or_insert_with(|| SymbolState {
            mid_history: Some(RollingWindow::new(self.params.momentum_lookback)),
            volume_history: Some(RollingWindow::new(self.params.momentum_lookback)),
            open_trade: None,
        })
    }

    fn emit(&mut self, symbol_id: u32, now_tsc: u64, kind: SignalKind, side_sign: i64, qty: Quantity, price: Price) {
        let strength = fixed_point::from_f64(side_sign as f64);
        self.pending.push(Signal::new(
            now_tsc,
            symbol_id,
            self.strategy_id,
            kind,
            0,
            strength,
            fixed_point::from_f64(1.0),
            qty,
            price,
        ));
        self.metrics.signals_generated += 1;
    }
}

impl StrategyBehavior for ScalpingStrategy {
    fn on_market_data(&mut self, event: &MarketDataEvent) {
        let Some(mid) = event.book.mid_price() else { return };
        let params = self.params;
        let symbol_id = event.symbol_id;
        let now_tsc = event.timestamp_tsc;
        let volume = event.trade_qty.unwrap_or(0) as f64;

        let state = self.state_for(symbol_id);
        if let Some(trade) = &state.open_trade {
            let hit_target = match trade.direction {
                Direction::Long => mid >= trade.target_price,
                Direction::Short => mid <= trade.target_price,
            };
            let hit_stop = match trade.direction {
                Direction::Long => mid <= trade.stop_price,
                Direction::Short => mid >= trade.stop_price,
            };
            let timed_out = now_tsc.saturating_sub(trade.entry_tsc) > params.max_hold_time_ns;

            if hit_target || hit_stop || timed_out {
                let side_sign = match trade.direction {
                    Direction::Long => -1,
                    Direction::Short => 1,
                };
                let entry_price = trade.entry_price;
                let direction = trade.direction;
                state.open_trade = None;
                self.emit(symbol_id, now_tsc, SignalKind::Exit, side_sign, params.order_qty, mid);
                let won = match direction {
                    Direction::Long => mid > entry_price,
                    Direction::Short => mid < entry_price,
                };
                if won {
                    self.metrics.winning_trades += 1;
                } else {
                    self.metrics.losing_trades += 1;
                }
                return;
            }
            return;
        }

        let mid_history = state.mid_history.get_or_insert_with(|| RollingWindow::new(params.momentum_lookback));
        mid_history.push(mid as f64);
        let volume_history = state.volume_history.get_or_insert_with(|| RollingWindow::new(params.momentum_lookback));
        volume_history.push(volume);

        if !mid_history.is_full() {
            return;
        }

        let Some(first) = mid_history.first() else { return };
        let momentum_bps = ((mid as f64 - first) / first.max(1.0)) * 10_000.0;
        let volume_surge = volume > volume_history.mean() * params.volume_surge_multiplier;

        if momentum_bps.abs() < params.momentum_threshold_bps as f64 || !volume_surge {
            return;
        }

        let direction = if momentum_bps > 0.0 { Direction::Long } else { Direction::Short };
        let (target_price, stop_price) = match direction {
            Direction::Long => (mid + params.profit_target_ticks, mid.saturating_sub(params.stop_loss_ticks)),
            Direction::Short => (mid.saturating_sub(params.profit_target_ticks), mid + params.stop_loss_ticks),
        };
        state.open_trade = Some(OpenTrade { direction, entry_price: mid, entry_tsc: now_tsc, target_price, stop_price });

        let side_sign = if direction == Direction::Long { 1 } else { -1 };
        self.emit(symbol_id, now_tsc, SignalKind::Entry, side_sign, params.order_qty, mid);
    }

    fn on_order_fill(&mut self, _order: &Order, _fill: &Fill) {
        self.metrics.fills_received += 1;
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

    fn event(symbol_id: u32, bid: Price, ask: Price, volume: u64, tsc: u64) -> MarketDataEvent {
        let mut book = BookSnapshot::empty(symbol_id);
        book.best_bid = Some(bid);
        book.best_ask = Some(ask);
        MarketDataEvent { symbol_id, book, trade_price: Some(bid), trade_qty: Some(volume), timestamp_tsc: tsc }
    }

    #[test]
    fn enters_long_on_momentum_and_volume_surge() {
        let params = ScalpingParams { momentum_lookback: 3, ..ScalpingParams::default() };
        let mut s = ScalpingStrategy::new(1, 1, params);
        s.on_market_data(&event(1, 1000, 1002, 10, 0));
        s.on_market_data(&event(1, 1000, 1002, 10, 1));
        s.on_market_data(&event(1, 1000, 1002, 10, 2));
        s.on_market_data(&event(1, 1100, 1102, 1000, 3));
        let signals = s.drain_signals();
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].kind, SignalKind::Entry);
    }

    #[test]
    fn exits_on_profit_target() {
        let params = ScalpingParams { momentum_lookback: 2, profit_target_ticks: 5, ..ScalpingParams::default() };
        let mut s = ScalpingStrategy::new(1, 1, params);
        s.on_market_data(&event(1, 1000, 1002, 10, 0));
        s.on_market_data(&event(1, 1000, 1002, 10, 1));
        s.on_market_data(&event(1, 1200, 1202, 1000, 2));
        s.drain_signals();
        s.on_market_data(&event(1, 1210, 1212, 10, 3));
        let signals = s.drain_signals();
        assert!(signals.iter().any(|sig| sig.kind == SignalKind::Exit));
    }
}
