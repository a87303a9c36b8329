//! Momentum strategy: fast/slow moving-average crossover confirmed by a
//! volume surge and VWAP proximity, with an ATR-based stop and a
//! trailing stop that ratchets on new highs/lows, plus a
//! momentum-exhaustion exit.

use super::indicators::{Atr, Ema, RollingWindow};
use super::{MarketDataEvent, StrategyBehavior, StrategyMetrics};
use crate::core::signal::{Signal, SignalKind};
use crate::core::types::{fixed_point, Fill, Order, Price, Quantity};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct MomentumParams {
    pub fast_ma_period: u32,
    pub slow_ma_period: u32,
    pub volume_confirmation_multiplier: f64,
    pub atr_period: usize,
    pub atr_multiplier: f64,
    pub max_vwap_distance_bps: u32,
    pub order_qty: Quantity,
}

impl Default for MomentumParams {
    fn default() -> Self {
        Self {
            fast_ma_period: 10,
            slow_ma_period: 30,
            volume_confirmation_multiplier: 1.5,
            atr_period: 14,
            atr_multiplier: 2.0,
            max_vwap_distance_bps: 200,
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
    stop_price: f64,
    high_water: f64,
    low_water: f64,
}

struct SymbolState {
    fast_ma: Ema,
    slow_ma: Ema,
    volume_history: RollingWindow,
    atr: Atr,
    vwap_numerator: f64,
    vwap_denominator: f64,
    prev_close: Option<f64>,
    prev_fast_above_slow: Option<bool>,
    open_trade: Option<OpenTrade>,
}

impl SymbolState {
    fn new(params: &MomentumParams) -> Self {
        Self {
            fast_ma: Ema::new(params.fast_ma_period),
            slow_ma: Ema::new(params.slow_ma_period),
            volume_history: RollingWindow::new(params.fast_ma_period as usize),
            atr: Atr::new(params.atr_period),
            vwap_numerator: 0.0,
            vwap_denominator: 0.0,
            prev_close: None,
            prev_fast_above_slow: None,
            open_trade: None,
        }
    }

    fn vwap(&self) -> Option<f64> {
        if self.vwap_denominator > 0.0 {
            Some(self.vwap_numerator / self.vwap_denominator)
        } else {
            None
        }
    }
}

pub struct MomentumStrategy {
    strategy_id: u32,
    #[allow(dead_code)]
    symbol_id: u32,
    params: MomentumParams,
    symbols: HashMap<u32, SymbolState>,
    pending: Vec<Signal>,
    metrics: StrategyMetrics,
}

impl MomentumStrategy {
    pub fn new(strategy_id: u32, symbol_id: u32, params: MomentumParams) -> Self {
        Self {
            strategy_id,
            symbol_id,
            params,
            symbols: HashMap::new(),
            pending: Vec::new(),
            metrics: StrategyMetrics::default(),
        }
    }

    fn emit(&mut self, symbol_id: u32, now_tsc: u64, kind: SignalKind, side_sign: i64, qty: Quantity, price: Price) {
        self.pending.push(Signal::new(
            now_tsc,
            symbol_id,
            self.strategy_id,
            kind,
            0,
            fixed_point::from_f64(side_sign as f64),
            fixed_point::from_f64(1.0),
            qty,
            price,
        ));
        self.metrics.signals_generated += 1;
    }
}

impl StrategyBehavior for MomentumStrategy {
    fn on_market_data(&mut self, event: &MarketDataEvent) {
        let Some(mid) = event.book.mid_price() else { return };
        let params = self.params;
        let symbol_id = event.symbol_id;
        let now_tsc = event.timestamp_tsc;
        let mid_f = mid as f64;
        let volume = event.trade_qty.unwrap_or(0) as f64;

        let state = self.symbols.entry(symbol_id).or_insert_with(|| SymbolState::new(&params));

        let fast = state.fast_ma.update(mid_f);
        let slow = state.slow_ma.update(mid_f);
        state.volume_history.push(volume);
        if let Some(prev_close) = state.prev_close {
            state.atr.update(mid_f, mid_f, prev_close);
        }
        state.prev_close = Some(mid_f);
        state.vwap_numerator += mid_f * volume;
        state.vwap_denominator += volume;

        if let Some(trade) = &mut state.open_trade {
            match trade.direction {
                Direction::Long => {
                    trade.high_water = trade.high_water.max(mid_f);
                    trade.stop_price = trade.stop_price.max(trade.high_water - params.atr_multiplier * state.atr.value());
                }
                Direction::Short => {
                    trade.low_water = trade.low_water.min(mid_f);
                    trade.stop_price = trade.stop_price.min(trade.low_water + params.atr_multiplier * state.atr.value());
                }
            }
            let stopped_out = match trade.direction {
                Direction::Long => mid_f <= trade.stop_price,
                Direction::Short => mid_f >= trade.stop_price,
            };
            let exhausted = match (state.prev_fast_above_slow, fast > slow) {
                (Some(true), false) if trade.direction == Direction::Long => true,
                (Some(false), true) if trade.direction == Direction::Short => true,
                _ => false,
            };
            if stopped_out || exhausted {
                let side_sign = match trade.direction {
                    Direction::Long => -1,
                    Direction::Short => 1,
                };
                let won = match trade.direction {
                    Direction::Long => mid > trade.entry_price,
                    Direction::Short => mid < trade.entry_price,
                };
                state.open_trade = None;
                state.prev_fast_above_slow = Some(fast > slow);
                self.emit(symbol_id, now_tsc, SignalKind::Exit, side_sign, params.order_qty, mid);
                if won {
                    self.metrics.winning_trades += 1;
                } else {
                    self.metrics.losing_trades += 1;
                }
                return;
            }
            state.prev_fast_above_slow = Some(fast > slow);
            return;
        }

        let crossed_up = matches!(state.prev_fast_above_slow, Some(false)) && fast > slow;
        let crossed_down = matches!(state.prev_fast_above_slow, Some(true)) && fast < slow;
        state.prev_fast_above_slow = Some(fast > slow);

        if !crossed_up && !crossed_down {
            return;
        }
        if volume < state.volume_history.mean() * params.volume_confirmation_multiplier {
            return;
        }
        if let Some(vwap) = state.vwap() {
            let dist_bps = ((mid_f - vwap).abs() / vwap.max(1.0)) * 10_000.0;
            if dist_bps > params.max_vwap_distance_bps as f64 {
                return;
            }
        }

        let direction = if crossed_up { Direction::Long } else { Direction::Short };
        let atr_value = state.atr.value().max(1.0);
        let stop_price = match direction {
            Direction::Long => mid_f - params.atr_multiplier * atr_value,
            Direction::Short => mid_f + params.atr_multiplier * atr_value,
        };
        state.open_trade = Some(OpenTrade {
            direction,
            entry_price: mid,
            stop_price,
            high_water: mid_f,
            low_water: mid_f,
        });
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
