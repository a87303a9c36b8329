//! Mean-reversion strategy: z-score away from a rolling (or Kalman-
//! filtered) mean. Enters when `|z| > entry_thresh`, exits when
//! `|z| < exit_thresh` or when `|z|` deepens against the trade by a
//! configured amount. An optional pair-spread variant trades the spread
//! between two correlated symbols instead of an absolute price.

use super::indicators::{KalmanMean, RollingCorrelation, RollingWindow};
use super::{MarketDataEvent, StrategyBehavior, StrategyMetrics};
use crate::core::signal::{Signal, SignalKind};
use crate::core::types::{fixed_point, Fill, Order, Price, Quantity};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct MeanReversionParams {
    pub lookback: usize,
    pub zscore_entry_threshold: f64,
    pub zscore_exit_threshold: f64,
    pub zscore_stop_deepening: f64,
    pub use_kalman_filter: bool,
    pub kalman_process_noise: f64,
    pub kalman_observation_noise: f64,
    pub min_volatility: f64,
    pub max_volatility: f64,
    pub order_qty: Quantity,
    /// `Some(pair_symbol_id)` enables the pair-spread variant: the mean
    /// and z-score are computed on `price(symbol) - price(pair)` instead
    /// of the outright price.
    pub pair_symbol_id: Option<u32>,
    /// Pair-spread variant only: minimum absolute rolling Pearson
    /// correlation between the two legs required to open a new entry.
    /// Below this the spread is judged to have decoupled and new entries
    /// are suppressed, though open trades still manage their exits.
    pub min_correlation: f64,
}

impl Default for MeanReversionParams {
    fn default() -> Self {
        Self {
            lookback: 20,
            zscore_entry_threshold: 2.0,
            zscore_exit_threshold: 0.5,
            zscore_stop_deepening: 1.0,
            use_kalman_filter: true,
            kalman_process_noise: 0.01,
            kalman_observation_noise: 1.0,
            min_volatility: 0.0005,
            max_volatility: 0.02,
            order_qty: 100,
            pair_symbol_id: None,
            min_correlation: 0.6,
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
    entry_zscore: f64,
}

struct SymbolState {
    window: RollingWindow,
    kalman: KalmanMean,
    last_pair_price: Option<f64>,
    /// `Some` only for the pair-spread variant: tracks the rolling
    /// correlation between the two legs' outright prices.
    correlation: Option<RollingCorrelation>,
    open_trade: Option<OpenTrade>,
}

impl SymbolState {
    fn new(params: &MeanReversionParams) -> Self {
        Self {
            window: RollingWindow::new(params.lookback),
            kalman: KalmanMean::new(params.kalman_process_noise, params.kalman_observation_noise),
            last_pair_price: None,
            correlation: params.pair_symbol_id.map(|_| RollingCorrelation::new(params.lookback)),
            open_trade: None,
        }
    }
}

pub struct MeanReversionStrategy {
    strategy_id: u32,
    #[allow(dead_code)]
    symbol_id: u32,
    params: MeanReversionParams,
    symbols: HashMap<u32, SymbolState>,
    pending: Vec<Signal>,
    metrics: StrategyMetrics,
}

impl MeanReversionStrategy {
    pub fn new(strategy_id: u32, symbol_id: u32, params: MeanReversionParams) -> Self {
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

impl StrategyBehavior for MeanReversionStrategy {
    fn on_market_data(&mut self, event: &MarketDataEvent) {
        let Some(mid) = event.book.mid_price() else { return };
        let params = self.params;
        let symbol_id = event.symbol_id;
        let now_tsc = event.timestamp_tsc;

        // Pair-spread variant only updates on the primary symbol's events;
        // the pair price is assumed fed in via a separate event stream the
        // manager routes with the pair's `symbol_id` tagged on.
        if let Some(pair_id) = params.pair_symbol_id {
            if pair_id == symbol_id {
                let state = self.symbols.entry(self.symbol_id).or_insert_with(|| SymbolState::new(&params));
                state.last_pair_price = Some(mid as f64);
                return;
            }
        }

        let state = self.symbols.entry(symbol_id).or_insert_with(|| SymbolState::new(&params));

        let value = if params.pair_symbol_id.is_some() {
            match state.last_pair_price {
                Some(pair_price) => {
                    if let Some(corr) = state.correlation.as_mut() {
                        corr.push(mid as f64, pair_price);
                    }
                    mid as f64 - pair_price
                }
                None => return,
            }
        } else {
            mid as f64
        };

        state.window.push(value);
        if !state.window.is_full() {
            return;
        }

        let mean = if params.use_kalman_filter {
            state.kalman.update(value)
        } else {
            state.window.mean()
        };
        let std_dev = state.window.std_dev();
        if std_dev < params.min_volatility {
            return;
        }
        let zscore = (value - mean) / std_dev;

        if let Some(trade) = &state.open_trade {
            let reverted = zscore.abs() < params.zscore_exit_threshold;
            let deepened = match trade.direction {
                Direction::Short => zscore - trade.entry_zscore > params.zscore_stop_deepening,
                Direction::Long => trade.entry_zscore - zscore > params.zscore_stop_deepening,
            };
            if reverted || deepened {
                let side_sign = match trade.direction {
                    Direction::Long => -1,
                    Direction::Short => 1,
                };
                let won = match trade.direction {
                    Direction::Long => mid > trade.entry_price,
                    Direction::Short => mid < trade.entry_price,
                };
                state.open_trade = None;
                self.emit(symbol_id, now_tsc, SignalKind::Exit, side_sign, params.order_qty, mid);
                if won {
                    self.metrics.winning_trades += 1;
                } else {
                    self.metrics.losing_trades += 1;
                }
            }
            return;
        }

        if zscore.abs() <= params.zscore_entry_threshold {
            return;
        }
        // Pair-spread variant: a decoupled pair (correlation below the
        // floor) makes the spread's reversion untrustworthy, so new
        // entries are withheld even though the raw z-score would trade.
        if let Some(corr) = &state.correlation {
            if corr.is_full() {
                if let Some(r) = corr.correlation() {
                    if r.abs() < params.min_correlation {
                        return;
                    }
                }
            }
        }
        // Price is high relative to the mean -> expect reversion down -> short.
        let direction = if zscore > 0.0 { Direction::Short } else { Direction::Long };
        state.open_trade = Some(OpenTrade { direction, entry_price: mid, entry_zscore: zscore });
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
