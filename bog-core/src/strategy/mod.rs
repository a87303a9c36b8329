//! Strategy runtime (component F): per-strategy state machines that turn
//! market data and fills into [`Signal`](crate::core::signal::Signal)s.
//!
//! A strategy is a tagged variant of [`Strategy`], not a trait object —
//! the four implementations are known at compile time and dispatch
//! through a single `match`, avoiding vtable indirection on the
//! market-data hot path. Each variant keeps its own bounded indicator
//! history (see [`indicators`]) and never allocates once initialized.

pub mod indicators;
pub mod market_making;
pub mod mean_reversion;
pub mod momentum;
pub mod scalping;

use crate::book::snapshot::BookSnapshot;
use crate::core::signal::Signal;
use crate::core::types::{Fill, Order, Price, Quantity};

pub use market_making::{MarketMakingParams, MarketMakingStrategy};
pub use mean_reversion::{MeanReversionParams, MeanReversionStrategy};
pub use momentum::{MomentumParams, MomentumStrategy};
pub use scalping::{ScalpingParams, ScalpingStrategy};

/// One market-data update delivered to a strategy: the latest book
/// snapshot for the symbol plus an optional trade print.
#[derive(Debug, Clone)]
pub struct MarketDataEvent {
    pub symbol_id: u32,
    pub book: BookSnapshot,
    pub trade_price: Option<Price>,
    pub trade_qty: Option<Quantity>,
    pub timestamp_tsc: u64,
}

/// Read-only performance snapshot a strategy exposes to the manager and
/// the metrics sink.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StrategyMetrics {
    pub signals_generated: u64,
    pub fills_received: u64,
    pub winning_trades: u64,
    pub losing_trades: u64,
    pub realized_pnl_ticks: i64,
}

/// Whether a strategy is actively generating signals. Disabling is
/// one-way: the strategy manager never automatically re-enables a
/// strategy once its per-strategy limit trips (§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyState {
    Running,
    Paused,
    Disabled,
}

/// The capability set every strategy implementation provides (§4.3).
/// Implemented by each concrete strategy struct and dispatched through
/// the [`Strategy`] enum rather than used as a trait object.
pub(crate) trait StrategyBehavior {
    fn on_market_data(&mut self, event: &MarketDataEvent);
    fn on_order_fill(&mut self, order: &Order, fill: &Fill);
    fn on_tick(&mut self, now_tsc: u64);
    fn drain_signals(&mut self) -> Vec<Signal>;
    fn metrics(&self) -> StrategyMetrics;
}

/// A strategy instance, tagged by kind. Construct via the concrete
/// `*Strategy::new` constructors and wrap in this enum for the manager.
pub enum Strategy {
    Scalping(ScalpingStrategy),
    Momentum(MomentumStrategy),
    MeanReversion(MeanReversionStrategy),
    MarketMaking(MarketMakingStrategy),
}

impl Strategy {
    pub fn on_market_data(&mut self, event: &MarketDataEvent) {
        match self {
            Strategy::Scalping(s) => s.on_market_data(event),
            Strategy::Momentum(s) => s.on_market_data(event),
            Strategy::MeanReversion(s) => s.on_market_data(event),
            Strategy::MarketMaking(s) => s.on_market_data(event),
        }
    }

    pub fn on_order_fill(&mut self, order: &Order, fill: &Fill) {
        match self {
            Strategy::Scalping(s) => s.on_order_fill(order, fill),
            Strategy::Momentum(s) => s.on_order_fill(order, fill),
            Strategy::MeanReversion(s) => s.on_order_fill(order, fill),
            Strategy::MarketMaking(s) => s.on_order_fill(order, fill),
        }
    }

    pub fn on_tick(&mut self, now_tsc: u64) {
        match self {
            Strategy::Scalping(s) => s.on_tick(now_tsc),
            Strategy::Momentum(s) => s.on_tick(now_tsc),
            Strategy::MeanReversion(s) => s.on_tick(now_tsc),
            Strategy::MarketMaking(s) => s.on_tick(now_tsc),
        }
    }

    pub fn drain_signals(&mut self) -> Vec<Signal> {
        match self {
            Strategy::Scalping(s) => s.drain_signals(),
            Strategy::Momentum(s) => s.drain_signals(),
            Strategy::MeanReversion(s) => s.drain_signals(),
            Strategy::MarketMaking(s) => s.drain_signals(),
        }
    }

    pub fn metrics(&self) -> StrategyMetrics {
        match self {
            Strategy::Scalping(s) => s.metrics(),
            Strategy::Momentum(s) => s.metrics(),
            Strategy::MeanReversion(s) => s.metrics(),
            Strategy::MarketMaking(s) => s.metrics(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Strategy::Scalping(_) => "scalping",
            Strategy::Momentum(_) => "momentum",
            Strategy::MeanReversion(_) => "mean_reversion",
            Strategy::MarketMaking(_) => "market_making",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_enum_dispatches_to_scalping() {
        let strat = Strategy::Scalping(ScalpingStrategy::new(1, 1, ScalpingParams::default()));
        assert_eq!(strat.kind(), "scalping");
        assert_eq!(strat.metrics(), StrategyMetrics::default());
    }
}
