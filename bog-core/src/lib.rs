//! Bog Core - ultra-low-latency trading core.
//!
//! A self-contained process that ingests market data, runs a fixed set of
//! strategies through a risk gate, and routes resulting orders to one or
//! more venues, targeting low-microsecond inter-component hand-off.
//!
//! ## Architecture
//! - **Zero heap allocations** on hot paths
//! - **Cache-line aligned** data structures (64 bytes) where they cross
//!   threads
//! - **Lock-free** atomic operations for shared state (kill switch,
//!   positions, rate limits)
//! - **Tagged-variant dispatch** for strategies, not `dyn Trait`, on the
//!   per-event path
//!
//! ## Core Modules
//! - [`core`]: zero-overhead types (`OrderId`, `Signal`, `Position`, `Order`)
//! - [`book`]: price-time-priority limit order book, one shard per symbol
//! - [`risk`]: kill switch, rate limiting, VaR, pre-trade checks
//! - [`strategy`]: tagged-variant strategy implementations
//! - [`manager`]: capital allocation and per-strategy limits across strategies
//! - [`oms`]: order lifecycle, execution reports, audit trail
//! - [`router`]: venue selection and parent/child fill aggregation
//! - [`edges`]: narrow traits at the process boundary (market data, venue,
//!   metrics, logging, audit)
//! - [`supervisor`]: dependency-ordered startup/shutdown, health probes,
//!   snapshot hydrate/persist
//! - [`config`]: process configuration, loaded from TOML
//! - [`snapshot`]: persisted-state file format

pub mod book;
pub mod clock;
pub mod config;
pub mod core;
pub mod edges;
pub mod manager;
pub mod monitoring;
pub mod oms;
pub mod perf;
pub mod position;
pub mod resilience;
pub mod ring;
pub mod risk;
pub mod router;
pub mod snapshot;
pub mod strategy;
pub mod supervisor;
pub mod utils;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use crate::core::{fixed_point, Order, OrderId, Position, PositionSnapshot, Side};
pub use crate::core::signal::{Signal, SignalKind};

pub use anyhow::{Error, Result};

/// Convenience re-exports for binaries wiring the full system together.
pub mod prelude {
    pub use crate::book::{Book, BookConfig};
    pub use crate::clock::Clock;
    pub use crate::config::Config;
    pub use crate::core::signal::{Signal, SignalKind};
    pub use crate::core::{fixed_point, Order, OrderId, Position, Side};
    pub use crate::manager::StrategyManager;
    pub use crate::oms::Oms;
    pub use crate::perf::{optimize_for_hft, pin_to_core};
    pub use crate::position::PositionStore;
    pub use crate::risk::RiskEngine;
    pub use crate::router::Router;
    pub use crate::supervisor::Supervisor;

    pub use crate::{Error, Result};
}
