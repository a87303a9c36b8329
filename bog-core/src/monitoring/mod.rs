//! Monitoring and observability.
//!
//! Prometheus metric families plus an HTTP scrape endpoint. This is the
//! concrete implementation behind [`crate::edges::MetricsSink`]; the core
//! itself only ever calls the narrow trait, never this registry directly,
//! so a deployment can swap in a different backend without touching the
//! hot path.

pub mod metrics;
pub mod server;

pub use metrics::{MetricsRegistry, PerformanceMetrics, RiskMetrics, SystemMetrics, TradingMetrics};
pub use server::{MetricsServer, MetricsServerConfig};
