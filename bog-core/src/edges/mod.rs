//! External edges (component K, §6): the narrow traits the core talks
//! through to reach market data, venues, metrics, logging, and the audit
//! backend. Wire-protocol parsers (ITCH, Pillar, MDP3) are out of scope;
//! the core only ever consumes [`MarketDataEvent`](crate::strategy::MarketDataEvent)s
//! produced behind [`PacketParser`].

pub mod simulated;

use crate::core::types::{OrderId, Price, Quantity, Side};
use crate::oms::ExecutionReport;
use crate::strategy::MarketDataEvent;

/// One raw packet off the wire, as delivered by [`MarketDataIngress`].
#[derive(Debug, Clone)]
pub struct Packet {
    pub hardware_ts: u64,
    pub symbol_id: u32,
    pub payload: Vec<u8>,
}

/// Pulls a burst of raw packets from the market-data transport. Implemented
/// per venue/feed; the core drives it in a tight loop on the ingress
/// worker.
pub trait MarketDataIngress: Send {
    /// Fill as much of `buf` as there is data available, returning the
    /// count filled. Never blocks past what's already arrived.
    fn recv_burst(&mut self, buf: &mut [Packet]) -> usize;
}

/// Maps a raw packet payload to a `MarketDataEvent`. Protocol-specific
/// implementations live outside the core.
pub trait PacketParser: Send {
    fn parse(&mut self, packet: &Packet) -> Option<MarketDataEvent>;
}

/// Outcome of submitting an order to a venue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Accepted { venue_order_id: u64 },
    Rejected { reason_code: u32 },
}

/// One order handed to a venue for submission.
#[derive(Debug, Clone, Copy)]
pub struct VenueOrder {
    pub order_id: OrderId,
    pub symbol_id: u32,
    pub side: Side,
    pub price: Price,
    pub quantity: Quantity,
}

/// Submits orders to a venue and polls for execution reports.
pub trait VenueEgress: Send {
    fn submit(&mut self, order: &VenueOrder) -> SubmitOutcome;
    fn poll_reports(&mut self, buf: &mut [ExecutionReport]) -> usize;
}

/// Tag set attached to a metric sample; kept as an owned vector of
/// key/value pairs rather than a generic map to stay allocation-light at
/// the call site (callers pass a small fixed array).
pub type Tags<'a> = &'a [(&'a str, &'a str)];

/// Non-blocking metrics sink. Implementations must drop samples under
/// pressure rather than block the caller, and report drops through their
/// own counter (§6).
pub trait MetricsSink: Send + Sync {
    fn record_counter(&self, name: &str, value: u64, tags: Tags);
    fn record_gauge(&self, name: &str, value: f64, tags: Tags);
    fn record_histogram(&self, name: &str, value_ns: u64, tags: Tags);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// Non-blocking structured logging sink.
pub trait LogSink: Send + Sync {
    fn log(&self, level: LogLevel, component: &str, message: &str);
}

/// Append-only, queryable audit backend. [`crate::oms::audit::AuditRing`]
/// is the in-process implementation; this trait lets a deployment swap in
/// a durable backend without touching OMS code.
pub trait AuditStore: Send + Sync {
    fn append(&self, order: crate::core::types::Order);
    fn by_id(&self, order_id: OrderId) -> Option<crate::core::types::Order>;
    fn in_range(&self, t0: u64, t1: u64) -> Vec<crate::core::types::Order>;
}

impl AuditStore for crate::oms::audit::AuditRing {
    fn append(&self, order: crate::core::types::Order) {
        self.push(order);
    }

    fn by_id(&self, order_id: OrderId) -> Option<crate::core::types::Order> {
        crate::oms::audit::AuditRing::by_id(self, order_id)
    }

    fn in_range(&self, t0: u64, t1: u64) -> Vec<crate::core::types::Order> {
        crate::oms::audit::AuditRing::in_range(self, t0, t1)
    }
}
