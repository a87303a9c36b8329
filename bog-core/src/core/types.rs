//! Zero-overhead core data types for the trading core.
//!
//! All types in this module are designed for:
//! - Zero heap allocations
//! - Copy semantics where possible
//! - Cache-line alignment on hot structs
//! - Minimal memory footprint

use std::fmt;
use std::sync::atomic::{AtomicI64, AtomicU32, AtomicU64, Ordering};

/// A price, in symbol-tick-scaled integer units. No floating point on the
/// order-book or risk hot paths.
pub type Price = u64;

/// A non-negative quantity, bounded by a per-symbol maximum.
pub type Quantity = u64;

/// Unique, monotonically assigned order identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
#[repr(transparent)]
pub struct OrderId(pub u64);

impl OrderId {
    #[inline(always)]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    #[inline(always)]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl From<u64> for OrderId {
    #[inline(always)]
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Monotonic order-id allocator. One instance is owned by the OMS; every
/// order is assigned the next value, never reused, never out of order.
///
/// Deliberately deterministic (no timestamp/random mixing): given the same
/// sequence of allocation calls, two runs produce the same ids, which is a
/// requirement for replaying a deterministic market-data stream in tests.
#[derive(Debug, Default)]
pub struct OrderIdAllocator {
    next: AtomicU64,
}

impl OrderIdAllocator {
    pub const fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Resume allocation after the given highest previously-issued id (used
    /// when hydrating from a snapshot so ids never collide with pre-restart
    /// orders).
    pub fn resume_after(&self, last_issued: u64) {
        self.next.fetch_max(last_issued.wrapping_add(1), Ordering::AcqRel);
    }

    #[inline(always)]
    pub fn next_id(&self) -> OrderId {
        OrderId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[repr(u8)]
pub enum Side {
    Buy = 0,
    Sell = 1,
}

impl Side {
    #[inline(always)]
    pub const fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    /// Sign applied to a quantity to obtain a signed position delta.
    #[inline(always)]
    pub const fn sign(self) -> i64 {
        match self {
            Side::Buy => 1,
            Side::Sell => -1,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// Order type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[repr(u8)]
pub enum OrderType {
    Market = 0,
    Limit = 1,
    Stop = 2,
    StopLimit = 3,
    Iceberg = 4,
}

/// Time in force.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[repr(u8)]
pub enum Tif {
    /// Immediate or cancel.
    IOC = 0,
    /// Fill or kill.
    FOK = 1,
    /// Good till cancel.
    GTC = 2,
    /// Day order.
    Day = 3,
    /// Good till date.
    GTD = 4,
}

/// Order lifecycle state, see the state diagram in the data model.
///
/// Terminal states: `Filled`, `Cancelled`, `Rejected`, `Expired`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[repr(u8)]
pub enum OrderState {
    Pending = 0,
    Submitted = 1,
    Acknowledged = 2,
    PartiallyFilled = 3,
    Filled = 4,
    Rejected = 5,
    Cancelled = 6,
    Expired = 7,
}

impl OrderState {
    #[inline(always)]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderState::Filled | OrderState::Cancelled | OrderState::Rejected | OrderState::Expired
        )
    }

    /// Whether a transition from `self` to `next` is allowed by the state
    /// diagram. Used to enumerate `OmsRejection::IllegalStateTransition`
    /// rather than silently accepting an out-of-order execution report.
    pub const fn can_transition_to(self, next: OrderState) -> bool {
        use OrderState::*;
        matches!(
            (self, next),
            (Pending, Submitted)
                | (Pending, Rejected)
                | (Submitted, Acknowledged)
                | (Submitted, Rejected)
                | (Acknowledged, PartiallyFilled)
                | (Acknowledged, Filled)
                | (Acknowledged, Cancelled)
                | (Acknowledged, Expired)
                | (PartiallyFilled, PartiallyFilled)
                | (PartiallyFilled, Filled)
                | (PartiallyFilled, Cancelled)
                | (PartiallyFilled, Expired)
        )
    }
}

/// An order tracked by the OMS. Cache-line aligned; the fields a hot-path
/// read touches most (state, quantities, timestamps) are declared first so
/// they land in the first 64 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct Order {
    pub order_id: OrderId,
    pub symbol_id: u32,
    pub side: Side,
    pub state: OrderState,
    pub order_type: OrderType,
    pub tif: Tif,
    pub price: Price,
    pub quantity: Quantity,
    pub filled_qty: Quantity,
    pub created_tsc: u64,
    pub last_update_tsc: u64,
    pub strategy_id: u32,
    pub venue_id: u16,
    pub client_order_id: u64,
}

impl Order {
    pub fn remaining_qty(&self) -> Quantity {
        self.quantity.saturating_sub(self.filled_qty)
    }

    pub fn is_filled(&self) -> bool {
        self.filled_qty >= self.quantity
    }

    /// Attempt the transition to `next`, advancing `last_update_tsc`.
    /// Returns the illegal-transition error rather than mutating on failure.
    pub fn transition(
        &mut self,
        next: OrderState,
        tsc: u64,
    ) -> Result<(), crate::core::errors::OmsRejection> {
        if !self.state.can_transition_to(next) {
            return Err(crate::core::errors::OmsRejection::IllegalStateTransition {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        self.last_update_tsc = tsc;
        Ok(())
    }
}

/// A single execution report against an order, as delivered by a venue
/// adapter. One `Order` can accumulate several of these (partial fills).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fill {
    pub order_id: OrderId,
    pub price: Price,
    pub quantity: Quantity,
    pub venue_id: u16,
    pub tsc: u64,
}

/// A price level in the order book: all resting quantity at one price.
/// Invariant: `total_qty = sum(quantity of orders at this level)`.
#[repr(C, align(64))]
#[derive(Debug, Clone, Copy)]
pub struct PriceLevel {
    pub price: Price,
    pub total_qty: Quantity,
    pub order_count: u32,
    pub first_order_idx: u32,
    pub last_update_tsc: u64,
    pub level_id: u64,
    _padding: [u8; 24],
}

impl PriceLevel {
    pub const fn new(price: Price, level_id: u64) -> Self {
        Self {
            price,
            total_qty: 0,
            order_count: 0,
            first_order_idx: u32::MAX,
            last_update_tsc: 0,
            level_id,
            _padding: [0; 24],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.order_count == 0
    }

    /// Build a snapshot aggregate from live level state (used when
    /// publishing a [`crate::book::snapshot::BookSnapshot`]).
    pub const fn with_aggregate(
        price: Price,
        total_qty: Quantity,
        order_count: u32,
        level_id: u64,
        last_update_tsc: u64,
    ) -> Self {
        Self {
            price,
            total_qty,
            order_count,
            first_order_idx: 0,
            last_update_tsc,
            level_id,
            _padding: [0; 24],
        }
    }
}

/// Cache-aligned per-symbol position, updated exclusively by the OMS/risk
/// thread. Uses a SeqLock (odd sequence = writer in progress) so reader
/// threads can take a torn-free multi-field snapshot without blocking the
/// writer.
#[repr(C, align(64))]
pub struct Position {
    pub symbol_id: u32,
    sequence: AtomicU64,
    net_qty: AtomicI64,
    long_qty: AtomicI64,
    short_qty: AtomicI64,
    avg_long_px: AtomicU64,
    avg_short_px: AtomicU64,
    unrealized_pnl: AtomicI64,
    realized_pnl: AtomicI64,
    last_update_tsc: AtomicU64,
}

/// A torn-free read of [`Position`] at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionSnapshot {
    pub symbol_id: u32,
    pub net_qty: i64,
    pub long_qty: i64,
    pub short_qty: i64,
    pub avg_long_px: u64,
    pub avg_short_px: u64,
    pub unrealized_pnl: i64,
    pub realized_pnl: i64,
    pub last_update_tsc: u64,
}

impl Position {
    pub fn new(symbol_id: u32) -> Self {
        Self {
            symbol_id,
            sequence: AtomicU64::new(0),
            net_qty: AtomicI64::new(0),
            long_qty: AtomicI64::new(0),
            short_qty: AtomicI64::new(0),
            avg_long_px: AtomicU64::new(0),
            avg_short_px: AtomicU64::new(0),
            unrealized_pnl: AtomicI64::new(0),
            realized_pnl: AtomicI64::new(0),
            last_update_tsc: AtomicU64::new(0),
        }
    }

    #[inline(always)]
    fn begin_write(&self) {
        self.sequence.fetch_add(1, Ordering::AcqRel);
    }

    #[inline(always)]
    fn end_write(&self) {
        self.sequence.fetch_add(1, Ordering::Release);
    }

    /// Apply a fill: recompute long/short quantities and average entry
    /// prices by the standard cost-basis formula, realizing PnL on the
    /// portion that closes existing exposure.
    pub fn apply_fill(&self, side: Side, qty: Quantity, price: Price, tsc: u64) {
        self.begin_write();

        let qty = qty as i64;
        let mut long_qty = self.long_qty.load(Ordering::Relaxed);
        let mut short_qty = self.short_qty.load(Ordering::Relaxed);
        let mut avg_long = self.avg_long_px.load(Ordering::Relaxed);
        let mut avg_short = self.avg_short_px.load(Ordering::Relaxed);
        let mut realized = self.realized_pnl.load(Ordering::Relaxed);

        match side {
            Side::Buy => {
                // Covers short exposure first, then opens/extends long.
                let covering = qty.min(short_qty);
                if covering > 0 {
                    realized += covering * (avg_short as i64 - price as i64);
                    short_qty -= covering;
                    if short_qty == 0 {
                        avg_short = 0;
                    }
                }
                let opening = qty - covering;
                if opening > 0 {
                    let new_long = long_qty + opening;
                    avg_long = ((avg_long as i128 * long_qty as i128
                        + price as i128 * opening as i128)
                        / new_long as i128) as u64;
                    long_qty = new_long;
                }
            }
            Side::Sell => {
                let covering = qty.min(long_qty);
                if covering > 0 {
                    realized += covering * (price as i64 - avg_long as i64);
                    long_qty -= covering;
                    if long_qty == 0 {
                        avg_long = 0;
                    }
                }
                let opening = qty - covering;
                if opening > 0 {
                    let new_short = short_qty + opening;
                    avg_short = ((avg_short as i128 * short_qty as i128
                        + price as i128 * opening as i128)
                        / new_short as i128) as u64;
                    short_qty = new_short;
                }
            }
        }

        self.long_qty.store(long_qty, Ordering::Relaxed);
        self.short_qty.store(short_qty, Ordering::Relaxed);
        self.avg_long_px.store(avg_long, Ordering::Relaxed);
        self.avg_short_px.store(avg_short, Ordering::Relaxed);
        self.net_qty.store(long_qty - short_qty, Ordering::Relaxed);
        self.realized_pnl.store(realized, Ordering::Relaxed);
        self.last_update_tsc.store(tsc, Ordering::Relaxed);

        self.end_write();
    }

    /// Recompute unrealized PnL against a mark price.
    pub fn mark_to_market(&self, mark_px: Price, tsc: u64) {
        self.begin_write();

        let long_qty = self.long_qty.load(Ordering::Relaxed);
        let short_qty = self.short_qty.load(Ordering::Relaxed);
        let avg_long = self.avg_long_px.load(Ordering::Relaxed) as i64;
        let avg_short = self.avg_short_px.load(Ordering::Relaxed) as i64;
        let mark = mark_px as i64;

        let unrealized = long_qty * (mark - avg_long) + short_qty * (avg_short - mark);
        self.unrealized_pnl.store(unrealized, Ordering::Relaxed);
        self.last_update_tsc.store(tsc, Ordering::Relaxed);

        self.end_write();
    }

    pub fn net_qty(&self) -> i64 {
        self.net_qty.load(Ordering::Relaxed)
    }

    pub fn realized_pnl(&self) -> i64 {
        self.realized_pnl.load(Ordering::Relaxed)
    }

    pub fn unrealized_pnl(&self) -> i64 {
        self.unrealized_pnl.load(Ordering::Relaxed)
    }

    /// Double-read with sequence check: spins until it observes a stable
    /// (even, matching) sequence number before and after the read.
    pub fn snapshot(&self) -> PositionSnapshot {
        loop {
            let before = self.sequence.load(Ordering::Acquire);
            if before & 1 != 0 {
                std::hint::spin_loop();
                continue;
            }

            let snap = PositionSnapshot {
                symbol_id: self.symbol_id,
                net_qty: self.net_qty.load(Ordering::Relaxed),
                long_qty: self.long_qty.load(Ordering::Relaxed),
                short_qty: self.short_qty.load(Ordering::Relaxed),
                avg_long_px: self.avg_long_px.load(Ordering::Relaxed),
                avg_short_px: self.avg_short_px.load(Ordering::Relaxed),
                unrealized_pnl: self.unrealized_pnl.load(Ordering::Relaxed),
                realized_pnl: self.realized_pnl.load(Ordering::Relaxed),
                last_update_tsc: self.last_update_tsc.load(Ordering::Relaxed),
            };

            let after = self.sequence.load(Ordering::Acquire);
            if before == after {
                return snap;
            }
            std::hint::spin_loop();
        }
    }

    /// Restore from a previously taken snapshot, e.g. when hydrating from
    /// the persisted-state file.
    pub fn restore(&self, snap: &PositionSnapshot) {
        self.begin_write();
        self.net_qty.store(snap.net_qty, Ordering::Relaxed);
        self.long_qty.store(snap.long_qty, Ordering::Relaxed);
        self.short_qty.store(snap.short_qty, Ordering::Relaxed);
        self.avg_long_px.store(snap.avg_long_px, Ordering::Relaxed);
        self.avg_short_px.store(snap.avg_short_px, Ordering::Relaxed);
        self.unrealized_pnl.store(snap.unrealized_pnl, Ordering::Relaxed);
        self.realized_pnl.store(snap.realized_pnl, Ordering::Relaxed);
        self.last_update_tsc.store(snap.last_update_tsc, Ordering::Relaxed);
        self.end_write();
    }
}

/// Fixed-point conversion helpers. 9 decimal places; no floating point on
/// the order-book or risk hot paths — this module exists for the edges
/// (config parsing, display, VaR/ratio math) that do need f64.
pub mod fixed_point {
    use crate::core::errors::ConversionError;

    pub const SCALE: i64 = 1_000_000_000;

    /// Convert a decimal value to fixed-point, saturating on overflow.
    /// For hot-path code prefer [`from_f64_checked`].
    pub fn from_f64(value: f64) -> i64 {
        (value * SCALE as f64) as i64
    }

    pub fn from_f64_checked(value: f64) -> Result<i64, ConversionError> {
        if value.is_nan() {
            return Err(ConversionError::NotANumber);
        }
        if value.is_infinite() {
            return Err(ConversionError::Infinite { positive: value > 0.0 });
        }
        let scaled = value * SCALE as f64;
        if !scaled.is_finite() || scaled > i64::MAX as f64 || scaled < i64::MIN as f64 {
            return Err(ConversionError::OutOfRange { value });
        }
        Ok(scaled as i64)
    }

    pub fn to_f64(value: i64) -> f64 {
        value as f64 / SCALE as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_id_allocator_is_monotonic_and_starts_at_one() {
        let alloc = OrderIdAllocator::new();
        let a = alloc.next_id();
        let b = alloc.next_id();
        let c = alloc.next_id();
        assert_eq!(a.as_u64(), 1);
        assert_eq!(b.as_u64(), 2);
        assert_eq!(c.as_u64(), 3);
    }

    #[test]
    fn order_id_allocator_resumes_after_snapshot() {
        let alloc = OrderIdAllocator::new();
        alloc.resume_after(500);
        assert_eq!(alloc.next_id().as_u64(), 501);
    }

    #[test]
    fn order_state_terminal_states() {
        assert!(OrderState::Filled.is_terminal());
        assert!(OrderState::Cancelled.is_terminal());
        assert!(OrderState::Rejected.is_terminal());
        assert!(OrderState::Expired.is_terminal());
        assert!(!OrderState::Pending.is_terminal());
        assert!(!OrderState::Acknowledged.is_terminal());
    }

    #[test]
    fn order_state_transitions_follow_diagram() {
        assert!(OrderState::Pending.can_transition_to(OrderState::Submitted));
        assert!(OrderState::Submitted.can_transition_to(OrderState::Acknowledged));
        assert!(OrderState::Acknowledged.can_transition_to(OrderState::PartiallyFilled));
        assert!(OrderState::PartiallyFilled.can_transition_to(OrderState::Filled));
        assert!(!OrderState::Filled.can_transition_to(OrderState::Cancelled));
        assert!(!OrderState::Pending.can_transition_to(OrderState::Filled));
    }

    #[test]
    fn position_apply_fill_long_then_close() {
        let pos = Position::new(1);
        pos.apply_fill(Side::Buy, 10, 100 * fixed_point::SCALE as u64, 1);
        assert_eq!(pos.net_qty(), 10);

        pos.apply_fill(Side::Sell, 10, 110 * fixed_point::SCALE as u64, 2);
        assert_eq!(pos.net_qty(), 0);
        assert!(pos.realized_pnl() > 0);
    }

    #[test]
    fn position_snapshot_is_internally_consistent() {
        let pos = Position::new(1);
        pos.apply_fill(Side::Buy, 5, 50, 10);
        let snap = pos.snapshot();
        assert_eq!(snap.net_qty, snap.long_qty - snap.short_qty);
    }

    #[test]
    fn position_restore_round_trips() {
        let pos = Position::new(1);
        pos.apply_fill(Side::Buy, 7, 42, 3);
        let snap = pos.snapshot();

        let restored = Position::new(1);
        restored.restore(&snap);
        assert_eq!(restored.snapshot(), snap);
    }

    #[test]
    fn fixed_point_round_trip() {
        let v = 123.456;
        let scaled = fixed_point::from_f64_checked(v).unwrap();
        assert!((fixed_point::to_f64(scaled) - v).abs() < 1e-6);
    }

    #[test]
    fn fixed_point_rejects_nan_and_infinity() {
        assert!(fixed_point::from_f64_checked(f64::NAN).is_err());
        assert!(fixed_point::from_f64_checked(f64::INFINITY).is_err());
    }
}
