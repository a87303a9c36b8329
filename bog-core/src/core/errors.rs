//! Domain-specific error types for the trading core.
//!
//! Every fallible operation in the core returns one of these closed enums
//! rather than a bare `bool` or an ad-hoc string; callers match on the
//! variant instead of parsing a message.

use thiserror::Error;

/// Errors that can occur during arithmetic operations on [`crate::core::Position`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum OverflowError {
    #[error("position quantity overflow: {old} + {delta} would exceed i64 limits")]
    QuantityOverflow { old: i64, delta: i64 },

    #[error("realized pnl overflow: {old} + {delta} would exceed i64 limits")]
    RealizedPnlOverflow { old: i64, delta: i64 },

    #[error("daily pnl overflow: {old} + {delta} would exceed i64 limits")]
    DailyPnlOverflow { old: i64, delta: i64 },

    #[error("trade count overflow: {old} trades (limit: u32::MAX)")]
    TradeCountOverflow { old: u32 },
}

/// Errors from fixed-point conversions (see [`crate::core::fixed_point`]).
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ConversionError {
    #[error("value {value} is out of range for fixed-point representation")]
    OutOfRange { value: f64 },

    #[error("cannot convert NaN to fixed-point")]
    NotANumber,

    #[error("cannot convert {sign} infinity to fixed-point", sign = if *positive { "positive" } else { "negative" })]
    Infinite { positive: bool },
}

/// Errors related to position state management.
#[derive(Debug, Clone, Error)]
pub enum PositionError {
    #[error("position state inconsistent: {reason}")]
    InconsistentState { reason: String },

    #[error(transparent)]
    Overflow(#[from] OverflowError),
}

/// Order book mutation and query errors (component C).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BookError {
    #[error("price {price} is not a multiple of tick size {tick_size}")]
    InvalidPrice { price: u64, tick_size: u64 },

    #[error("price {price} is outside [{min}, {max}]")]
    PriceOutOfBand { price: u64, min: u64, max: u64 },

    #[error("quantity {qty} is not valid (zero or exceeds symbol maximum {max})")]
    InvalidQuantity { qty: u64, max: u64 },

    #[error("order id {0} already exists in the book")]
    DuplicateOrderId(u64),

    #[error("order id {0} is not known to the book")]
    UnknownOrderId(u64),

    #[error("book has reached its maximum order count ({0})")]
    BookCapacityExceeded(u32),

    #[error("side has reached its maximum distinct price level count ({0})")]
    LevelCapacityExceeded(u32),

    #[error("best bid {bid} >= best ask {ask}: book is crossed")]
    CrossedBookDetected { bid: u64, ask: u64 },
}

/// Pre-submit and lifecycle errors from the order management system (component H).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum OmsRejection {
    #[error("order quantity is zero")]
    ZeroQuantity,

    #[error("limit order price {price} is not a multiple of tick size {tick_size}")]
    PriceNotTickAligned { price: u64, tick_size: u64 },

    #[error("order notional {notional} exceeds the configured maximum {max}")]
    NotionalTooLarge { notional: u128, max: u128 },

    #[error("order id {0} is not tracked by the OMS")]
    UnknownOrder(u64),

    #[error("illegal state transition from {from:?} to {to:?}")]
    IllegalStateTransition {
        from: crate::core::types::OrderState,
        to: crate::core::types::OrderState,
    },
}

/// Pre-trade rejection reasons from the risk engine (component E), in the
/// fixed evaluation order §4.2 specifies (cheapest check first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RiskRejection {
    #[error("kill switch is at {level:?}")]
    KillSwitch { level: crate::risk::kill_switch::KillSwitchLevel },

    #[error("rate limit exceeded ({count}/{limit} orders in the trailing window)")]
    RateLimit { count: u32, limit: u32 },

    #[error("position limit exceeded: proposed net {proposed} exceeds limit {limit}")]
    PositionLimit { proposed: i64, limit: i64 },

    #[error("order notional {notional} exceeds per-order limit {limit}")]
    OrderValueLimit { notional: u128, limit: u128 },

    #[error("daily traded volume {volume} exceeds limit {limit}")]
    DailyVolumeLimit { volume: u64, limit: u64 },

    #[error("concentration {pct:.4} exceeds limit {limit:.4}")]
    ConcentrationLimit { pct: f64, limit: f64 },

    #[error("market conditions outside bounds: spread_bps={spread_bps:.2}")]
    MarketConditions { spread_bps: f64 },

    #[error("portfolio VaR {var:.2} exceeds limit {limit:.2}")]
    PortfolioVaRLimit { var: f64, limit: f64 },

    #[error("cancel ratio {ratio:.4} exceeds limit {limit:.4}")]
    CancelRatioLimit { ratio: f64, limit: f64 },
}

/// Errors loading the persisted snapshot file (see `bog_core::snapshot`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SnapshotError {
    #[error("snapshot file has bad magic number {0:#010x}, expected 0x48465453")]
    BadMagic(u32),

    #[error("snapshot format version {0} is not supported")]
    UnsupportedVersion(u32),

    #[error("snapshot CRC32 mismatch: expected {expected:#010x}, computed {computed:#010x}")]
    CrcMismatch { expected: u32, computed: u32 },

    #[error("snapshot file is truncated: needed {needed} bytes, found {found}")]
    Truncated { needed: usize, found: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overflow_error_display() {
        let err = OverflowError::QuantityOverflow {
            old: i64::MAX - 100,
            delta: 200,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("overflow"));
    }

    #[test]
    fn position_error_from_overflow() {
        let overflow = OverflowError::QuantityOverflow { old: 100, delta: 200 };
        let pos_err: PositionError = overflow.into();
        assert!(matches!(pos_err, PositionError::Overflow(_)));
    }

    #[test]
    fn book_error_display() {
        let err = BookError::BookCapacityExceeded(100_000);
        assert!(format!("{}", err).contains("100000"));
    }
}
