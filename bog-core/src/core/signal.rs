//! Zero-overhead trading signals.
//!
//! Signals are 64-byte stack-allocated structs that fit exactly in one
//! cache line. No heap allocations, no dynamic dispatch.

use std::fmt;

/// The intent behind a signal: open/extend exposure, close it, or shed
/// risk under pressure from the risk engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SignalKind {
    Entry = 0,
    Exit = 1,
    RiskReduce = 2,
}

/// A strategy's suggestion to the OMS: direction, strength, confidence,
/// and a suggested size/price. Exactly one cache line.
///
/// `strength` and `confidence` are fixed-point in `[-1, 1]` and `[0, 1]`
/// respectively, using [`crate::core::types::fixed_point::SCALE`].
/// `suggested_price` of `0` means "use the market" (send as a marketable
/// order rather than resting at a specific price).
#[derive(Clone, Copy)]
#[repr(C, align(64))]
pub struct Signal {
    pub timestamp_tsc: u64,
    pub symbol_id: u32,
    pub strategy_id: u32,
    pub kind: SignalKind,
    _pad0: [u8; 3],
    pub urgency: u16,
    _pad1: [u8; 2],
    pub strength: i64,
    pub confidence: i64,
    pub suggested_qty: u64,
    pub suggested_price: u64,
    _padding: [u8; 8],
}

impl Signal {
    #[inline(always)]
    #[allow(clippy::too_many_arguments)]
    pub const fn new(
        timestamp_tsc: u64,
        symbol_id: u32,
        strategy_id: u32,
        kind: SignalKind,
        urgency: u16,
        strength: i64,
        confidence: i64,
        suggested_qty: u64,
        suggested_price: u64,
    ) -> Self {
        Self {
            timestamp_tsc,
            symbol_id,
            strategy_id,
            kind,
            _pad0: [0; 3],
            urgency,
            _pad1: [0; 2],
            strength,
            confidence,
            suggested_qty,
            suggested_price,
            _padding: [0; 8],
        }
    }

    #[inline(always)]
    pub const fn is_market(&self) -> bool {
        self.suggested_price == 0
    }
}

impl fmt::Debug for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("symbol_id", &self.symbol_id)
            .field("strategy_id", &self.strategy_id)
            .field("kind", &self.kind)
            .field("strength", &self.strength)
            .field("confidence", &self.confidence)
            .field("suggested_qty", &self.suggested_qty)
            .field("suggested_price", &self.suggested_price)
            .finish()
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Signal(sym={}, strat={}, {:?}, qty={}, px={})",
            self.symbol_id, self.strategy_id, self.kind, self.suggested_qty, self.suggested_price
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_is_exactly_one_cache_line() {
        assert_eq!(std::mem::size_of::<Signal>(), 64);
        assert_eq!(std::mem::align_of::<Signal>(), 64);
    }

    #[test]
    fn market_signal_has_zero_price() {
        let s = Signal::new(1, 1, 1, SignalKind::Entry, 0, 0, 0, 100, 0);
        assert!(s.is_market());
    }

    #[test]
    fn limit_signal_is_not_market() {
        let s = Signal::new(1, 1, 1, SignalKind::Entry, 0, 0, 0, 100, 5_000);
        assert!(!s.is_market());
    }

    #[test]
    fn signal_is_copy() {
        let a = Signal::new(1, 1, 1, SignalKind::RiskReduce, 10, -500_000_000, 900_000_000, 50, 0);
        let b = a;
        assert_eq!(a.strength, b.strength);
    }
}
