//! Market-conditions check (component E, rule 7): spread and
//! price-movement bands. Grounded on the teacher's flash-crash circuit
//! breaker, reworked onto integer tick prices and a `(bid, ask)` pair
//! instead of the teacher's Huginn-specific `MarketSnapshot`.

use crate::core::types::Price;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketConditionsConfig {
    /// Spread wider than this many basis points trips the check.
    pub max_spread_bps: u64,
    /// A single-tick mid-price move larger than this many basis points
    /// trips the check.
    pub max_move_bps: u64,
}

impl Default for MarketConditionsConfig {
    fn default() -> Self {
        Self {
            max_spread_bps: 100,
            max_move_bps: 1_000,
        }
    }
}

/// Tracks the last-seen mid price so it can flag an abnormal single-tick
/// move; stateful because "abnormal" is relative to the prior tick, not
/// an absolute band.
pub struct MarketConditionsMonitor {
    config: MarketConditionsConfig,
    last_mid: Option<Price>,
}

impl MarketConditionsMonitor {
    pub fn new(config: MarketConditionsConfig) -> Self {
        Self { config, last_mid: None }
    }

    /// Returns `Some(spread_bps)` if the current (bid, ask) violates the
    /// configured bands, `None` if conditions are within bounds. Updates
    /// internal mid-price tracking regardless of verdict so a single bad
    /// tick doesn't permanently poison the next comparison.
    pub fn check(&mut self, bid: Price, ask: Price) -> Option<f64> {
        if bid == 0 || ask == 0 || ask <= bid {
            return None;
        }

        let spread_bps = ((ask - bid) as f64 / bid as f64) * 10_000.0;
        let mid = bid / 2 + ask / 2;

        let move_violation = self.last_mid.map(|prev| {
            if prev == 0 {
                false
            } else {
                let move_bps = (mid as i64 - prev as i64).unsigned_abs() as f64 / prev as f64 * 10_000.0;
                move_bps > self.config.max_move_bps as f64
            }
        }).unwrap_or(false);

        self.last_mid = Some(mid);

        if spread_bps > self.config.max_spread_bps as f64 || move_violation {
            Some(spread_bps)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn narrow_spread_passes() {
        let mut m = MarketConditionsMonitor::new(MarketConditionsConfig::default());
        assert_eq!(m.check(100_000, 100_010), None);
    }

    #[test]
    fn wide_spread_trips() {
        let mut m = MarketConditionsMonitor::new(MarketConditionsConfig::default());
        assert!(m.check(100_000, 102_000).is_some());
    }

    #[test]
    fn large_single_tick_move_trips() {
        let mut m = MarketConditionsMonitor::new(MarketConditionsConfig::default());
        assert_eq!(m.check(100_000, 100_010), None);
        assert!(m.check(200_000, 200_010).is_some());
    }

    #[test]
    fn crossed_book_is_ignored_not_tripped() {
        let mut m = MarketConditionsMonitor::new(MarketConditionsConfig::default());
        assert_eq!(m.check(100, 50), None);
    }
}
