//! The process-wide kill switch (component E): four monotonic levels
//! gating order submission. Only ever moves upward during a session; a
//! manual operator reset is required to move back down. See §4.2.

use std::sync::atomic::{AtomicU8, Ordering};

/// Kill-switch level. Ordered: a higher discriminant is always at least
/// as restrictive as a lower one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum KillSwitchLevel {
    /// Normal operation, no restriction.
    None = 0,
    /// Reject any order that would increase absolute position.
    ReduceOnly = 1,
    /// Reject any order that is not strictly reducing absolute position.
    CloseOnly = 2,
    /// Reject all orders.
    EmergencyStop = 3,
}

impl KillSwitchLevel {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::None,
            1 => Self::ReduceOnly,
            2 => Self::CloseOnly,
            _ => Self::EmergencyStop,
        }
    }
}

/// Why the kill switch moved to its current level. Kept for the audit
/// trail; not itself part of the monotonic ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KillSwitchTrigger {
    PortfolioLoss,
    Drawdown,
    VarBreachCount,
    OperatorCommand,
    DegradedMode,
}

/// Atomic, lock-free, process-wide kill-switch gate. One instance is
/// shared (via `Arc`) between the risk engine, the supervisor's degraded-
/// mode detector, and any operator-facing control surface.
pub struct KillSwitch {
    level: AtomicU8,
}

impl KillSwitch {
    pub const fn new() -> Self {
        Self {
            level: AtomicU8::new(KillSwitchLevel::None as u8),
        }
    }

    #[inline(always)]
    pub fn level(&self) -> KillSwitchLevel {
        KillSwitchLevel::from_u8(self.level.load(Ordering::Acquire))
    }

    /// Raise the kill switch to at least `level`. A no-op if already at or
    /// above that level (the switch never moves down through this call).
    /// Returns the level after the call.
    pub fn raise_to(&self, level: KillSwitchLevel, _trigger: KillSwitchTrigger) -> KillSwitchLevel {
        let raised = self.level.fetch_max(level as u8, Ordering::AcqRel).max(level as u8);
        KillSwitchLevel::from_u8(raised)
    }

    /// Manual operator reset back to `None`. The only way the level ever
    /// decreases.
    pub fn reset(&self) {
        self.level.store(KillSwitchLevel::None as u8, Ordering::Release);
    }

    /// Whether an order that would change `abs(current_net)` to
    /// `abs(proposed_net)` is permitted at the current level.
    pub fn permits(&self, current_net: i64, proposed_net: i64) -> bool {
        match self.level() {
            KillSwitchLevel::None => true,
            KillSwitchLevel::ReduceOnly => proposed_net.abs() <= current_net.abs(),
            KillSwitchLevel::CloseOnly => proposed_net.abs() < current_net.abs(),
            KillSwitchLevel::EmergencyStop => false,
        }
    }
}

impl Default for KillSwitch {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_none_and_permits_everything() {
        let ks = KillSwitch::new();
        assert_eq!(ks.level(), KillSwitchLevel::None);
        assert!(ks.permits(0, 1000));
    }

    #[test]
    fn reduce_only_blocks_increase_allows_decrease() {
        let ks = KillSwitch::new();
        ks.raise_to(KillSwitchLevel::ReduceOnly, KillSwitchTrigger::Drawdown);
        assert!(!ks.permits(500, 600));
        assert!(ks.permits(500, 200));
    }

    #[test]
    fn close_only_rejects_equal_magnitude() {
        let ks = KillSwitch::new();
        ks.raise_to(KillSwitchLevel::CloseOnly, KillSwitchTrigger::VarBreachCount);
        assert!(!ks.permits(500, 500));
        assert!(ks.permits(500, 100));
    }

    #[test]
    fn emergency_stop_blocks_everything() {
        let ks = KillSwitch::new();
        ks.raise_to(KillSwitchLevel::EmergencyStop, KillSwitchTrigger::OperatorCommand);
        assert!(!ks.permits(500, 0));
    }

    #[test]
    fn level_is_monotonic_raise_to_lower_is_noop() {
        let ks = KillSwitch::new();
        ks.raise_to(KillSwitchLevel::CloseOnly, KillSwitchTrigger::Drawdown);
        ks.raise_to(KillSwitchLevel::ReduceOnly, KillSwitchTrigger::Drawdown);
        assert_eq!(ks.level(), KillSwitchLevel::CloseOnly);
    }

    #[test]
    fn reset_returns_to_none() {
        let ks = KillSwitch::new();
        ks.raise_to(KillSwitchLevel::EmergencyStop, KillSwitchTrigger::OperatorCommand);
        ks.reset();
        assert_eq!(ks.level(), KillSwitchLevel::None);
    }
}
