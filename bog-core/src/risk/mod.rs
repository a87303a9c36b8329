//! Risk engine (component E): inline pre-trade checks, fast enough to sit
//! in the order-submission path. Evaluation order is fixed and
//! short-circuits on the first failure, cheapest check first — see §4.2.

pub mod cancel_ratio;
pub mod kill_switch;
pub mod market_conditions;
pub mod rate_limiter;
pub mod var;

use crate::core::errors::RiskRejection;
use crate::core::types::{Price, Quantity, Side};
use crate::position::PositionStore;
use cancel_ratio::CancelRatioTracker;
use kill_switch::{KillSwitch, KillSwitchLevel, KillSwitchTrigger};
use market_conditions::{MarketConditionsConfig, MarketConditionsMonitor};
use parking_lot::Mutex;
use rate_limiter::RateLimiter;
use std::collections::HashMap;
use std::sync::Arc;
use var::VarEngine;

/// Outcome of [`RiskEngine::check_order`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskVerdict {
    Approved,
    Rejected(RiskRejection),
}

impl RiskVerdict {
    pub fn is_approved(&self) -> bool {
        matches!(self, RiskVerdict::Approved)
    }
}

/// A proposed order, the minimal shape `check_order` needs. Constructed
/// by the strategy manager from a scaled signal before handing off to the
/// OMS.
#[derive(Debug, Clone, Copy)]
pub struct OrderIntent {
    pub symbol_id: u32,
    pub side: Side,
    pub price: Price,
    pub quantity: Quantity,
}

impl OrderIntent {
    pub fn notional(&self) -> u128 {
        self.price as u128 * self.quantity as u128
    }
}

/// Static, per-symbol configurable limits. Loaded from [`crate::config`]
/// at startup; never mutated on the hot path.
#[derive(Debug, Clone)]
pub struct RiskLimits {
    pub rate_limit_per_sec: u32,
    pub max_position_value: u64,
    pub max_order_notional: u128,
    pub daily_volume_limit: u64,
    pub concentration_limit: f64,
    pub cancel_ratio_limit: f64,
    pub cancel_ratio_min_orders: u32,
    pub var_limit: f64,
    pub market_conditions: MarketConditionsConfig,
    pub kill_switch_drawdown: f64,
    pub kill_switch_daily_loss: u64,
    pub var_recompute_interval_ms: u32,
}

impl Default for RiskLimits {
    fn default() -> Self {
        Self {
            rate_limit_per_sec: 100,
            max_position_value: 10_000_000_000,
            max_order_notional: 1_000_000_000,
            daily_volume_limit: 100_000_000,
            concentration_limit: 0.5,
            cancel_ratio_limit: 0.9,
            cancel_ratio_min_orders: 20,
            var_limit: 1_000_000.0,
            market_conditions: MarketConditionsConfig::default(),
            kill_switch_drawdown: 0.20,
            kill_switch_daily_loss: 500_000,
            var_recompute_interval_ms: 1_000,
        }
    }
}

/// Per-symbol daily-traded-volume accumulator. Reset by the supervisor at
/// session rollover.
#[derive(Default)]
struct DailyVolume {
    traded: HashMap<u32, u64>,
}

/// The risk engine proper. Owns every stateful rule input except the
/// position store (shared with the OMS) and holds the process-wide kill
/// switch so other components (supervisor degraded-mode detection) can
/// raise it too.
pub struct RiskEngine {
    limits: RiskLimits,
    kill_switch: Arc<KillSwitch>,
    rate_limiter: RateLimiter,
    cancel_ratio: CancelRatioTracker,
    market_conditions: Mutex<HashMap<u32, MarketConditionsMonitor>>,
    market_violations: Mutex<HashMap<u32, f64>>,
    var_engine: VarEngine,
    daily_volume: Mutex<DailyVolume>,
    var_breach_count: std::sync::atomic::AtomicU32,
}

impl RiskEngine {
    pub fn new(limits: RiskLimits, var_covariance: var::CovarianceMatrix) -> Self {
        let cancel_ratio =
            CancelRatioTracker::new(limits.cancel_ratio_limit, limits.cancel_ratio_min_orders);
        let rate_limiter = RateLimiter::new(limits.rate_limit_per_sec);
        let var_engine = VarEngine::new(
            var_covariance,
            std::time::Duration::from_millis(limits.var_recompute_interval_ms as u64),
        );
        Self {
            limits,
            kill_switch: Arc::new(KillSwitch::new()),
            rate_limiter,
            cancel_ratio,
            market_conditions: Mutex::new(HashMap::new()),
            market_violations: Mutex::new(HashMap::new()),
            var_engine,
            daily_volume: Mutex::new(DailyVolume::default()),
            var_breach_count: std::sync::atomic::AtomicU32::new(0),
        }
    }

    pub fn kill_switch(&self) -> Arc<KillSwitch> {
        self.kill_switch.clone()
    }

    /// Feed a book top-of-book update to the market-conditions monitor for
    /// a symbol. Called from the ingress worker on every quote update.
    /// The verdict is latched per symbol until the next quote clears it,
    /// so `check_order` can consult the current condition at order time
    /// instead of only at quote time.
    pub fn observe_quote(&self, symbol_id: u32, bid: Price, ask: Price) {
        let mut monitors = self.market_conditions.lock();
        let monitor = monitors
            .entry(symbol_id)
            .or_insert_with(|| MarketConditionsMonitor::new(self.limits.market_conditions));
        let verdict = monitor.check(bid, ask);
        drop(monitors);

        let mut violations = self.market_violations.lock();
        match verdict {
            Some(spread_bps) => {
                violations.insert(symbol_id, spread_bps);
            }
            None => {
                violations.remove(&symbol_id);
            }
        }
    }

    pub fn record_cancel(&self, symbol_id: u32, now_ns: u64) {
        self.cancel_ratio.record_cancel(symbol_id, now_ns);
    }

    pub fn record_traded_volume(&self, symbol_id: u32, qty: Quantity) {
        let mut dv = self.daily_volume.lock();
        *dv.traded.entry(symbol_id).or_insert(0) += qty;
    }

    /// The eight ordered pre-trade rules from §4.2, short-circuiting on
    /// first failure. `positions` supplies the current position to check
    /// against; `mark_price` supplies marks for the VaR weight vector.
    #[allow(clippy::too_many_arguments)]
    pub fn check_order(
        &self,
        intent: &OrderIntent,
        positions: &PositionStore,
        now_ns: u64,
        var_weights_current: &[f64],
        var_weights_proposed: &[f64],
        tsc_hz: u64,
    ) -> RiskVerdict {
        // 1. Kill switch.
        let current_net = positions.get(intent.symbol_id).map(|p| p.net_qty()).unwrap_or(0);
        let proposed_net = current_net + intent.side.sign() * intent.quantity as i64;
        if !self.kill_switch.permits(current_net, proposed_net) {
            return RiskVerdict::Rejected(RiskRejection::KillSwitch {
                level: self.kill_switch.level(),
            });
        }

        // 2. Rate limit (and cancel ratio, same family of check).
        if !self.rate_limiter.try_admit(intent.symbol_id, now_ns) {
            return RiskVerdict::Rejected(RiskRejection::RateLimit {
                count: self.limits.rate_limit_per_sec,
                limit: self.limits.rate_limit_per_sec,
            });
        }
        if let Some(ratio) = self.cancel_ratio.check(intent.symbol_id, now_ns) {
            return RiskVerdict::Rejected(RiskRejection::CancelRatioLimit {
                ratio,
                limit: self.limits.cancel_ratio_limit,
            });
        }

        // 3. Per-symbol position limit given the proposed delta.
        let proposed_value = (proposed_net.unsigned_abs() as u128) * intent.price as u128;
        if proposed_value > self.limits.max_position_value as u128 {
            return RiskVerdict::Rejected(RiskRejection::PositionLimit {
                proposed: proposed_net,
                limit: self.limits.max_position_value as i64,
            });
        }

        // 4. Per-order notional limit.
        if intent.notional() > self.limits.max_order_notional {
            return RiskVerdict::Rejected(RiskRejection::OrderValueLimit {
                notional: intent.notional(),
                limit: self.limits.max_order_notional,
            });
        }

        // 5. Daily-volume limit.
        let traded_today = self
            .daily_volume
            .lock()
            .traded
            .get(&intent.symbol_id)
            .copied()
            .unwrap_or(0);
        if traded_today + intent.quantity > self.limits.daily_volume_limit {
            return RiskVerdict::Rejected(RiskRejection::DailyVolumeLimit {
                volume: traded_today + intent.quantity,
                limit: self.limits.daily_volume_limit,
            });
        }

        // 6. Concentration: this symbol's share of gross exposure after
        // the proposed fill.
        let aggregates = positions.aggregates(|_| Some(intent.price));
        let gross_after = aggregates.gross_exposure.unsigned_abs() as f64 + proposed_value as f64;
        if gross_after > 0.0 {
            let pct = proposed_value as f64 / gross_after;
            if pct > self.limits.concentration_limit {
                return RiskVerdict::Rejected(RiskRejection::ConcentrationLimit {
                    pct,
                    limit: self.limits.concentration_limit,
                });
            }
        }

        // 7. Market conditions: the latest quote for this symbol violated
        // its spread/move bands and hasn't been cleared by a subsequent
        // quote yet.
        if let Some(spread_bps) = self.market_violations.lock().get(&intent.symbol_id).copied() {
            return RiskVerdict::Rejected(RiskRejection::MarketConditions { spread_bps });
        }

        // 8. Portfolio VaR (incremental approximation against proposed
        // position weights).
        let delta = self
            .var_engine
            .incremental_delta(var_weights_current, var_weights_proposed);
        let cached = self
            .var_engine
            .recompute(var_weights_proposed, now_ns, tsc_hz);
        let projected_var = cached.var + delta.max(0.0);
        if projected_var > self.limits.var_limit {
            self.var_breach_count.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            return RiskVerdict::Rejected(RiskRejection::PortfolioVaRLimit {
                var: projected_var,
                limit: self.limits.var_limit,
            });
        }

        RiskVerdict::Approved
    }

    /// Drawdown/loss-driven kill-switch escalation, called by the
    /// supervisor after each `PositionStore::aggregates` recompute (§4.2
    /// Triggers).
    pub fn evaluate_portfolio_triggers(&self, drawdown: f64, daily_loss: i64) {
        if drawdown > self.limits.kill_switch_drawdown {
            self.kill_switch
                .raise_to(KillSwitchLevel::ReduceOnly, KillSwitchTrigger::Drawdown);
        }
        if daily_loss < 0 && daily_loss.unsigned_abs() > self.limits.kill_switch_daily_loss {
            self.kill_switch
                .raise_to(KillSwitchLevel::ReduceOnly, KillSwitchTrigger::PortfolioLoss);
        }
        if self.var_breach_count.load(std::sync::atomic::Ordering::Relaxed) > 10 {
            self.kill_switch
                .raise_to(KillSwitchLevel::CloseOnly, KillSwitchTrigger::VarBreachCount);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> RiskEngine {
        RiskEngine::new(RiskLimits::default(), var::CovarianceMatrix::identity(1, 1.0))
    }

    fn intent(qty: u64, price: u64) -> OrderIntent {
        OrderIntent { symbol_id: 1, side: Side::Buy, price, quantity: qty }
    }

    #[test]
    fn approves_ordinary_order() {
        let e = engine();
        let positions = PositionStore::new();
        let v = e.check_order(&intent(10, 100), &positions, 0, &[0.0], &[0.0], 1_000_000_000);
        assert!(v.is_approved());
    }

    #[test]
    fn rejects_order_over_notional_limit() {
        let mut limits = RiskLimits::default();
        limits.max_order_notional = 1_000_000;
        let e = RiskEngine::new(limits, var::CovarianceMatrix::identity(1, 1.0));
        let positions = PositionStore::new();
        // 20_000 * 60 = 1_200_000 > 1_000_000
        let v = e.check_order(&intent(20_000, 60), &positions, 0, &[0.0], &[0.0], 1_000_000_000);
        assert!(matches!(v, RiskVerdict::Rejected(RiskRejection::OrderValueLimit { .. })));
    }

    #[test]
    fn kill_switch_reduce_only_blocks_increase_allows_decrease() {
        let e = engine();
        e.kill_switch.raise_to(KillSwitchLevel::ReduceOnly, KillSwitchTrigger::OperatorCommand);
        let positions = PositionStore::new();
        positions.get_or_insert(1).apply_fill(Side::Buy, 500, 100, 0);

        let buy = intent(100, 100);
        assert!(matches!(
            e.check_order(&buy, &positions, 0, &[0.0], &[0.0], 1_000_000_000),
            RiskVerdict::Rejected(RiskRejection::KillSwitch { .. })
        ));

        let sell = OrderIntent { side: Side::Sell, ..intent(200, 100) };
        assert!(e.check_order(&sell, &positions, 0, &[0.0], &[0.0], 1_000_000_000).is_approved());
    }

    #[test]
    fn rate_limit_rejects_sixth_order_in_same_bucket() {
        let mut limits = RiskLimits::default();
        limits.rate_limit_per_sec = 5;
        let e = RiskEngine::new(limits, var::CovarianceMatrix::identity(1, 1.0));
        let positions = PositionStore::new();
        for _ in 0..5 {
            assert!(e.check_order(&intent(1, 100), &positions, 0, &[0.0], &[0.0], 1_000_000_000).is_approved());
        }
        assert!(matches!(
            e.check_order(&intent(1, 100), &positions, 0, &[0.0], &[0.0], 1_000_000_000),
            RiskVerdict::Rejected(RiskRejection::RateLimit { .. })
        ));
        // New bucket: approved again.
        assert!(e
            .check_order(&intent(1, 100), &positions, 2_000_000_000, &[0.0], &[0.0], 1_000_000_000)
            .is_approved());
    }

    #[test]
    fn evaluate_portfolio_triggers_raises_kill_switch_on_drawdown() {
        let e = engine();
        e.evaluate_portfolio_triggers(0.5, 0);
        assert_eq!(e.kill_switch.level(), KillSwitchLevel::ReduceOnly);
    }

    #[test]
    fn rejects_order_while_market_conditions_violated() {
        let e = engine();
        let positions = PositionStore::new();
        // Spread of ~5000bps on a symbol configured for a 100bps max.
        e.observe_quote(1, 100, 150);
        assert!(matches!(
            e.check_order(&intent(10, 100), &positions, 0, &[0.0], &[0.0], 1_000_000_000),
            RiskVerdict::Rejected(RiskRejection::MarketConditions { .. })
        ));
    }

    #[test]
    fn market_conditions_clear_once_spread_normalizes() {
        let e = engine();
        let positions = PositionStore::new();
        e.observe_quote(1, 100, 150);
        e.observe_quote(1, 100_000, 100_010);
        assert!(e.check_order(&intent(10, 100), &positions, 0, &[0.0], &[0.0], 1_000_000_000).is_approved());
    }
}
