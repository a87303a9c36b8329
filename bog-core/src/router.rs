//! Venue router (component I): selects a primary/backup venue (or a
//! split across several) for a signal-derived order, and tracks
//! parent/child fills back to the originating parent.

use crate::core::types::{OrderId, Quantity};
use crate::strategy::indicators::Ema;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

/// Cap on remembered execution samples per (venue, symbol): a bounded
/// ring rather than the unbounded history the original venue-performance
/// tracker kept, so quality scoring stays O(1) in memory per pair.
const MAX_QUALITY_SAMPLES: usize = 64;

/// One realized execution used to update a venue's quality score and
/// hidden-liquidity estimate for a symbol.
#[derive(Debug, Clone, Copy)]
pub struct ExecutionSample {
    pub filled_qty: Quantity,
    pub displayed_qty: Quantity,
    pub slippage_bps: f64,
    pub adverse_selection_bps: f64,
}

struct VenueQuality {
    samples: VecDeque<ExecutionSample>,
    hidden_ratio_ewma: Ema,
}

impl VenueQuality {
    fn new() -> Self {
        Self { samples: VecDeque::with_capacity(MAX_QUALITY_SAMPLES), hidden_ratio_ewma: Ema::new(20) }
    }

    fn record(&mut self, sample: ExecutionSample) {
        if self.samples.len() >= MAX_QUALITY_SAMPLES {
            self.samples.pop_front();
        }
        let ratio = sample.filled_qty as f64 / sample.displayed_qty.max(1) as f64;
        self.hidden_ratio_ewma.update(ratio);
        self.samples.push_back(sample);
    }

    /// Blended quality score in `[0, 1]`: fill ratio, low slippage, and
    /// low adverse selection, the same weighted shape the original
    /// venue-performance tracker used before ranking venues.
    fn quality_score(&self, spread_denominator: f64) -> f64 {
        if self.samples.is_empty() {
            return 0.5;
        }
        let n = self.samples.len() as f64;
        let avg_fill_ratio: f64 = self.samples.iter().map(|s| s.filled_qty as f64 / s.displayed_qty.max(1) as f64).sum::<f64>() / n;
        let avg_slippage: f64 = self.samples.iter().map(|s| s.slippage_bps).sum::<f64>() / n;
        let avg_adverse: f64 = self.samples.iter().map(|s| s.adverse_selection_bps).sum::<f64>() / n;

        let fill_component = avg_fill_ratio.min(1.0).max(0.0);
        let slippage_component = (1.0 - avg_slippage / spread_denominator).clamp(0.0, 1.0);
        let adverse_component = (1.0 - avg_adverse / spread_denominator).clamp(0.0, 1.0);

        (0.4 * fill_component + 0.3 * slippage_component + 0.3 * adverse_component).clamp(0.0, 1.0)
    }
}

/// Live state of one tradeable venue, refreshed by the venue egress
/// adapters as reports/heartbeats arrive.
#[derive(Debug, Clone, Copy)]
pub struct VenueState {
    pub venue_id: u16,
    pub operational: bool,
    pub fill_rate: f64,
    pub spread_bps: f64,
    pub visible_size: Quantity,
    pub estimated_hidden_size: Quantity,
    pub ack_latency_ewma_ns: f64,
}

/// Router configuration (§4.6).
#[derive(Debug, Clone, Copy)]
pub struct RouterConfig {
    pub small_order_notional: u128,
    pub spread_denominator: f64,
    pub max_venues_per_split: usize,
    pub max_share_per_venue: f64,
    pub tie_tolerance: f64,
    /// Weight given to the blended quality score vs. the base
    /// fill-rate/spread formula when ranking a single best venue.
    pub quality_weight: f64,
    /// Hidden-liquidity estimate is capped at this multiple of a venue's
    /// displayed size.
    pub max_hidden_multiple: f64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            small_order_notional: 10_000_000,
            spread_denominator: 100.0,
            max_venues_per_split: 3,
            max_share_per_venue: 0.6,
            tie_tolerance: 0.01,
            quality_weight: 0.3,
            max_hidden_multiple: 5.0,
        }
    }
}

/// One child order the router produced for a parent.
#[derive(Debug, Clone, Copy)]
pub struct ChildOrder {
    pub venue_id: u16,
    pub quantity: Quantity,
}

struct ParentTracking {
    total_quantity: Quantity,
    filled_quantity: Quantity,
    children: Vec<OrderId>,
}

/// Routes orders to venues and aggregates child fills back to their
/// parent.
pub struct Router {
    config: RouterConfig,
    parents: HashMap<OrderId, ParentTracking>,
    child_to_parent: HashMap<OrderId, OrderId>,
    quality: Mutex<HashMap<(u16, u32), VenueQuality>>,
}

impl Router {
    pub fn new(config: RouterConfig) -> Self {
        Self { config, parents: HashMap::new(), child_to_parent: HashMap::new(), quality: Mutex::new(HashMap::new()) }
    }

    fn operational(venues: &[VenueState]) -> Vec<&VenueState> {
        venues.iter().filter(|v| v.operational).collect()
    }

    /// Record a realized execution at `venue_id` for `symbol_id`, feeding
    /// both the blended quality score and the hidden-liquidity EWMA.
    pub fn record_execution(&self, venue_id: u16, symbol_id: u32, sample: ExecutionSample) {
        self.quality.lock().entry((venue_id, symbol_id)).or_insert_with(VenueQuality::new).record(sample);
    }

    /// Blended quality score in `[0, 1]` for a venue/symbol pair; `0.5`
    /// (neutral) if no executions have been recorded yet.
    pub fn quality_score(&self, venue_id: u16, symbol_id: u32) -> f64 {
        self.quality
            .lock()
            .get(&(venue_id, symbol_id))
            .map(|q| q.quality_score(self.config.spread_denominator))
            .unwrap_or(0.5)
    }

    /// Estimated liquidity resting beyond `displayed_size`, derived from
    /// the trailing EWMA of `filled_qty / displayed_qty` at the touch and
    /// clamped to `max_hidden_multiple` times the displayed size.
    pub fn estimated_hidden_size(&self, venue_id: u16, symbol_id: u32, displayed_size: Quantity) -> Quantity {
        let ratio = self
            .quality
            .lock()
            .get(&(venue_id, symbol_id))
            .and_then(|q| q.hidden_ratio_ewma.value())
            .unwrap_or(1.0);
        let extra = (displayed_size as f64 * (ratio - 1.0)).max(0.0);
        let cap = displayed_size as f64 * self.config.max_hidden_multiple;
        extra.min(cap) as Quantity
    }

    /// Refresh `estimated_hidden_size` on each venue from the tracked
    /// EWMA before routing, so callers don't have to thread quality state
    /// through themselves.
    pub fn refresh_hidden_estimates(&self, symbol_id: u32, venues: &mut [VenueState]) {
        for v in venues.iter_mut() {
            v.estimated_hidden_size = self.estimated_hidden_size(v.venue_id, symbol_id, v.visible_size);
        }
    }

    fn single_venue_score(&self, symbol_id: u32, v: &VenueState) -> f64 {
        let base = v.fill_rate * (1.0 - v.spread_bps / self.config.spread_denominator);
        let quality = self.quality_score(v.venue_id, symbol_id);
        (1.0 - self.config.quality_weight) * base + self.config.quality_weight * quality
    }

    /// Select venues for `quantity` at `notional`, splitting across
    /// top-K venues by visible+hidden liquidity when the order is large.
    /// Ties within `tie_tolerance` prefer the lower ack-latency EWMA.
    /// Returns the empty vector if no operational venue exists.
    pub fn route(&self, symbol_id: u32, notional: u128, quantity: Quantity, venues: &[VenueState]) -> Vec<ChildOrder> {
        let candidates = Self::operational(venues);
        if candidates.is_empty() {
            return Vec::new();
        }

        if notional < self.config.small_order_notional {
            let best = candidates
                .into_iter()
                .map(|v| (v, self.single_venue_score(symbol_id, v)))
                .fold(None::<(&VenueState, f64)>, |acc, (v, score)| match acc {
                    None => Some((v, score)),
                    Some((best_v, best_score)) => {
                        if score > best_score + self.config.tie_tolerance {
                            Some((v, score))
                        } else if (score - best_score).abs() <= self.config.tie_tolerance
                            && v.ack_latency_ewma_ns < best_v.ack_latency_ewma_ns
                        {
                            Some((v, score))
                        } else {
                            Some((best_v, best_score))
                        }
                    }
                });
            return best.map(|(v, _)| vec![ChildOrder { venue_id: v.venue_id, quantity }]).unwrap_or_default();
        }

        let mut ranked: Vec<&VenueState> = candidates;
        ranked.sort_by(|a, b| {
            let la = a.visible_size as f64 + a.estimated_hidden_size as f64;
            let lb = b.visible_size as f64 + b.estimated_hidden_size as f64;
            lb.partial_cmp(&la).unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked.truncate(self.config.max_venues_per_split);

        let total_liquidity: f64 = ranked
            .iter()
            .map(|v| v.visible_size as f64 + v.estimated_hidden_size as f64)
            .sum();
        if total_liquidity <= 0.0 {
            return Vec::new();
        }

        let max_per_venue = (quantity as f64 * self.config.max_share_per_venue) as u64;
        let mut remaining = quantity;
        let mut children = Vec::new();
        for (idx, v) in ranked.iter().enumerate() {
            let liquidity = v.visible_size as f64 + v.estimated_hidden_size as f64;
            let share = liquidity / total_liquidity;
            let mut qty = ((quantity as f64) * share).round() as u64;
            qty = qty.min(max_per_venue).min(remaining);
            if idx == ranked.len() - 1 {
                qty = remaining;
            }
            if qty == 0 {
                continue;
            }
            children.push(ChildOrder { venue_id: v.venue_id, quantity: qty });
            remaining = remaining.saturating_sub(qty);
        }
        children
    }

    pub fn track_parent(&mut self, parent_id: OrderId, total_quantity: Quantity) {
        self.parents.insert(parent_id, ParentTracking { total_quantity, filled_quantity: 0, children: Vec::new() });
    }

    pub fn track_child(&mut self, parent_id: OrderId, child_id: OrderId) {
        if let Some(parent) = self.parents.get_mut(&parent_id) {
            parent.children.push(child_id);
            self.child_to_parent.insert(child_id, parent_id);
        }
    }

    /// Roll a child fill up into its parent's aggregate filled quantity.
    /// Returns `true` once the parent has been fully filled.
    pub fn aggregate_child_fill(&mut self, child_id: OrderId, fill_qty: Quantity) -> bool {
        let Some(parent_id) = self.child_to_parent.get(&child_id).copied() else { return false };
        if let Some(parent) = self.parents.get_mut(&parent_id) {
            parent.filled_quantity += fill_qty;
            return parent.filled_quantity >= parent.total_quantity;
        }
        false
    }

    pub fn parent_filled_quantity(&self, parent_id: OrderId) -> Option<Quantity> {
        self.parents.get(&parent_id).map(|p| p.filled_quantity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn venue(id: u16, operational: bool, fill_rate: f64, spread_bps: f64) -> VenueState {
        VenueState {
            venue_id: id,
            operational,
            fill_rate,
            spread_bps,
            visible_size: 1000,
            estimated_hidden_size: 0,
            ack_latency_ewma_ns: 1_000.0,
        }
    }

    #[test]
    fn small_order_picks_single_best_venue() {
        let router = Router::new(RouterConfig::default());
        let venues = vec![venue(1, true, 0.5, 10.0), venue(2, true, 0.9, 5.0)];
        let children = router.route(1, 1000, 100, &venues);
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].venue_id, 2);
    }

    #[test]
    fn excludes_nonoperational_venues() {
        let router = Router::new(RouterConfig::default());
        let venues = vec![venue(1, false, 0.99, 1.0), venue(2, true, 0.1, 50.0)];
        let children = router.route(1, 1000, 100, &venues);
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].venue_id, 2);
    }

    #[test]
    fn large_order_splits_across_venues() {
        let router = Router::new(RouterConfig::default());
        let venues = vec![
            VenueState { venue_id: 1, operational: true, fill_rate: 0.9, spread_bps: 1.0, visible_size: 5000, estimated_hidden_size: 0, ack_latency_ewma_ns: 100.0 },
            VenueState { venue_id: 2, operational: true, fill_rate: 0.9, spread_bps: 1.0, visible_size: 5000, estimated_hidden_size: 0, ack_latency_ewma_ns: 100.0 },
        ];
        let children = router.route(1, 100_000_000, 10_000, &venues);
        assert!(children.len() >= 2);
        let total: Quantity = children.iter().map(|c| c.quantity).sum();
        assert_eq!(total, 10_000);
    }

    #[test]
    fn parent_fully_filled_once_children_sum_to_total() {
        let mut router = Router::new(RouterConfig::default());
        let parent = OrderId::new(1);
        let child = OrderId::new(2);
        router.track_parent(parent, 100);
        router.track_child(parent, child);
        assert!(!router.aggregate_child_fill(child, 60));
        assert!(router.aggregate_child_fill(child, 40));
        assert_eq!(router.parent_filled_quantity(parent), Some(100));
    }

    #[test]
    fn quality_score_is_neutral_before_any_execution() {
        let router = Router::new(RouterConfig::default());
        assert_eq!(router.quality_score(1, 1), 0.5);
    }

    #[test]
    fn quality_score_rewards_full_fills_with_low_slippage() {
        let router = Router::new(RouterConfig::default());
        for _ in 0..10 {
            router.record_execution(1, 1, ExecutionSample { filled_qty: 100, displayed_qty: 100, slippage_bps: 0.5, adverse_selection_bps: 0.5 });
        }
        for _ in 0..10 {
            router.record_execution(2, 1, ExecutionSample { filled_qty: 20, displayed_qty: 100, slippage_bps: 50.0, adverse_selection_bps: 50.0 });
        }
        assert!(router.quality_score(1, 1) > router.quality_score(2, 1));
    }

    #[test]
    fn hidden_size_estimate_tracks_fills_beyond_displayed_size() {
        let router = Router::new(RouterConfig::default());
        for _ in 0..20 {
            router.record_execution(1, 1, ExecutionSample { filled_qty: 300, displayed_qty: 100, slippage_bps: 1.0, adverse_selection_bps: 1.0 });
        }
        let hidden = router.estimated_hidden_size(1, 1, 100);
        assert!(hidden > 0, "fills consistently exceeding displayed size should imply hidden liquidity");
        assert!(hidden <= 100 * 5, "estimate must stay within max_hidden_multiple of displayed size");
    }

    #[test]
    fn quality_score_ranking_shifts_single_venue_choice() {
        let router = Router::new(RouterConfig::default());
        // Venue 1 has the better base fill-rate/spread formula, but a
        // track record of partial fills and adverse selection; venue 2's
        // base formula is weaker but its execution history is clean.
        let venues = vec![venue(1, true, 0.9, 5.0), venue(2, true, 0.6, 10.0)];
        for _ in 0..20 {
            router.record_execution(1, 1, ExecutionSample { filled_qty: 10, displayed_qty: 100, slippage_bps: 80.0, adverse_selection_bps: 80.0 });
            router.record_execution(2, 1, ExecutionSample { filled_qty: 100, displayed_qty: 100, slippage_bps: 0.0, adverse_selection_bps: 0.0 });
        }
        let children = router.route(1, 1000, 100, &venues);
        assert_eq!(children[0].venue_id, 2);
    }
}
