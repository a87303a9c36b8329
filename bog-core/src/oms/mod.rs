//! Order management system (component H): the active-order map, pre-
//! submit validation, execution-report application, TIF expiration
//! sweeps, and a bounded audit ring of terminal orders.

pub mod audit;

use crate::core::errors::OmsRejection;
use crate::core::types::{Fill, Order, OrderId, OrderIdAllocator, OrderState, OrderType, Price, Tif};
use audit::AuditRing;
use dashmap::DashMap;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};

/// Per-venue latency tracking: exponential moving averages of ack and
/// fill latency, fed every time an execution report arrives.
#[derive(Debug, Default, Clone, Copy)]
pub struct VenueLatency {
    ack_ewma_ns: f64,
    fill_ewma_ns: f64,
    samples: u64,
}

impl VenueLatency {
    const ALPHA: f64 = 0.2;

    fn record_ack(&mut self, latency_ns: u64) {
        self.update_ack(latency_ns as f64);
    }

    fn update_ack(&mut self, latency_ns: f64) {
        self.ack_ewma_ns = if self.samples == 0 {
            latency_ns
        } else {
            Self::ALPHA * latency_ns + (1.0 - Self::ALPHA) * self.ack_ewma_ns
        };
    }

    fn record_fill(&mut self, latency_ns: u64) {
        let latency_ns = latency_ns as f64;
        self.fill_ewma_ns = if self.samples == 0 {
            latency_ns
        } else {
            Self::ALPHA * latency_ns + (1.0 - Self::ALPHA) * self.fill_ewma_ns
        };
        self.samples += 1;
    }

    pub fn ack_ewma_ns(&self) -> f64 {
        self.ack_ewma_ns
    }

    pub fn fill_ewma_ns(&self) -> f64 {
        self.fill_ewma_ns
    }
}

/// An execution report from a venue adapter, applied idempotently by
/// `exec_id`: a report already applied is a no-op rather than a double
/// fill.
#[derive(Debug, Clone, Copy)]
pub struct ExecutionReport {
    pub order_id: OrderId,
    pub venue_order_id: u64,
    pub exec_id: u64,
    pub state: OrderState,
    pub executed_qty: u64,
    pub remaining_qty: u64,
    pub exec_price: Price,
    pub ts: u64,
    pub reject_reason: Option<OmsRejection>,
}

/// A lifecycle transition the OMS publishes for subscribers (strategies,
/// metrics sink).
#[derive(Debug, Clone, Copy)]
pub struct LifecycleEvent {
    pub order_id: OrderId,
    pub from: OrderState,
    pub to: OrderState,
    pub ts: u64,
}

/// Cap on remembered exec ids per order: a bounded ring rather than an
/// unbounded set, so a pathological retransmission storm can't grow one
/// order's memory without limit. Large enough that no realistic order
/// lifecycle (a handful of partials plus a terminal report) evicts an
/// id it still needs to recognize.
const MAX_TRACKED_EXEC_IDS: usize = 32;

struct TrackedOrder {
    order: Order,
    applied_exec_ids: VecDeque<u64>,
}

impl TrackedOrder {
    fn has_applied(&self, exec_id: u64) -> bool {
        self.applied_exec_ids.contains(&exec_id)
    }

    fn record_applied(&mut self, exec_id: u64) {
        if self.applied_exec_ids.len() >= MAX_TRACKED_EXEC_IDS {
            self.applied_exec_ids.pop_front();
        }
        self.applied_exec_ids.push_back(exec_id);
    }
}

/// Owns the active-order map and dispatches execution reports against it.
/// One instance per process, driven from the OMS/risk thread (§5).
pub struct Oms {
    tick_size: Price,
    max_order_notional: u128,
    id_allocator: OrderIdAllocator,
    active: DashMap<OrderId, TrackedOrder>,
    venue_latency: DashMap<u16, VenueLatency>,
    audit: AuditRing,
    lifecycle_seq: AtomicU64,
}

impl Oms {
    pub fn new(tick_size: Price, max_order_notional: u128, audit_capacity: usize) -> Self {
        Self {
            tick_size,
            max_order_notional,
            id_allocator: OrderIdAllocator::new(),
            active: DashMap::new(),
            venue_latency: DashMap::new(),
            audit: AuditRing::new(audit_capacity),
            lifecycle_seq: AtomicU64::new(0),
        }
    }

    pub fn resume_ids_after(&self, last_issued: u64) {
        self.id_allocator.resume_after(last_issued);
    }

    /// Pre-submit validation: zero quantity, non-tick-aligned limit
    /// price, or excessive notional are rejected before an `Order` ever
    /// enters the active map (§4.5).
    pub fn validate(&self, order_type: OrderType, price: Price, quantity: u64) -> Result<(), OmsRejection> {
        if quantity == 0 {
            return Err(OmsRejection::ZeroQuantity);
        }
        if order_type == OrderType::Limit && price % self.tick_size != 0 {
            return Err(OmsRejection::PriceNotTickAligned { price, tick_size: self.tick_size });
        }
        let notional = price as u128 * quantity as u128;
        if notional > self.max_order_notional {
            return Err(OmsRejection::NotionalTooLarge { notional, max: self.max_order_notional });
        }
        Ok(())
    }

    /// Register a validated order as `Pending`, allocating its id.
    pub fn submit(
        &self,
        symbol_id: u32,
        side: crate::core::types::Side,
        order_type: OrderType,
        tif: Tif,
        price: Price,
        quantity: u64,
        strategy_id: u32,
        now_tsc: u64,
    ) -> Result<OrderId, OmsRejection> {
        self.validate(order_type, price, quantity)?;
        let order_id = self.id_allocator.next_id();
        let order = Order {
            order_id,
            symbol_id,
            side,
            state: OrderState::Pending,
            order_type,
            tif,
            price,
            quantity,
            filled_qty: 0,
            created_tsc: now_tsc,
            last_update_tsc: now_tsc,
            strategy_id,
            venue_id: 0,
            client_order_id: 0,
        };
        self.active.insert(order_id, TrackedOrder { order, applied_exec_ids: VecDeque::new() });
        Ok(order_id)
    }

    pub fn get(&self, order_id: OrderId) -> Option<Order> {
        self.active.get(&order_id).map(|e| e.order)
    }

    /// Apply an execution report idempotently. Returns the resulting
    /// `Fill` when the report carried new executed quantity, plus the
    /// lifecycle transition if the state changed.
    pub fn apply_execution_report(
        &self,
        report: &ExecutionReport,
    ) -> Result<(Option<Fill>, Option<LifecycleEvent>), OmsRejection> {
        let mut entry = self
            .active
            .get_mut(&report.order_id)
            .ok_or(OmsRejection::UnknownOrder(report.order_id.as_u64()))?;

        if entry.has_applied(report.exec_id) {
            return Ok((None, None));
        }

        let prev_state = entry.order.state;
        let prev_filled = entry.order.filled_qty;
        entry.order.transition(report.state, report.ts)?;
        entry.order.filled_qty = report.executed_qty;
        entry.record_applied(report.exec_id);

        let delta = report.executed_qty.saturating_sub(prev_filled);
        let fill = if delta > 0 {
            Some(Fill { order_id: report.order_id, price: report.exec_price, quantity: delta, venue_id: entry.order.venue_id, tsc: report.ts })
        } else {
            None
        };

        let lifecycle = if prev_state != report.state {
            self.lifecycle_seq.fetch_add(1, Ordering::Relaxed);
            Some(LifecycleEvent { order_id: report.order_id, from: prev_state, to: report.state, ts: report.ts })
        } else {
            None
        };

        let terminal = matches!(report.state, OrderState::Filled | OrderState::Cancelled | OrderState::Rejected | OrderState::Expired);
        if terminal {
            let order = entry.order;
            drop(entry);
            self.active.remove(&report.order_id);
            self.audit.push(order);
        }

        Ok((fill, lifecycle))
    }

    pub fn record_ack(&self, venue_id: u16, latency_ns: u64) {
        self.venue_latency.entry(venue_id).or_default().record_ack(latency_ns);
    }

    pub fn record_fill_latency(&self, venue_id: u16, latency_ns: u64) {
        self.venue_latency.entry(venue_id).or_default().record_fill(latency_ns);
    }

    pub fn venue_latency(&self, venue_id: u16) -> VenueLatency {
        self.venue_latency.get(&venue_id).map(|e| *e).unwrap_or_default()
    }

    /// Sweep the active-order map for TIF expirations; `Day`/`GTD` orders
    /// past their horizon transition to `Expired`. Returns the ids swept.
    pub fn sweep_expirations(&self, now_tsc: u64, day_horizon_ns: u64) -> Vec<OrderId> {
        let mut expired = Vec::new();
        let mut stale: HashMap<OrderId, Order> = HashMap::new();
        for entry in self.active.iter() {
            let order = entry.order;
            let age = now_tsc.saturating_sub(order.created_tsc);
            let should_expire = matches!(order.tif, Tif::Day | Tif::GTD) && age > day_horizon_ns;
            if should_expire && order.state.can_transition_to(OrderState::Expired) {
                stale.insert(*entry.key(), order);
            }
        }
        for (id, mut order) in stale {
            if order.transition(OrderState::Expired, now_tsc).is_ok() {
                self.active.remove(&id);
                self.audit.push(order);
                expired.push(id);
            }
        }
        expired
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn audit(&self) -> &AuditRing {
        &self.audit
    }
}
