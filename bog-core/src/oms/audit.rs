//! Bounded, append-only audit ring of terminal orders (§4.5, §6 "Audit
//! store"). Queryable by id or time range; oldest entries are evicted
//! once the ring fills, per the fixed capacity configured at startup.

use crate::core::types::{Order, OrderId};
use parking_lot::RwLock;
use std::collections::VecDeque;

pub struct AuditRing {
    capacity: usize,
    entries: RwLock<VecDeque<Order>>,
}

impl AuditRing {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: RwLock::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn push(&self, order: Order) {
        let mut entries = self.entries.write();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(order);
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn by_id(&self, order_id: OrderId) -> Option<Order> {
        self.entries.read().iter().find(|o| o.order_id == order_id).copied()
    }

    pub fn in_range(&self, t0: u64, t1: u64) -> Vec<Order> {
        self.entries
            .read()
            .iter()
            .filter(|o| o.last_update_tsc >= t0 && o.last_update_tsc <= t1)
            .copied()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{OrderState, OrderType, Side, Tif};

    fn order(id: u64, ts: u64) -> Order {
        Order {
            order_id: OrderId::new(id),
            symbol_id: 1,
            side: Side::Buy,
            state: OrderState::Filled,
            order_type: OrderType::Limit,
            tif: Tif::GTC,
            price: 100,
            quantity: 10,
            filled_qty: 10,
            created_tsc: 0,
            last_update_tsc: ts,
            strategy_id: 1,
            venue_id: 0,
            client_order_id: 0,
        }
    }

    #[test]
    fn evicts_oldest_beyond_capacity() {
        let ring = AuditRing::new(2);
        ring.push(order(1, 1));
        ring.push(order(2, 2));
        ring.push(order(3, 3));
        assert_eq!(ring.len(), 2);
        assert!(ring.by_id(OrderId::new(1)).is_none());
        assert!(ring.by_id(OrderId::new(3)).is_some());
    }

    #[test]
    fn range_query_filters_by_timestamp() {
        let ring = AuditRing::new(10);
        ring.push(order(1, 10));
        ring.push(order(2, 20));
        ring.push(order(3, 30));
        let hits = ring.in_range(15, 25);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].order_id, OrderId::new(2));
    }
}
