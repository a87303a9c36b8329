//! In-memory reference implementations of the edge traits, used by tests
//! and the `probe` CLI subcommand to exercise the core without a live
//! venue connection.

use super::{MarketDataIngress, Packet, SubmitOutcome, VenueEgress, VenueOrder};
use crate::oms::ExecutionReport;
use std::collections::VecDeque;

/// Replays a fixed, pre-recorded packet sequence — deterministic, so
/// strategy behavior against it is reproducible run to run.
#[derive(Default)]
pub struct ReplayIngress {
    queue: VecDeque<Packet>,
}

impl ReplayIngress {
    pub fn new(packets: Vec<Packet>) -> Self {
        Self { queue: packets.into() }
    }

    pub fn push(&mut self, packet: Packet) {
        self.queue.push_back(packet);
    }
}

impl MarketDataIngress for ReplayIngress {
    fn recv_burst(&mut self, buf: &mut [Packet]) -> usize {
        let mut n = 0;
        while n < buf.len() {
            match self.queue.pop_front() {
                Some(p) => {
                    buf[n] = p;
                    n += 1;
                }
                None => break,
            }
        }
        n
    }
}

/// Always accepts orders and never produces execution reports on its
/// own; tests drive fills by pushing reports directly.
pub struct SimulatedVenue {
    next_venue_order_id: u64,
    pending_reports: VecDeque<ExecutionReport>,
}

impl Default for SimulatedVenue {
    fn default() -> Self {
        Self { next_venue_order_id: 1, pending_reports: VecDeque::new() }
    }
}

impl SimulatedVenue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue_report(&mut self, report: ExecutionReport) {
        self.pending_reports.push_back(report);
    }
}

impl VenueEgress for SimulatedVenue {
    fn submit(&mut self, _order: &VenueOrder) -> SubmitOutcome {
        let id = self.next_venue_order_id;
        self.next_venue_order_id += 1;
        SubmitOutcome::Accepted { venue_order_id: id }
    }

    fn poll_reports(&mut self, buf: &mut [ExecutionReport]) -> usize {
        let mut n = 0;
        while n < buf.len() {
            match self.pending_reports.pop_front() {
                Some(r) => {
                    buf[n] = r;
                    n += 1;
                }
                None => break,
            }
        }
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{OrderId, Side};

    #[test]
    fn replay_ingress_drains_in_order() {
        let mut ingress = ReplayIngress::new(vec![
            Packet { hardware_ts: 1, symbol_id: 1, payload: vec![] },
            Packet { hardware_ts: 2, symbol_id: 1, payload: vec![] },
        ]);
        let mut buf = vec![Packet { hardware_ts: 0, symbol_id: 0, payload: vec![] }; 1];
        assert_eq!(ingress.recv_burst(&mut buf), 1);
        assert_eq!(buf[0].hardware_ts, 1);
        assert_eq!(ingress.recv_burst(&mut buf), 1);
        assert_eq!(buf[0].hardware_ts, 2);
        assert_eq!(ingress.recv_burst(&mut buf), 0);
    }

    #[test]
    fn simulated_venue_always_accepts() {
        let mut venue = SimulatedVenue::new();
        let order = VenueOrder { order_id: OrderId::new(1), symbol_id: 1, side: Side::Buy, price: 100, quantity: 10 };
        assert!(matches!(venue.submit(&order), SubmitOutcome::Accepted { .. }));
    }
}
