//! Supervisor (component J): owns the worker thread set, starts and stops
//! components in dependency order, pins workers to configured cores, and
//! watches health probes for degraded conditions (§4.7, §7).
//!
//! The supervisor does not itself run strategy or risk logic; it is the
//! one place in the process allowed to block on I/O (snapshot load/save,
//! probe reporting) and the one place that escalates the kill switch on
//! conditions workers can't see in aggregate.

use crate::perf::cpu::{pin_to_core, set_realtime_priority};
use crate::risk::kill_switch::{KillSwitch, KillSwitchLevel, KillSwitchTrigger};
use crate::snapshot::{self, Snapshot};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// One worker's declared place in the dependency graph. Startup proceeds
/// leaves first (ingress before risk before router, supervisor last);
/// shutdown reverses the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WorkerRole {
    Ingress,
    Risk,
    Router,
    Supervisor,
}

const STARTUP_ORDER: [WorkerRole; 4] =
    [WorkerRole::Ingress, WorkerRole::Risk, WorkerRole::Router, WorkerRole::Supervisor];

/// CPU core assignment per worker role, the `worker_cores` config option.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkerCores {
    pub ingress: usize,
    pub risk: usize,
    pub router: usize,
    pub supervisor: usize,
}

impl WorkerCores {
    fn core_for(&self, role: WorkerRole) -> usize {
        match role {
            WorkerRole::Ingress => self.ingress,
            WorkerRole::Risk => self.risk,
            WorkerRole::Router => self.router,
            WorkerRole::Supervisor => self.supervisor,
        }
    }
}

/// Per-worker liveness counters, updated by the worker itself and read by
/// the supervisor's health loop. Cheap atomics rather than a channel: the
/// health loop polls rather than participating in the hot path.
#[derive(Default)]
pub struct WorkerHealth {
    pub queue_depth: AtomicU64,
    pub dropped: AtomicU64,
    pub last_tick_ns: AtomicU64,
}

impl WorkerHealth {
    pub fn mark_tick(&self, now_ns: u64) {
        self.last_tick_ns.store(now_ns, Ordering::Relaxed);
    }

    pub fn set_queue_depth(&self, depth: u64) {
        self.queue_depth.store(depth, Ordering::Relaxed);
    }

    pub fn record_drop(&self, count: u64) {
        self.dropped.fetch_add(count, Ordering::Relaxed);
    }
}

/// Snapshot of one worker's health, as returned by a probe.
#[derive(Debug, Clone, Copy)]
pub struct HealthReport {
    pub role: WorkerRole,
    pub queue_depth: u64,
    pub dropped: u64,
    pub ns_since_last_tick: u64,
    pub stalled: bool,
}

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("failed to pin worker {role:?} to core {core}")]
    PinFailed { role: WorkerRole, core: usize },
    #[error("snapshot error: {0}")]
    Snapshot(#[from] crate::core::errors::SnapshotError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Owns the kill switch handle and per-worker health state; drives
/// startup/shutdown order, CPU pinning, health evaluation, and snapshot
/// hydrate/persist.
pub struct Supervisor {
    kill_switch: Arc<KillSwitch>,
    cores: WorkerCores,
    health: Vec<(WorkerRole, Arc<WorkerHealth>)>,
    running: Arc<AtomicBool>,
    stall_threshold_ns: u64,
}

impl Supervisor {
    pub fn new(kill_switch: Arc<KillSwitch>, cores: WorkerCores, stall_threshold_ns: u64) -> Self {
        Self {
            kill_switch,
            cores,
            health: Vec::new(),
            running: Arc::new(AtomicBool::new(false)),
            stall_threshold_ns,
        }
    }

    pub fn running_flag(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    /// Register a worker's health handle, keyed by its role. Startup pins
    /// the calling thread for whichever worker registers; actual thread
    /// spawning is left to the binary wiring these roles to closures.
    pub fn register(&mut self, role: WorkerRole, health: Arc<WorkerHealth>) {
        self.health.push((role, health));
    }

    /// Pin the current thread (must be called from inside the worker's own
    /// thread) to its configured core and raise it to real-time priority.
    /// Called once per worker, in [`STARTUP_ORDER`].
    pub fn pin_current_thread(&self, role: WorkerRole, priority: i32) -> Result<(), SupervisorError> {
        let core = self.cores.core_for(role);
        pin_to_core(core).map_err(|_| SupervisorError::PinFailed { role, core })?;
        let _ = set_realtime_priority(priority);
        Ok(())
    }

    pub fn startup_order() -> &'static [WorkerRole] {
        &STARTUP_ORDER
    }

    pub fn shutdown_order() -> Vec<WorkerRole> {
        let mut order = STARTUP_ORDER.to_vec();
        order.reverse();
        order
    }

    pub fn start(&self) {
        self.running.store(true, Ordering::SeqCst);
    }

    /// Signal every worker to stop. Workers observe this within one
    /// polling iteration and drain their queues before exiting; the
    /// supervisor itself does not block here.
    pub fn request_shutdown(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Poll every registered worker's health, flagging any whose last
    /// recorded tick is older than the configured stall threshold.
    pub fn probe(&self, now_ns: u64) -> Vec<HealthReport> {
        self.health
            .iter()
            .map(|(role, h)| {
                let last_tick = h.last_tick_ns.load(Ordering::Relaxed);
                let ns_since_last_tick = now_ns.saturating_sub(last_tick);
                HealthReport {
                    role: *role,
                    queue_depth: h.queue_depth.load(Ordering::Relaxed),
                    dropped: h.dropped.load(Ordering::Relaxed),
                    ns_since_last_tick,
                    stalled: ns_since_last_tick > self.stall_threshold_ns,
                }
            })
            .collect()
    }

    /// Evaluate health reports against degraded-mode conditions (§7): a
    /// stalled worker, or any worker's drop count over `drop_threshold`,
    /// escalates the kill switch to `ReduceOnly`. Returns `true` if an
    /// escalation occurred this call.
    pub fn evaluate_degraded_mode(&self, reports: &[HealthReport], drop_threshold: u64) -> bool {
        let degraded = reports.iter().any(|r| r.stalled || r.dropped > drop_threshold);
        if degraded {
            self.kill_switch.raise_to(KillSwitchLevel::ReduceOnly, KillSwitchTrigger::DegradedMode);
        }
        degraded
    }

    /// Fatal invariant violation: advance the kill switch to
    /// `EmergencyStop`. The caller (wherever the violation was detected)
    /// is responsible for flushing the audit log and exiting afterward.
    pub fn escalate_fatal(&self) {
        self.kill_switch.raise_to(KillSwitchLevel::EmergencyStop, KillSwitchTrigger::OperatorCommand);
    }

    pub fn kill_switch(&self) -> &Arc<KillSwitch> {
        &self.kill_switch
    }

    /// Build a snapshot from current position and open-order state and
    /// write it to `path`.
    pub fn persist_snapshot(
        &self,
        path: &std::path::Path,
        session_id: u64,
        positions: &crate::position::PositionStore,
        open_orders: Vec<crate::core::types::Order>,
    ) -> Result<(), SupervisorError> {
        let snap = Snapshot { session_id, positions: positions.iter_snapshots(), open_orders };
        let bytes = snapshot::encode(&snap);
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// Hydrate positions (and return open orders for the OMS to resume)
    /// from a snapshot file. Corrupt or unreadable snapshots are a fatal
    /// startup condition (§7), surfaced to the caller rather than masked.
    pub fn hydrate_snapshot(
        &self,
        path: &std::path::Path,
        positions: &crate::position::PositionStore,
    ) -> Result<Vec<crate::core::types::Order>, SupervisorError> {
        let bytes = std::fs::read(path)?;
        let snap = snapshot::decode(&bytes)?;
        for p in &snap.positions {
            positions.restore(p);
        }
        Ok(snap.open_orders)
    }

    pub fn poll_interval() -> Duration {
        Duration::from_millis(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::PositionStore;

    fn supervisor() -> Supervisor {
        Supervisor::new(Arc::new(KillSwitch::new()), WorkerCores::default(), 1_000_000_000)
    }

    #[test]
    fn startup_and_shutdown_orders_are_reverses() {
        let mut shutdown = Supervisor::shutdown_order();
        shutdown.reverse();
        assert_eq!(shutdown, Supervisor::startup_order());
    }

    #[test]
    fn stalled_worker_is_flagged_and_escalates() {
        let sup = supervisor();
        let health = Arc::new(WorkerHealth::default());
        health.mark_tick(0);
        let mut sup = sup;
        sup.register(WorkerRole::Ingress, health);
        let reports = sup.probe(2_000_000_000);
        assert!(reports[0].stalled);
        assert!(sup.evaluate_degraded_mode(&reports, u64::MAX));
        assert_eq!(sup.kill_switch().level(), KillSwitchLevel::ReduceOnly);
    }

    #[test]
    fn healthy_worker_does_not_escalate() {
        let sup = supervisor();
        let health = Arc::new(WorkerHealth::default());
        health.mark_tick(1_000);
        let mut sup = sup;
        sup.register(WorkerRole::Risk, health);
        let reports = sup.probe(1_500);
        assert!(!reports[0].stalled);
        assert!(!sup.evaluate_degraded_mode(&reports, u64::MAX));
        assert_eq!(sup.kill_switch().level(), KillSwitchLevel::None);
    }

    #[test]
    fn snapshot_round_trips_through_supervisor() {
        let sup = supervisor();
        let positions = PositionStore::new();
        let pos = positions.get_or_insert(1);
        pos.apply_fill(crate::core::types::Side::Buy, 10, 100, 0);

        let dir = std::env::temp_dir();
        let path = dir.join(format!("bog_supervisor_test_{}.snap", std::process::id()));
        sup.persist_snapshot(&path, 7, &positions, vec![]).unwrap();

        let restored = PositionStore::new();
        let orders = sup.hydrate_snapshot(&path, &restored).unwrap();
        assert!(orders.is_empty());
        assert_eq!(restored.get(1).unwrap().snapshot().net_qty, 10);

        let _ = std::fs::remove_file(&path);
    }
}
