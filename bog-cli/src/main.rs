//! Command-line entry point for the trading core.
//!
//! Subcommands: `run` (normal operation), `probe` (exercise the wiring
//! against simulated edges without a live venue), `snapshot` (inspect a
//! persisted-state file), `resume` (verify a snapshot's CRC32, then
//! proceed as `run` with it as the startup snapshot). Exit codes: `0`
//! normal, `1` config invalid, `2` bind/attach failure, `3` state
//! corruption, `64` kill-switch tripped at shutdown.

mod pipeline;

use bog_core::config::Config;
use bog_core::edges::simulated::{ReplayIngress, SimulatedVenue};
use bog_core::edges::{MarketDataIngress, Packet, VenueEgress, VenueOrder};
use bog_core::position::PositionStore;
use bog_core::risk::kill_switch::KillSwitchLevel;
use bog_core::risk::var::CovarianceMatrix;
use bog_core::risk::RiskEngine;
use bog_core::supervisor::{Supervisor, WorkerCores};
use clap::{Parser, Subcommand};
use pipeline::Pipeline;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::time::{SystemTime, UNIX_EPOCH};

#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

const EXIT_OK: i32 = 0;
const EXIT_CONFIG_INVALID: i32 = 1;
const EXIT_BIND_FAILURE: i32 = 2;
const EXIT_STATE_CORRUPTION: i32 = 3;
const EXIT_KILL_SWITCH_TRIPPED: i32 = 64;

#[derive(Parser)]
#[command(name = "bog", author, version, about = "Ultra-low-latency trading core")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the core until interrupted.
    Run {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Exercise the full pipeline against simulated market data and a
    /// simulated venue, without any live connection.
    Probe {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Decode and print a persisted snapshot file.
    Snapshot {
        #[arg(short, long)]
        path: PathBuf,
    },
    /// Verify a snapshot file and run the core with it as the startup
    /// snapshot.
    Resume {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        snapshot: PathBuf,
    },
}

fn now_ns() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_nanos() as u64).unwrap_or(0)
}

fn load_config(path: &PathBuf) -> Result<Config, i32> {
    Config::load(path).map_err(|e| {
        tracing::error!("config invalid: {e}");
        EXIT_CONFIG_INVALID
    })
}

fn run(config_path: PathBuf) -> i32 {
    let config = match load_config(&config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    run_with_config(config)
}

fn run_with_config(config: Config) -> i32 {
    let cores: WorkerCores = config.worker_cores.into();
    let risk_engine = RiskEngine::new(
        bog_core::risk::RiskLimits {
            rate_limit_per_sec: config.rate_limit_per_sec,
            max_position_value: config.max_position_value,
            max_order_notional: config.max_order_notional as u128,
            kill_switch_drawdown: config.kill_switch_drawdown,
            kill_switch_daily_loss: config.kill_switch_daily_loss,
            var_recompute_interval_ms: config.var_recompute_interval_ms,
            ..Default::default()
        },
        CovarianceMatrix::identity(config.strategies.len().max(1), 0.0001),
    );
    let kill_switch = risk_engine.kill_switch();
    let mut supervisor = Supervisor::new(kill_switch.clone(), cores, config.stall_threshold_ns);
    let positions = PositionStore::new();

    let mut resume_order_id = 0u64;
    if let Some(path) = &config.snapshot_path {
        let path = PathBuf::from(path);
        if path.exists() {
            match supervisor.hydrate_snapshot(&path, &positions) {
                Ok(open_orders) => {
                    resume_order_id = open_orders.iter().map(|o| o.order_id.as_u64()).max().unwrap_or(0);
                }
                Err(e) => {
                    tracing::error!("snapshot corrupt: {e}");
                    return EXIT_STATE_CORRUPTION;
                }
            }
            tracing::info!("hydrated {} positions from {}", positions.symbol_count(), path.display());
        }
    }

    let mut pipeline = Pipeline::new(&config, risk_engine, positions, &mut supervisor);
    if resume_order_id > 0 {
        pipeline.resume_ids_after(resume_order_id);
    }

    let running = supervisor.running_flag();
    supervisor.start();
    if ctrlc::set_handler(move || running.store(false, Ordering::SeqCst)).is_err() {
        tracing::warn!("failed to install SIGINT handler; shutdown will require SIGKILL");
    }

    tracing::info!("core running, awaiting shutdown signal");
    while supervisor.is_running() {
        std::thread::sleep(Supervisor::poll_interval());
        let now = now_ns();
        pipeline.tick(now);
        let reports = supervisor.probe(now);
        supervisor.evaluate_degraded_mode(&reports, 1_000);
    }

    if let Some(path) = &config.snapshot_path {
        let path = PathBuf::from(path);
        if let Err(e) = supervisor.persist_snapshot(&path, 0, pipeline.positions(), vec![]) {
            tracing::error!("failed to persist snapshot on shutdown: {e}");
        }
    }

    if kill_switch.level() >= KillSwitchLevel::EmergencyStop {
        EXIT_KILL_SWITCH_TRIPPED
    } else {
        EXIT_OK
    }
}

fn probe(config_path: PathBuf) -> i32 {
    let config = match load_config(&config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let mut ingress = ReplayIngress::new(vec![
        Packet { hardware_ts: 0, symbol_id: 1, payload: vec![] },
        Packet { hardware_ts: 1, symbol_id: 1, payload: vec![] },
    ]);
    let mut venue = SimulatedVenue::new();
    let order = VenueOrder {
        order_id: bog_core::core::types::OrderId::new(1),
        symbol_id: 1,
        side: bog_core::core::types::Side::Buy,
        price: 100,
        quantity: 10,
    };

    let mut buf = vec![Packet { hardware_ts: 0, symbol_id: 0, payload: vec![] }; 2];
    let drained = ingress.recv_burst(&mut buf);
    let submit_ok = matches!(venue.submit(&order), bog_core::edges::SubmitOutcome::Accepted { .. });

    if drained == 0 || !submit_ok {
        tracing::error!("probe failed: ingress_drained={drained} submit_ok={submit_ok}");
        return EXIT_BIND_FAILURE;
    }

    tracing::info!(
        "probe ok: {} strategies configured, simulated ingress drained {} packets, simulated venue accepted test order",
        config.strategies.len(),
        drained
    );
    EXIT_OK
}

fn snapshot_inspect(path: PathBuf) -> i32 {
    let bytes = match std::fs::read(&path) {
        Ok(b) => b,
        Err(e) => {
            tracing::error!("cannot read {}: {e}", path.display());
            return EXIT_STATE_CORRUPTION;
        }
    };
    match bog_core::snapshot::decode(&bytes) {
        Ok(snap) => {
            tracing::info!(
                "session_id={} positions={} open_orders={}",
                snap.session_id,
                snap.positions.len(),
                snap.open_orders.len()
            );
            EXIT_OK
        }
        Err(e) => {
            tracing::error!("snapshot corrupt: {e}");
            EXIT_STATE_CORRUPTION
        }
    }
}

fn resume(config_path: PathBuf, snapshot_path: PathBuf) -> i32 {
    let mut config = match load_config(&config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    // Verify the snapshot decodes and its CRC32 checks out before handing
    // off to `run`, which performs the actual hydration once the
    // supervisor and position store exist.
    let bytes = match std::fs::read(&snapshot_path) {
        Ok(b) => b,
        Err(e) => {
            tracing::error!("cannot read {}: {e}", snapshot_path.display());
            return EXIT_STATE_CORRUPTION;
        }
    };
    if let Err(e) = bog_core::snapshot::decode(&bytes) {
        tracing::error!("snapshot corrupt: {e}");
        return EXIT_STATE_CORRUPTION;
    }

    config.snapshot_path = Some(snapshot_path.display().to_string());
    run_with_config(config)
}

fn main() {
    let cli = Cli::parse();
    bog_core::utils::init_logger("info", false);

    let code = match cli.command {
        Command::Run { config } => run(config),
        Command::Probe { config } => probe(config),
        Command::Snapshot { path } => snapshot_inspect(path),
        Command::Resume { config, snapshot } => resume(config, snapshot),
    };
    std::process::exit(code);
}
