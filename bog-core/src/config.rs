//! Runtime configuration (§6): everything that differs between a
//! deployment and a test run loads from a single TOML file rather than
//! being baked into the binary, following the teacher's existing
//! `serde`/`toml` usage for external data (audit dumps, snapshots).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

use crate::strategy::{MarketMakingParams, MeanReversionParams, MomentumParams, ScalpingParams};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read { path: String, #[source] source: std::io::Error },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("config invalid: {0}")]
    Invalid(String),
}

/// `worker_cores`: CPU ids for each pinned worker (§4.7, §5).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WorkerCoreConfig {
    pub ingress: usize,
    pub risk: usize,
    pub router: usize,
    pub supervisor: usize,
}

impl From<WorkerCoreConfig> for crate::supervisor::WorkerCores {
    fn from(c: WorkerCoreConfig) -> Self {
        crate::supervisor::WorkerCores { ingress: c.ingress, risk: c.risk, router: c.router, supervisor: c.supervisor }
    }
}

/// Tagged strategy parameter set, one variant per [`crate::strategy::Strategy`]
/// kind. Untagged by `kind` in TOML: `kind = "scalping"` etc.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StrategyParamsConfig {
    Scalping(ScalpingParams),
    Momentum(MomentumParams),
    MeanReversion(MeanReversionParams),
    MarketMaking(MarketMakingParams),
}

/// One entry of the `strategies` config list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    pub id: u32,
    pub capital: u64,
    #[serde(flatten)]
    pub params: StrategyParamsConfig,
    pub target_symbols: Vec<u32>,
    #[serde(default = "default_max_drawdown")]
    pub max_drawdown: f64,
    #[serde(default = "default_daily_loss_limit")]
    pub daily_loss_limit: i64,
}

fn default_max_drawdown() -> f64 {
    0.2
}

fn default_daily_loss_limit() -> i64 {
    i64::MAX
}

/// Full process configuration, matching the options enumerated in §6.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub worker_cores: WorkerCoreConfig,
    #[serde(default)]
    pub use_huge_pages: bool,
    pub max_orders_per_book: u32,
    pub max_levels_per_side: u32,
    pub tick_size_per_symbol: HashMap<u32, u64>,
    pub rate_limit_per_sec: u32,
    pub max_order_notional: u64,
    pub max_position_value: u64,
    pub kill_switch_drawdown: f64,
    pub kill_switch_daily_loss: u64,
    pub var_recompute_interval_ms: u32,
    pub strategies: Vec<StrategyConfig>,
    #[serde(default = "default_stall_threshold_ns")]
    pub stall_threshold_ns: u64,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub json_logs: bool,
    #[serde(default)]
    pub snapshot_path: Option<String>,
}

fn default_stall_threshold_ns() -> u64 {
    1_000_000_000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.display().to_string(), source })?;
        let config: Config = toml::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Sanity-checks that would otherwise surface later as confusing
    /// runtime rejections. Exit code `1` (§6 CLI) on failure.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_orders_per_book == 0 {
            return Err(ConfigError::Invalid("max_orders_per_book must be > 0".into()));
        }
        if self.max_levels_per_side == 0 {
            return Err(ConfigError::Invalid("max_levels_per_side must be > 0".into()));
        }
        if self.rate_limit_per_sec == 0 {
            return Err(ConfigError::Invalid("rate_limit_per_sec must be > 0".into()));
        }
        if !(0.0..=1.0).contains(&self.kill_switch_drawdown) {
            return Err(ConfigError::Invalid("kill_switch_drawdown must be in [0, 1]".into()));
        }
        let total_capital: u64 = self.strategies.iter().map(|s| s.capital).sum();
        if total_capital == 0 && !self.strategies.is_empty() {
            return Err(ConfigError::Invalid("strategies declared with zero total capital".into()));
        }
        let mut seen_ids = std::collections::HashSet::new();
        for s in &self.strategies {
            if !seen_ids.insert(s.id) {
                return Err(ConfigError::Invalid(format!("duplicate strategy id {}", s.id)));
            }
        }
        Ok(())
    }

    pub fn total_strategy_capital(&self) -> u64 {
        self.strategies.iter().map(|s| s.capital).sum()
    }
}
