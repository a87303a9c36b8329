//! Parametric portfolio VaR (component E, rule 8). Recomputed at most
//! once per `recompute_interval`; cached between recomputes. See the VaR
//! calibration open-question decision in `DESIGN.md`: single-tail 95%
//! parametric VaR, `1.645 * sqrt(wᵀΣw)`, against a fixed per-session
//! covariance matrix.

use std::sync::Mutex;
use std::time::Duration;

/// 95% one-tailed z-score.
pub const Z_95: f64 = 1.645;
/// CVaR is modeled as a fixed multiple of VaR at this confidence level,
/// per the calibration decision — avoids a second, more expensive tail
/// integral on the hot path.
pub const CVAR_MULTIPLIER: f64 = 1.25;

/// Dense, symmetric covariance matrix over the symbol universe, indexed
/// in the same order as the position-weight vector passed to
/// [`VarEngine::recompute`]. Fixed for the session: recalibrating it is
/// an operator action, not something the hot path does.
#[derive(Debug, Clone)]
pub struct CovarianceMatrix {
    n: usize,
    data: Vec<f64>,
}

impl CovarianceMatrix {
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Self {
        let n = rows.len();
        let mut data = Vec::with_capacity(n * n);
        for row in &rows {
            assert_eq!(row.len(), n, "covariance matrix must be square");
            data.extend_from_slice(row);
        }
        Self { n, data }
    }

    pub fn identity(n: usize, variance: f64) -> Self {
        let mut data = vec![0.0; n * n];
        for i in 0..n {
            data[i * n + i] = variance;
        }
        Self { n, data }
    }

    fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.n + j]
    }

    /// `wᵀΣw` for a weight vector of length `n`.
    fn quadratic_form(&self, w: &[f64]) -> f64 {
        debug_assert_eq!(w.len(), self.n);
        let mut total = 0.0;
        for i in 0..self.n {
            let mut row_sum = 0.0;
            for j in 0..self.n {
                row_sum += self.get(i, j) * w[j];
            }
            total += w[i] * row_sum;
        }
        total
    }

    pub fn dim(&self) -> usize {
        self.n
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VarResult {
    pub var: f64,
    pub cvar: f64,
    pub computed_at_tsc: u64,
}

struct Cache {
    last: Option<VarResult>,
}

/// Computes and caches parametric VaR against a fixed covariance matrix.
/// `check_order` calls [`VarEngine::incremental_delta`] to approximate the
/// VaR impact of a proposed position change without a full matrix
/// evaluation; [`VarEngine::recompute`] does the full evaluation on its
/// own schedule.
pub struct VarEngine {
    covariance: CovarianceMatrix,
    recompute_interval: Duration,
    cache: Mutex<Cache>,
}

impl VarEngine {
    pub fn new(covariance: CovarianceMatrix, recompute_interval: Duration) -> Self {
        Self {
            covariance,
            recompute_interval,
            cache: Mutex::new(Cache { last: None }),
        }
    }

    fn compute(&self, weights: &[f64]) -> VarResult {
        let variance = self.covariance.quadratic_form(weights);
        let var = Z_95 * variance.max(0.0).sqrt();
        VarResult { var, cvar: var * CVAR_MULTIPLIER, computed_at_tsc: 0 }
    }

    /// Recompute if `now_tsc` is at least `recompute_interval` past the
    /// last cached computation, else return the cached value. `weights`
    /// is the current position vector expressed as portfolio-value
    /// weights, same order as the covariance matrix rows.
    pub fn recompute(&self, weights: &[f64], now_tsc: u64, tsc_hz: u64) -> VarResult {
        let interval_tsc = (self.recompute_interval.as_secs_f64() * tsc_hz as f64) as u64;
        let mut cache = self.cache.lock().unwrap();
        let needs_recompute = match cache.last {
            Some(prev) => now_tsc.saturating_sub(prev.computed_at_tsc) >= interval_tsc,
            None => true,
        };
        if needs_recompute {
            let mut result = self.compute(weights);
            result.computed_at_tsc = now_tsc;
            cache.last = Some(result);
            result
        } else {
            cache.last.unwrap()
        }
    }

    pub fn cached(&self) -> Option<VarResult> {
        self.cache.lock().unwrap().last
    }

    /// Approximate `Δ(wᵀΣw)` for a proposed weight vector without waiting
    /// for the next scheduled full recompute — the cheap check
    /// `check_order` uses inline. Proposed and current vectors must be the
    /// same length as the covariance matrix's dimension.
    pub fn incremental_delta(&self, current: &[f64], proposed: &[f64]) -> f64 {
        let current_var = Z_95 * self.covariance.quadratic_form(current).max(0.0).sqrt();
        let proposed_var = Z_95 * self.covariance.quadratic_form(proposed).max(0.0).sqrt();
        proposed_var - current_var
    }

    pub fn dim(&self) -> usize {
        self.covariance.dim()
    }
}
