//! Parameter sweeps and the optimizer objective.
//!
//! [`objective`] reduces one run to a scalar score; [`run_sweep`] scores every
//! variant of a base configuration in parallel and ranks them.

use std::fmt;
use std::str::FromStr;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::warn;

use regimelab_core::domain::Candle;
use regimelab_core::sizing::KellyDamping;
use regimelab_core::strategy::RegimeSwitchPolicy;
use regimelab_core::StrategyConfig;

use crate::metrics::PerformanceMetrics;
use crate::runner::{evaluate, RunError};

/// Metric a sweep optimizes (higher is better).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    #[default]
    Sharpe,
    Sortino,
    Calmar,
    TotalReturn,
    ProfitFactor,
    WinRate,
    /// Negated max drawdown, so shallower drawdowns score higher.
    Drawdown,
}

impl Metric {
    pub const ALL: [Metric; 7] = [
        Metric::Sharpe,
        Metric::Sortino,
        Metric::Calmar,
        Metric::TotalReturn,
        Metric::ProfitFactor,
        Metric::WinRate,
        Metric::Drawdown,
    ];

    pub fn score(self, m: &PerformanceMetrics) -> f64 {
        match self {
            Metric::Sharpe => m.sharpe,
            Metric::Sortino => m.sortino,
            Metric::Calmar => m.calmar,
            Metric::TotalReturn => m.total_return,
            Metric::ProfitFactor => m.profit_factor,
            Metric::WinRate => m.win_rate,
            Metric::Drawdown => -m.max_drawdown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Metric::Sharpe => "sharpe",
            Metric::Sortino => "sortino",
            Metric::Calmar => "calmar",
            Metric::TotalReturn => "total_return",
            Metric::ProfitFactor => "profit_factor",
            Metric::WinRate => "win_rate",
            Metric::Drawdown => "drawdown",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase().replace('-', "_");
        Metric::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| {
                let names: Vec<&str> = Metric::ALL.iter().map(|m| m.as_str()).collect();
                format!("unknown metric '{s}' (expected one of: {})", names.join(", "))
            })
    }
}

/// Score of one configuration, or the error that prevented a run.
pub fn try_objective(
    config: &StrategyConfig,
    candles: &[Candle],
    metric: Metric,
) -> Result<f64, RunError> {
    let (_, metrics) = evaluate(config, candles)?;
    Ok(metric.score(&metrics))
}

/// Scalar score for an external optimizer. Invalid configurations score `-∞`.
pub fn objective(config: &StrategyConfig, candles: &[Candle], metric: Metric) -> f64 {
    try_objective(config, candles, metric).unwrap_or_else(|e| {
        warn!(error = %e, "objective: run failed");
        f64::NEG_INFINITY
    })
}

// ─── Grid ───────────────────────────────────────────────────────────

/// Parameter grid: the cartesian product of every listed value.
///
/// An empty list keeps the base configuration's value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepGrid {
    pub kelly_damping: Vec<KellyDamping>,
    pub regime_switch_policy: Vec<RegimeSwitchPolicy>,
    pub kelly_max: Vec<f64>,
}

impl SweepGrid {
    /// Kelly damping × regime-switch policy.
    pub fn damping_by_policy() -> Self {
        Self {
            kelly_damping: vec![
                KellyDamping::Full,
                KellyDamping::Half,
                KellyDamping::Quarter,
            ],
            regime_switch_policy: vec![
                RegimeSwitchPolicy::KeepOriginal,
                RegimeSwitchPolicy::ForceExit,
            ],
            kelly_max: Vec::new(),
        }
    }

    /// Returns the total number of configurations in this grid.
    pub fn size(&self) -> usize {
        self.kelly_damping.len().max(1)
            * self.regime_switch_policy.len().max(1)
            * self.kelly_max.len().max(1)
    }

    /// Generates every labelled configuration in the grid.
    pub fn variants(&self, base: &StrategyConfig) -> Vec<SweepVariant> {
        let dampings = or_base(&self.kelly_damping, base.kelly.damping);
        let policies = or_base(&self.regime_switch_policy, base.router.regime_switch_policy);
        let maxes = or_base(&self.kelly_max, base.kelly.kelly_max);

        let mut variants = Vec::with_capacity(self.size());
        for &damping in &dampings {
            for &policy in &policies {
                for &kelly_max in &maxes {
                    let mut config = base.clone();
                    config.kelly.damping = damping;
                    config.router.regime_switch_policy = policy;
                    config.kelly.kelly_max = kelly_max;
                    let label =
                        format!("damping={damping:?} policy={policy:?} kelly_max={kelly_max}");
                    variants.push(SweepVariant { label, config });
                }
            }
        }
        variants
    }
}

fn or_base<T: Copy>(values: &[T], base: T) -> Vec<T> {
    if values.is_empty() {
        vec![base]
    } else {
        values.to_vec()
    }
}

/// One labelled configuration in a sweep.
#[derive(Debug, Clone)]
pub struct SweepVariant {
    pub label: String,
    pub config: StrategyConfig,
}

/// Ranked sweep entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepEntry {
    /// 1-based; failed variants rank last.
    pub rank: usize,
    pub label: String,
    pub fingerprint: String,
    pub score: f64,
    pub metrics: Option<PerformanceMetrics>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepResults {
    pub metric: Metric,
    pub entries: Vec<SweepEntry>,
}

impl SweepResults {
    pub fn best(&self) -> Option<&SweepEntry> {
        self.entries.iter().find(|e| e.error.is_none())
    }
}

/// Score every grid variant of `base` in parallel, best first.
pub fn run_sweep(
    base: &StrategyConfig,
    grid: &SweepGrid,
    candles: &[Candle],
    metric: Metric,
) -> SweepResults {
    rank_variants(grid.variants(base), candles, metric)
}

/// Score explicit variants in parallel, best first.
pub fn rank_variants(
    variants: Vec<SweepVariant>,
    candles: &[Candle],
    metric: Metric,
) -> SweepResults {
    let mut entries: Vec<SweepEntry> = variants
        .into_par_iter()
        .map(|v| {
            let fingerprint = v.config.fingerprint();
            match evaluate(&v.config, candles) {
                Ok((_, metrics)) => SweepEntry {
                    rank: 0,
                    label: v.label,
                    fingerprint,
                    score: metric.score(&metrics),
                    metrics: Some(metrics),
                    error: None,
                },
                Err(e) => {
                    warn!(label = %v.label, error = %e, "sweep variant failed");
                    SweepEntry {
                        rank: 0,
                        label: v.label,
                        fingerprint,
                        score: f64::NEG_INFINITY,
                        metrics: None,
                        error: Some(e.to_string()),
                    }
                }
            }
        })
        .collect();

    // Stable on ties, so grid order breaks them.
    entries.sort_by(|a, b| {
        a.error
            .is_some()
            .cmp(&b.error.is_some())
            .then_with(|| b.score.total_cmp(&a.score))
    });
    for (i, e) in entries.iter_mut().enumerate() {
        e.rank = i + 1;
    }
    SweepResults { metric, entries }
}
