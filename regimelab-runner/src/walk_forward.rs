//! Walk-forward validation: rolling, non-overlapping in-sample / out-of-sample folds.
//!
//! The usable series is cut into `n_folds` equal blocks. Each block is split
//! into an in-sample (IS) head and an out-of-sample (OOS) tail, so no candle
//! belongs to more than one window. Every window is run independently with the
//! same configuration; the IS/OOS return ratio of each fold gives a per-fold
//! overfitting verdict, and the mean returns give the aggregate verdict.
//!
//! Folds are evaluated in parallel with rayon.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use regimelab_core::domain::Candle;
use regimelab_core::StrategyConfig;

use crate::metrics::PerformanceMetrics;
use crate::overfit::{self, OverfitVerdict, DEFAULT_OVERFIT_THRESHOLD};
use crate::runner::{run_window, RunError};

// ─── Configuration ───────────────────────────────────────────────────

/// Configuration for walk-forward validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkForwardConfig {
    /// Number of folds (default 5).
    pub n_folds: usize,
    /// Share of each fold block used in-sample (default 0.7).
    pub is_fraction: f64,
    /// Minimum in-sample candles per fold (default 200).
    pub min_is_bars: usize,
    /// Minimum out-of-sample candles per fold (default 50).
    pub min_oos_bars: usize,
    /// Minimum acceptable OOS/IS return ratio (default 0.6).
    pub overfit_threshold: f64,
}

impl Default for WalkForwardConfig {
    fn default() -> Self {
        Self {
            n_folds: 5,
            is_fraction: 0.7,
            min_is_bars: 200,
            min_oos_bars: 50,
            overfit_threshold: DEFAULT_OVERFIT_THRESHOLD,
        }
    }
}

impl WalkForwardConfig {
    /// Candles needed to build every fold at the minimum sizes.
    pub fn min_total_bars(&self) -> usize {
        self.n_folds * (self.min_is_bars + self.min_oos_bars)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.n_folds == 0 {
            return Err("n_folds must be >= 1".into());
        }
        if !(self.is_fraction > 0.0 && self.is_fraction < 1.0) {
            return Err(format!("is_fraction must be in (0, 1), got {}", self.is_fraction));
        }
        if self.min_is_bars == 0 || self.min_oos_bars == 0 {
            return Err("min_is_bars and min_oos_bars must be >= 1".into());
        }
        if !self.overfit_threshold.is_finite() {
            return Err("overfit_threshold must be finite".into());
        }
        Ok(())
    }
}

// ─── Result types ────────────────────────────────────────────────────

/// Specification of a single walk-forward fold (candle index ranges).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoldSpec {
    pub fold_index: usize,
    /// In-sample start index (inclusive).
    pub is_start: usize,
    /// In-sample end index (exclusive).
    pub is_end: usize,
    /// Out-of-sample start index (inclusive).
    pub oos_start: usize,
    /// Out-of-sample end index (exclusive).
    pub oos_end: usize,
}

/// Result of a single fold evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoldResult {
    pub spec: FoldSpec,
    pub is_metrics: PerformanceMetrics,
    pub oos_metrics: PerformanceMetrics,
    pub verdict: OverfitVerdict,
}

/// How the Sharpe degradation ratio was computed (or why it wasn't).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DegradationFlag {
    /// IS Sharpe >= 0.1, ratio computed normally.
    Normal,
    /// IS Sharpe < 0.1, using difference metric (OOS - IS) instead.
    LowIsSharpe,
    /// IS Sharpe is negative, ratio skipped entirely.
    NegativeIsSharpe,
    /// IS Sharpe positive (>= 0.1) but OOS Sharpe negative: clamped to 0.0.
    FailedOos,
}

/// Complete result of walk-forward validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkForwardResult {
    pub folds: Vec<FoldResult>,
    pub mean_is_return: f64,
    pub mean_oos_return: f64,
    pub mean_is_sharpe: f64,
    pub mean_oos_sharpe: f64,
    /// Mean OOS Sharpe / mean IS Sharpe; see `degradation_flag`.
    pub sharpe_degradation: Option<f64>,
    pub degradation_flag: DegradationFlag,
    /// Folds whose own verdict is overfit.
    pub overfit_folds: usize,
    /// Verdict over the mean IS and OOS returns.
    pub verdict: OverfitVerdict,
}

/// Errors from walk-forward validation.
#[derive(Debug, Error)]
pub enum WalkForwardError {
    #[error("invalid walk-forward config: {0}")]
    InvalidConfig(String),
    #[error("insufficient data: {total_bars} candles < minimum {min_bars}")]
    InsufficientData { total_bars: usize, min_bars: usize },
    #[error("fold creation failed: cannot fit {n_folds} folds in {total_bars} candles")]
    FoldCreationFailed { n_folds: usize, total_bars: usize },
    #[error("backtest error on fold {fold}: {source}")]
    BacktestFailed {
        fold: usize,
        #[source]
        source: RunError,
    },
}

// ─── Fold creation ───────────────────────────────────────────────────

/// Create rolling, non-overlapping fold specifications.
///
/// With `block = total / n_folds`, fold `k` covers
/// `[offset + k*block, offset + (k+1)*block)`: the first
/// `round(block * is_fraction)` candles are IS, the rest OOS. The remainder
/// `offset = total % n_folds` is dropped from the front, so the last fold
/// ends on the most recent candle.
pub fn create_folds(
    total_bars: usize,
    config: &WalkForwardConfig,
) -> Result<Vec<FoldSpec>, WalkForwardError> {
    config.validate().map_err(WalkForwardError::InvalidConfig)?;
    let min_bars = config.min_total_bars();
    if total_bars < min_bars {
        return Err(WalkForwardError::InsufficientData {
            total_bars,
            min_bars,
        });
    }

    let block = total_bars / config.n_folds;
    let is_len = (block as f64 * config.is_fraction).round() as usize;
    let oos_len = block.saturating_sub(is_len);
    if is_len < config.min_is_bars || oos_len < config.min_oos_bars {
        return Err(WalkForwardError::FoldCreationFailed {
            n_folds: config.n_folds,
            total_bars,
        });
    }

    let offset = total_bars - block * config.n_folds;
    Ok((0..config.n_folds)
        .map(|k| {
            let is_start = offset + k * block;
            let is_end = is_start + is_len;
            FoldSpec {
                fold_index: k,
                is_start,
                is_end,
                oos_start: is_end,
                oos_end: is_start + block,
            }
        })
        .collect())
}

// ─── Execution ───────────────────────────────────────────────────────

/// Run walk-forward validation over enriched candles.
pub fn run_walk_forward(
    strategy: &StrategyConfig,
    candles: &[Candle],
    config: &WalkForwardConfig,
) -> Result<WalkForwardResult, WalkForwardError> {
    let folds = create_folds(candles.len(), config)?;

    let fold_results = folds
        .par_iter()
        .map(|spec| run_fold(strategy, candles, spec, config.overfit_threshold))
        .collect::<Result<Vec<_>, _>>()?;

    for f in &fold_results {
        info!(
            fold = f.spec.fold_index,
            is_return = f.verdict.in_sample_return,
            oos_return = f.verdict.out_of_sample_return,
            overfit = f.verdict.overfit,
            "walk-forward fold"
        );
    }

    Ok(compute_walk_forward_stats(fold_results, config.overfit_threshold))
}

fn run_fold(
    strategy: &StrategyConfig,
    candles: &[Candle],
    spec: &FoldSpec,
    threshold: f64,
) -> Result<FoldResult, WalkForwardError> {
    let fail = |source| WalkForwardError::BacktestFailed {
        fold: spec.fold_index,
        source,
    };
    let (_, is_metrics) = run_window(strategy, candles, spec.is_start, spec.is_end).map_err(fail)?;
    let (_, oos_metrics) =
        run_window(strategy, candles, spec.oos_start, spec.oos_end).map_err(fail)?;
    let verdict = overfit::check_metrics(&is_metrics, &oos_metrics, threshold);
    Ok(FoldResult {
        spec: *spec,
        is_metrics,
        oos_metrics,
        verdict,
    })
}

/// Aggregate fold results.
fn compute_walk_forward_stats(folds: Vec<FoldResult>, threshold: f64) -> WalkForwardResult {
    let mean = |f: fn(&FoldResult) -> f64| {
        if folds.is_empty() {
            0.0
        } else {
            folds.iter().map(f).sum::<f64>() / folds.len() as f64
        }
    };
    let mean_is_return = mean(|f| f.is_metrics.total_return);
    let mean_oos_return = mean(|f| f.oos_metrics.total_return);
    let mean_is_sharpe = mean(|f| f.is_metrics.sharpe);
    let mean_oos_sharpe = mean(|f| f.oos_metrics.sharpe);

    let (sharpe_degradation, degradation_flag) =
        compute_degradation_ratio(mean_is_sharpe, mean_oos_sharpe);
    let overfit_folds = folds.iter().filter(|f| f.verdict.overfit).count();

    WalkForwardResult {
        verdict: overfit::check(mean_is_return, mean_oos_return, threshold),
        folds,
        mean_is_return,
        mean_oos_return,
        mean_is_sharpe,
        mean_oos_sharpe,
        sharpe_degradation,
        degradation_flag,
        overfit_folds,
    }
}

/// Sharpe degradation ratio with edge case handling.
///
/// - IS >= 0.1: ratio = OOS / IS (Normal)
/// - IS < 0.1 and >= 0: difference = OOS - IS (LowIsSharpe)
/// - IS < 0: ratio skipped (NegativeIsSharpe)
/// - IS >= 0.1 but OOS < 0: clamped to 0.0 (FailedOos)
fn compute_degradation_ratio(
    mean_is_sharpe: f64,
    mean_oos_sharpe: f64,
) -> (Option<f64>, DegradationFlag) {
    if mean_is_sharpe < 0.0 {
        (None, DegradationFlag::NegativeIsSharpe)
    } else if mean_is_sharpe < 0.1 {
        (Some(mean_oos_sharpe - mean_is_sharpe), DegradationFlag::LowIsSharpe)
    } else if mean_oos_sharpe < 0.0 {
        (Some(0.0), DegradationFlag::FailedOos)
    } else {
        (Some(mean_oos_sharpe / mean_is_sharpe), DegradationFlag::Normal)
    }
}
