//! Backtest runner: wires together data loading, the engine and metrics.
//!
//! Entry points:
//! - `run_backtest()`: loads candles from the configured source, then runs. Used by the CLI.
//! - `run_on_candles()`: takes pre-loaded candles. Used by sweeps.
//! - `run_window()`: one run restricted to `[start, end)` of a longer series.
//!   Used by walk-forward folds.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use regimelab_core::domain::{Candle, Timeframe};
use regimelab_core::engine::{run, EngineConfig, RegimeStrategy};
use regimelab_core::{RunResult, StrategyConfig};

use crate::config::{BacktestConfig, ConfigError};
use crate::data_loader::{load, LoadError, LoadedData};
use crate::metrics::PerformanceMetrics;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("strategy config error: {0}")]
    Strategy(#[from] regimelab_core::ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("empty window [{start}, {end}) over {len} candles")]
    EmptyWindow { start: usize, end: usize, len: usize },
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of a single backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    /// BLAKE3 over the strategy fingerprint and the dataset hash.
    pub run_id: String,
    pub config_fingerprint: String,
    pub dataset_hash: String,
    pub strategy_name: String,
    pub timeframe: Timeframe,
    pub synthetic: bool,
    pub candle_count: usize,
    pub start_time: Option<NaiveDateTime>,
    pub end_time: Option<NaiveDateTime>,
    pub metrics: PerformanceMetrics,
    pub run: RunResult,
    pub config: StrategyConfig,
    pub data_quality_warnings: Vec<String>,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Load the configured candles and run the strategy over all of them.
pub fn run_backtest(config: &BacktestConfig) -> Result<BacktestResult, RunError> {
    config.validate()?;
    let loaded = load(
        &config.data,
        config.strategy.timeframe,
        &config.strategy.indicators,
    )?;
    run_loaded(&config.strategy, &loaded)
}

/// Run over already loaded candles, carrying their provenance.
pub fn run_loaded(
    strategy: &StrategyConfig,
    loaded: &LoadedData,
) -> Result<BacktestResult, RunError> {
    let mut result = run_on_candles(strategy, &loaded.candles, &loaded.dataset_hash)?;
    result.synthetic = loaded.synthetic;
    result.data_quality_warnings = loaded.data_quality_warnings.clone();
    Ok(result)
}

/// Run over pre-loaded, enriched candles. No I/O.
pub fn run_on_candles(
    strategy: &StrategyConfig,
    candles: &[Candle],
    dataset_hash: &str,
) -> Result<BacktestResult, RunError> {
    let (run, metrics) = evaluate(strategy, candles)?;
    let config_fingerprint = strategy.fingerprint();
    let run_id = blake3::hash(format!("{config_fingerprint}:{dataset_hash}").as_bytes())
        .to_hex()
        .to_string();

    info!(
        run_id = %&run_id[..12],
        trades = metrics.trade_count,
        total_return = metrics.total_return,
        sharpe = metrics.sharpe,
        "backtest finished"
    );

    Ok(BacktestResult {
        schema_version: SCHEMA_VERSION,
        run_id,
        config_fingerprint,
        dataset_hash: dataset_hash.to_string(),
        strategy_name: strategy.name.clone(),
        timeframe: strategy.timeframe,
        synthetic: false,
        candle_count: candles.len(),
        start_time: candles.first().map(|c| c.timestamp),
        end_time: candles.last().map(|c| c.timestamp),
        metrics,
        run,
        config: strategy.clone(),
        data_quality_warnings: Vec::new(),
    })
}

/// One full-series run plus its metrics.
pub fn evaluate(
    strategy: &StrategyConfig,
    candles: &[Candle],
) -> Result<(RunResult, PerformanceMetrics), RunError> {
    run_window(strategy, candles, 0, candles.len())
}

/// Run restricted to `candles[start..end]`.
///
/// Up to `effective_warmup()` candles before `start` are fed to the engine as context
/// (regime history, no trading) and then cut from the result, so the
/// equity curve and regimes cover exactly `[start, end)`. Trade indices stay
/// absolute positions in `candles`.
pub fn run_window(
    strategy: &StrategyConfig,
    candles: &[Candle],
    start: usize,
    end: usize,
) -> Result<(RunResult, PerformanceMetrics), RunError> {
    if start >= end || end > candles.len() {
        return Err(RunError::EmptyWindow {
            start,
            end,
            len: candles.len(),
        });
    }
    let mut engine_strategy = RegimeStrategy::new(strategy.clone())?;

    let warmup = strategy.effective_warmup();
    let context_start = start.saturating_sub(warmup);
    let lead = start - context_start;
    let engine_config = EngineConfig::new(strategy.execution.clone(), warmup.max(lead));

    let mut result = run(&candles[context_start..end], &mut engine_strategy, &engine_config);
    result.equity_curve.drain(..lead);
    result.regimes.drain(..lead);
    for t in &mut result.trades {
        t.entry_index += context_start;
        t.exit_index += context_start;
    }

    let metrics = PerformanceMetrics::compute(&result, strategy.timeframe.periods_per_year());
    Ok((result, metrics))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SyntheticConfig;
    use crate::data_loader::{generate_synthetic, prepare};

    fn candles(n: usize) -> Vec<Candle> {
        let config = SyntheticConfig {
            bars: n,
            ..SyntheticConfig::default()
        };
        let raw = generate_synthetic(&config, Timeframe::H1);
        prepare(raw, &Default::default(), true).candles
    }

    #[test]
    fn full_run_has_consistent_shape() {
        let candles = candles(1_200);
        let strategy = StrategyConfig::default();
        let result = run_on_candles(&strategy, &candles, "hash").unwrap();

        assert_eq!(result.schema_version, SCHEMA_VERSION);
        assert_eq!(result.candle_count, 1_200);
        assert_eq!(result.run.equity_curve.len(), 1_200);
        assert_eq!(result.metrics.trade_count, result.run.trades.len());
        assert_eq!(result.start_time, Some(candles[0].timestamp));
    }

    #[test]
    fn run_id_depends_on_data_and_config() {
        let candles = candles(300);
        let strategy = StrategyConfig::default();
        let a = run_on_candles(&strategy, &candles, "a").unwrap();
        let b = run_on_candles(&strategy, &candles, "b").unwrap();
        let mut other = strategy.clone();
        other.warmup = 50;
        let c = run_on_candles(&other, &candles, "a").unwrap();
        assert_ne!(a.run_id, b.run_id);
        assert_ne!(a.run_id, c.run_id);
        assert_eq!(a.config_fingerprint, b.config_fingerprint);
    }

    #[test]
    fn window_covers_exactly_the_requested_range() {
        let candles = candles(600);
        let strategy = StrategyConfig::default();
        let (run, _) = run_window(&strategy, &candles, 200, 400).unwrap();

        assert_eq!(run.equity_curve.len(), 200);
        assert_eq!(run.regimes.len(), 200);
        assert_eq!(run.equity_curve[0].timestamp, candles[200].timestamp);
        for t in &run.trades {
            assert!(t.entry_index >= 200 && t.exit_index < 400);
            assert_eq!(t.entry_time, candles[t.entry_index].timestamp);
        }
    }

    #[test]
    fn window_at_series_start_keeps_warmup() {
        let candles = candles(300);
        let strategy = StrategyConfig::default();
        let (run, _) = run_window(&strategy, &candles, 0, 300).unwrap();
        assert!(run.trades.iter().all(|t| t.entry_index >= strategy.warmup));
    }

    #[test]
    fn empty_window_is_an_error() {
        let candles = candles(100);
        let strategy = StrategyConfig::default();
        assert!(matches!(
            run_window(&strategy, &candles, 50, 50),
            Err(RunError::EmptyWindow { .. })
        ));
        assert!(run_window(&strategy, &candles, 0, 101).is_err());
    }

    #[test]
    fn invalid_strategy_is_reported() {
        let mut strategy = StrategyConfig::default();
        strategy.execution.fee_rate = 0.5;
        assert!(matches!(
            evaluate(&strategy, &candles(100)),
            Err(RunError::Strategy(_))
        ));
    }
}
