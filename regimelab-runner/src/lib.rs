//! RegimeLab Runner: candle loading, metrics, overfitting checks,
//! walk-forward validation, sweeps and export.
//!
//! This crate builds on `regimelab-core` to provide:
//! - Data loading from CSV or deterministic synthetic candles, with enrichment
//! - Single-run orchestration with run fingerprinting
//! - Performance metrics and the in-sample / out-of-sample overfitting verdict
//! - Rolling walk-forward validation and parameter sweeps (parallel, rayon)
//! - JSON and CSV artifacts

pub mod config;
pub mod data_loader;
pub mod export;
pub mod metrics;
pub mod overfit;
pub mod runner;
pub mod sweep;
pub mod walk_forward;

pub use config::{BacktestConfig, ConfigError, DataConfig, SyntheticConfig};
pub use data_loader::{load, LoadError, LoadedData};
pub use metrics::PerformanceMetrics;
pub use overfit::{OverfitVerdict, DEFAULT_OVERFIT_THRESHOLD};
pub use runner::{
    evaluate, run_backtest, run_loaded, run_on_candles, run_window, BacktestResult, RunError,
    SCHEMA_VERSION,
};
pub use sweep::{objective, run_sweep, Metric, SweepGrid, SweepResults};
pub use walk_forward::{
    run_walk_forward, DegradationFlag, WalkForwardConfig, WalkForwardError, WalkForwardResult,
};
