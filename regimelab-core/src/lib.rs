//! RegimeLab Core: domain types, indicators, regime classifier, sizing, exits,
//! strategy router and the simulation loop.
//!
//! Data flows one way:
//! candles → regime classifier → (Kelly sizer, exit planner, router) →
//! engine → trades + equity curve.
//!
//! - [`domain`]: candles, regimes, positions, trades, equity points
//! - [`indicators`]: fills missing indicator columns from OHLCV
//! - [`regime`]: pure market-state classifier
//! - [`sizing`]: dynamic Kelly fraction over recent trades
//! - [`exits`]: adaptive take-profit / stop-loss / trailing / timeout plan
//! - [`strategy`]: four regime-specific sub-strategies and their router
//! - [`engine`]: the single-account simulation loop
//! - [`config`]: the serde configuration tree and its validation

pub mod config;
pub mod domain;
pub mod engine;
pub mod exits;
pub mod indicators;
pub mod regime;
pub mod sizing;
pub mod strategy;

pub use config::{ConfigError, ExecutionConfig, StrategyConfig};
pub use engine::{run, run_config, EngineConfig, RegimeStrategy, RunResult, Strategy};
