//! Simulation engine: one long-only account, one pass over the candles.
//!
//! The engine owns cash, the open [`Position`](crate::domain::Position), the
//! trade ledger and the equity curve. Everything decision-related goes
//! through the [`Strategy`] trait.

pub mod accounting;
pub mod loop_runner;
pub mod state;
pub mod strategy;

pub use accounting::{buy_fill, sell_fill, BuyFill, SellFill};
pub use loop_runner::run;
pub use state::{EngineConfig, EngineState, RunResult};
pub use strategy::{RegimeStrategy, Strategy};

use crate::config::{ConfigError, StrategyConfig};
use crate::domain::Candle;

/// Validate `config`, build its strategy and run it.
pub fn run_config(candles: &[Candle], config: &StrategyConfig) -> Result<RunResult, ConfigError> {
    let mut strategy = RegimeStrategy::new(config.clone())?;
    Ok(run(candles, &mut strategy, &EngineConfig::from(config)))
}
