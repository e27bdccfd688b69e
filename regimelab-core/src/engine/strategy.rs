//! The capability set the engine drives.

use crate::config::{ConfigError, StrategyConfig};
use crate::domain::{Candle, MarketState, Position, StrategyKind, Trade};
use crate::exits::{self, ExitPlan};
use crate::regime;
use crate::sizing;
use crate::strategy::{CandleContext, EntrySignal, ExitSignal, StrategyRouter};

/// Everything the engine asks of a strategy.
///
/// The engine owns the position and the ledger; a strategy only answers
/// questions about them. Mutable receivers let an implementation keep
/// per-run state (the router's active sub-strategy).
pub trait Strategy {
    fn classify_regime(&mut self, candles: &[Candle], index: usize) -> MarketState;

    fn check_entry(&mut self, ctx: &CandleContext<'_>) -> Option<(StrategyKind, EntrySignal)>;

    fn check_exit(&mut self, position: &Position, ctx: &CandleContext<'_>) -> Option<ExitSignal>;

    fn plan_exit(&self, entry_price: f64, candle: &Candle, regime: MarketState) -> ExitPlan;

    /// Kelly fraction of available cash for a new entry.
    fn size_position(&self, history: &[Trade], regime: MarketState) -> f64;
}

/// Regime classifier + Kelly sizer + adaptive exits + routed sub-strategies,
/// all driven by one [`StrategyConfig`].
#[derive(Debug, Clone)]
pub struct RegimeStrategy {
    config: StrategyConfig,
    router: StrategyRouter,
}

impl RegimeStrategy {
    pub fn new(config: StrategyConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let router = config.build_router();
        Ok(Self { config, router })
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    pub fn router(&self) -> &StrategyRouter {
        &self.router
    }
}

impl Strategy for RegimeStrategy {
    fn classify_regime(&mut self, candles: &[Candle], index: usize) -> MarketState {
        regime::classify_at(candles, index, &self.config.regime)
    }

    fn check_entry(&mut self, ctx: &CandleContext<'_>) -> Option<(StrategyKind, EntrySignal)> {
        self.router.check_entry(ctx)
    }

    fn check_exit(&mut self, position: &Position, ctx: &CandleContext<'_>) -> Option<ExitSignal> {
        self.router.check_exit(position, ctx)
    }

    fn plan_exit(&self, entry_price: f64, candle: &Candle, regime: MarketState) -> ExitPlan {
        exits::plan(
            entry_price,
            candle.indicators().atr,
            regime,
            self.config.timeframe,
            &self.config.exits,
        )
    }

    fn size_position(&self, history: &[Trade], regime: MarketState) -> f64 {
        sizing::size(history, regime, &self.config.kelly)
    }
}
