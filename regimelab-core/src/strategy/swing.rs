//! Swing: buy stochastic pullbacks in moderate bull regimes.

use serde::{Deserialize, Serialize};

use super::{crossed_above, CandleContext, EntryReason, EntrySignal, ExitSignal, SubStrategy};
use crate::domain::{ExitReason, Position, StrategyKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwingParams {
    /// %K must be below this when it crosses above %D.
    pub stoch_entry_max: f64,
    pub rsi_entry_max: f64,
    pub rsi_exit: f64,
    /// Fraction sold once when close reaches the upper band. 0 disables.
    pub partial_take_fraction: f64,
}

impl Default for SwingParams {
    fn default() -> Self {
        Self {
            stoch_entry_max: 40.0,
            rsi_entry_max: 60.0,
            rsi_exit: 70.0,
            partial_take_fraction: 0.5,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Swing {
    pub params: SwingParams,
}

impl Swing {
    pub fn new(params: SwingParams) -> Self {
        Self { params }
    }
}

impl SubStrategy for Swing {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Swing
    }

    fn check_entry(&self, ctx: &CandleContext<'_>) -> Option<EntrySignal> {
        let prev = ctx.prev_ind()?;
        let cur = ctx.ind();
        let cross = crossed_above(prev.stoch_k, prev.stoch_d, cur.stoch_k, cur.stoch_d);
        (cross && cur.stoch_k < self.params.stoch_entry_max && cur.rsi < self.params.rsi_entry_max)
            .then_some(EntrySignal {
                fraction: 1.0,
                reason: EntryReason::StochasticPullback,
            })
    }

    fn check_exit(&self, position: &Position, ctx: &CandleContext<'_>) -> Option<ExitSignal> {
        let cur = ctx.ind();
        if cur.rsi > self.params.rsi_exit {
            return Some(ExitSignal::full(ExitReason::SignalReversal));
        }
        let fraction = self.params.partial_take_fraction;
        if !position.partial_taken
            && fraction > 0.0
            && fraction < 1.0
            && ctx.candle().close >= cur.bb_upper
        {
            return Some(ExitSignal {
                fraction,
                reason: ExitReason::TakeProfit,
            });
        }
        None
    }
}
