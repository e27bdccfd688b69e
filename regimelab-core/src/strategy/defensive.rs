//! Defensive: small, rare bounce trades in bear regimes.

use serde::{Deserialize, Serialize};

use super::{CandleContext, EntryReason, EntrySignal, ExitSignal, SubStrategy};
use crate::domain::{ExitReason, Position, StrategyKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefensiveParams {
    pub rsi_extreme: f64,
    /// Fraction of the Kelly budget committed. Below 1.
    pub size_fraction: f64,
    pub rsi_exit: f64,
}

impl Default for DefensiveParams {
    fn default() -> Self {
        Self {
            rsi_extreme: 20.0,
            size_fraction: 0.5,
            rsi_exit: 45.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Defensive {
    pub params: DefensiveParams,
}

impl Defensive {
    pub fn new(params: DefensiveParams) -> Self {
        Self { params }
    }
}

impl SubStrategy for Defensive {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Defensive
    }

    fn check_entry(&self, ctx: &CandleContext<'_>) -> Option<EntrySignal> {
        (ctx.ind().rsi < self.params.rsi_extreme).then_some(EntrySignal {
            fraction: self.params.size_fraction,
            reason: EntryReason::ExtremeOversold,
        })
    }

    fn check_exit(&self, _position: &Position, ctx: &CandleContext<'_>) -> Option<ExitSignal> {
        (ctx.ind().rsi > self.params.rsi_exit).then(|| ExitSignal::full(ExitReason::SignalReversal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MarketState;
    use crate::strategy::test_support::{candle, position};

    #[test]
    fn extreme_rsi_enters_with_reduced_size() {
        let mut c = candle(0, 80.0);
        c.rsi = 12.0;
        let candles = vec![c];
        let ctx = CandleContext::new(&candles, 0, MarketState::BearStrong);
        let sig = Defensive::default().check_entry(&ctx).unwrap();
        assert_eq!(sig.reason, EntryReason::ExtremeOversold);
        assert!(sig.fraction < 1.0);
    }

    #[test]
    fn missing_rsi_never_enters() {
        let candles = vec![candle(0, 80.0)];
        let ctx = CandleContext::new(&candles, 0, MarketState::BearStrong);
        assert!(Defensive::default().check_entry(&ctx).is_none());
    }

    #[test]
    fn recovery_exits() {
        let mut c = candle(0, 85.0);
        c.rsi = 50.0;
        let candles = vec![c];
        let ctx = CandleContext::new(&candles, 0, MarketState::BearModerate);
        let pos = position(StrategyKind::Defensive);
        assert!(Defensive::default().check_exit(&pos, &ctx).is_some());
    }
}
