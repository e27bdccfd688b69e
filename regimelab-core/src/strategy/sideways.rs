//! Sideways: mean reversion inside the Bollinger range.

use serde::{Deserialize, Serialize};

use super::{crossed_above, CandleContext, EntryReason, EntrySignal, ExitSignal, SubStrategy};
use crate::domain::{ExitReason, Position, StrategyKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SidewaysParams {
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    pub stoch_oversold: f64,
}

impl Default for SidewaysParams {
    fn default() -> Self {
        Self {
            rsi_oversold: 30.0,
            rsi_overbought: 70.0,
            stoch_oversold: 20.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Sideways {
    pub params: SidewaysParams,
}

impl Sideways {
    pub fn new(params: SidewaysParams) -> Self {
        Self { params }
    }
}

impl SubStrategy for Sideways {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Sideways
    }

    fn check_entry(&self, ctx: &CandleContext<'_>) -> Option<EntrySignal> {
        let cur = ctx.ind();
        let close = ctx.candle().close;
        let entry = |reason| EntrySignal {
            fraction: 1.0,
            reason,
        };

        if cur.rsi < self.params.rsi_oversold && close <= cur.bb_lower {
            return Some(entry(EntryReason::OversoldBand));
        }
        let prev = ctx.prev_ind()?;
        let cross = crossed_above(prev.stoch_k, prev.stoch_d, cur.stoch_k, cur.stoch_d);
        (cross && cur.stoch_k < self.params.stoch_oversold)
            .then(|| entry(EntryReason::StochasticOversold))
    }

    fn check_exit(&self, _position: &Position, ctx: &CandleContext<'_>) -> Option<ExitSignal> {
        let cur = ctx.ind();
        if ctx.candle().close >= cur.bb_upper {
            return Some(ExitSignal::full(ExitReason::TakeProfit));
        }
        (cur.rsi > self.params.rsi_overbought).then(|| ExitSignal::full(ExitReason::SignalReversal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Candle, MarketState};
    use crate::strategy::test_support::{candle, position};

    fn banded(i: usize, close: f64, rsi: f64) -> Candle {
        let mut c = candle(i, close);
        c.rsi = rsi;
        c.bb_lower = 95.0;
        c.bb_middle = 100.0;
        c.bb_upper = 105.0;
        c.stoch_k = 50.0;
        c.stoch_d = 50.0;
        c
    }

    #[test]
    fn oversold_at_lower_band_enters() {
        let candles = vec![banded(0, 94.0, 25.0)];
        let ctx = CandleContext::new(&candles, 0, MarketState::SidewaysFlat);
        let sig = Sideways::default().check_entry(&ctx).unwrap();
        assert_eq!(sig.reason, EntryReason::OversoldBand);
    }

    #[test]
    fn oversold_inside_band_waits() {
        let candles = vec![banded(0, 98.0, 25.0)];
        let ctx = CandleContext::new(&candles, 0, MarketState::SidewaysFlat);
        assert!(Sideways::default().check_entry(&ctx).is_none());
    }

    #[test]
    fn stochastic_cross_in_oversold_zone_enters() {
        let mut a = banded(0, 98.0, 40.0);
        a.stoch_k = 8.0;
        a.stoch_d = 12.0;
        let mut b = banded(1, 98.5, 42.0);
        b.stoch_k = 15.0;
        b.stoch_d = 11.0;
        let candles = vec![a, b];
        let ctx = CandleContext::new(&candles, 1, MarketState::SidewaysDown);
        let sig = Sideways::default().check_entry(&ctx).unwrap();
        assert_eq!(sig.reason, EntryReason::StochasticOversold);
    }

    #[test]
    fn upper_band_takes_profit() {
        let candles = vec![banded(0, 105.5, 60.0)];
        let ctx = CandleContext::new(&candles, 0, MarketState::SidewaysUp);
        let pos = position(StrategyKind::Sideways);
        let sig = Sideways::default().check_exit(&pos, &ctx).unwrap();
        assert_eq!(sig.reason, ExitReason::TakeProfit);
    }

    #[test]
    fn missing_bands_never_signal() {
        // RSI oversold, bands absent: no band entry.
        let mut c = candle(0, 95.0);
        c.rsi = 25.0;
        let candles = vec![c];
        let ctx = CandleContext::new(&candles, 0, MarketState::SidewaysFlat);
        assert!(Sideways::default().check_entry(&ctx).is_none());

        // Losing position, bands absent: no band exit.
        let mut c = candle(1, 95.0);
        c.rsi = 45.0;
        let candles = vec![c];
        let ctx = CandleContext::new(&candles, 0, MarketState::SidewaysFlat);
        let pos = position(StrategyKind::Sideways);
        assert!(Sideways::default().check_exit(&pos, &ctx).is_none());
    }

    #[test]
    fn overbought_rsi_exits() {
        let candles = vec![banded(0, 102.0, 75.0)];
        let ctx = CandleContext::new(&candles, 0, MarketState::SidewaysUp);
        let pos = position(StrategyKind::Sideways);
        let sig = Sideways::default().check_exit(&pos, &ctx).unwrap();
        assert_eq!(sig.reason, ExitReason::SignalReversal);
    }
}
