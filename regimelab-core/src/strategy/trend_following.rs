//! Trend-following: ride strong bull regimes from a confirmed MACD cross.

use serde::{Deserialize, Serialize};

use super::{
    crossed_above, crossed_below, CandleContext, EntryReason, EntrySignal, ExitSignal, SubStrategy,
};
use crate::domain::{ExitReason, Position, StrategyKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendFollowingParams {
    /// ADX every one of the last `adx_sustain` candles must reach.
    pub adx_threshold: f64,
    pub adx_sustain: usize,
    /// The histogram must exceed this many standard deviations of its recent values.
    pub hist_z: f64,
    /// Candles (before the current one) the histogram deviation is measured over.
    pub hist_lookback: usize,
}

impl Default for TrendFollowingParams {
    fn default() -> Self {
        Self {
            adx_threshold: 25.0,
            adx_sustain: 3,
            hist_z: 0.5,
            hist_lookback: 20,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TrendFollowing {
    pub params: TrendFollowingParams,
}

impl TrendFollowing {
    pub fn new(params: TrendFollowingParams) -> Self {
        Self { params }
    }

    fn adx_sustained(&self, ctx: &CandleContext<'_>) -> bool {
        let n = self.params.adx_sustain.max(1);
        let recent = ctx.recent(n);
        recent.len() == n
            && recent
                .iter()
                .all(|c| c.indicators().adx >= self.params.adx_threshold)
    }

    fn hist_significant(&self, ctx: &CandleContext<'_>, hist: f64) -> bool {
        let lookback = self.params.hist_lookback;
        let window = ctx.recent(lookback + 1);
        let past: Vec<f64> = window[..window.len() - 1]
            .iter()
            .map(|c| c.indicators().macd_hist())
            .collect();
        hist > self.params.hist_z * std_dev(&past)
    }
}

/// Population standard deviation; 0.0 for fewer than two values.
fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt()
}

impl SubStrategy for TrendFollowing {
    fn kind(&self) -> StrategyKind {
        StrategyKind::TrendFollowing
    }

    fn check_entry(&self, ctx: &CandleContext<'_>) -> Option<EntrySignal> {
        let prev = ctx.prev_ind()?;
        let cur = ctx.ind();
        let golden = crossed_above(prev.macd, prev.macd_signal, cur.macd, cur.macd_signal);
        (golden && self.adx_sustained(ctx) && self.hist_significant(ctx, cur.macd_hist())).then(
            || EntrySignal {
                fraction: 1.0,
                reason: EntryReason::MacdGoldenCross,
            },
        )
    }

    fn check_exit(&self, _position: &Position, ctx: &CandleContext<'_>) -> Option<ExitSignal> {
        let prev = ctx.prev_ind()?;
        let cur = ctx.ind();
        crossed_below(prev.macd, prev.macd_signal, cur.macd, cur.macd_signal)
            .then(|| ExitSignal::full(ExitReason::SignalReversal))
    }
}
