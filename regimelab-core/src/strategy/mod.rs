//! Regime-specific sub-strategies and the router that dispatches to them.
//!
//! Sub-strategies are stateless rule sets over a [`CandleContext`]. Per-run
//! state lives in the engine-owned `Position` and in the [`StrategyRouter`].

pub mod defensive;
pub mod router;
pub mod sideways;
pub mod swing;
pub mod trend_following;

pub use defensive::{Defensive, DefensiveParams};
pub use router::{RegimeSwitchPolicy, RouterConfig, StrategyRouter};
pub use sideways::{Sideways, SidewaysParams};
pub use swing::{Swing, SwingParams};
pub use trend_following::{TrendFollowing, TrendFollowingParams};

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::{Candle, ExitReason, IndicatorSnapshot, MarketState, Position, StrategyKind};

/// The candle under evaluation plus the history before it.
///
/// `candles[..=index]` is visible; nothing after `index` is.
#[derive(Debug, Clone, Copy)]
pub struct CandleContext<'a> {
    candles: &'a [Candle],
    index: usize,
    pub regime: MarketState,
}

impl<'a> CandleContext<'a> {
    /// Context for `candles[index]`. Later candles are cut off here so no
    /// rule can look ahead.
    pub fn new(candles: &'a [Candle], index: usize, regime: MarketState) -> Self {
        let end = (index + 1).min(candles.len());
        Self {
            candles: &candles[..end],
            index,
            regime,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn candle(&self) -> &'a Candle {
        &self.candles[self.index]
    }

    pub fn prev(&self) -> Option<&'a Candle> {
        self.index.checked_sub(1).map(|i| &self.candles[i])
    }

    pub fn ind(&self) -> IndicatorSnapshot {
        self.candle().indicators()
    }

    pub fn prev_ind(&self) -> Option<IndicatorSnapshot> {
        self.prev().map(Candle::indicators)
    }

    /// The last `n` candles up to and including the current one.
    pub fn recent(&self, n: usize) -> &'a [Candle] {
        let start = (self.index + 1).saturating_sub(n);
        &self.candles[start..=self.index]
    }
}

/// Why an entry fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryReason {
    MacdGoldenCross,
    StochasticPullback,
    OversoldBand,
    StochasticOversold,
    ExtremeOversold,
}

impl fmt::Display for EntryReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::MacdGoldenCross => "macd_golden_cross",
            Self::StochasticPullback => "stochastic_pullback",
            Self::OversoldBand => "oversold_band",
            Self::StochasticOversold => "stochastic_oversold",
            Self::ExtremeOversold => "extreme_oversold",
        };
        f.write_str(s)
    }
}

/// Request to open a position with `fraction` of the Kelly-sized budget.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntrySignal {
    pub fraction: f64,
    pub reason: EntryReason,
}

/// Request to sell `fraction` of the open quantity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExitSignal {
    pub fraction: f64,
    pub reason: ExitReason,
}

impl ExitSignal {
    pub fn full(reason: ExitReason) -> Self {
        Self {
            fraction: 1.0,
            reason,
        }
    }

    pub fn is_partial(&self) -> bool {
        self.fraction < 1.0
    }
}

/// A regime-specific rule set.
pub trait SubStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    fn check_entry(&self, ctx: &CandleContext<'_>) -> Option<EntrySignal>;

    fn check_exit(&self, position: &Position, ctx: &CandleContext<'_>) -> Option<ExitSignal>;
}

/// `a` crossed above `b` between the previous and current candle.
pub fn crossed_above(prev_a: f64, prev_b: f64, a: f64, b: f64) -> bool {
    prev_a <= prev_b && a > b
}

/// `a` crossed below `b` between the previous and current candle.
pub fn crossed_below(prev_a: f64, prev_b: f64, a: f64, b: f64) -> bool {
    prev_a >= prev_b && a < b
}
