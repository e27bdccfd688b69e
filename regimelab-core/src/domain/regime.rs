//! Market regime tags and per-regime parameter tables.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Discrete market condition derived from one candle and its trailing window.
///
/// Variants are listed in classification priority order for the bull side,
/// followed by the sideways variants and the bear side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarketState {
    BullStrong,
    BullModerate,
    SidewaysUp,
    SidewaysFlat,
    SidewaysDown,
    BearModerate,
    BearStrong,
}

impl MarketState {
    pub const ALL: [MarketState; 7] = [
        MarketState::BullStrong,
        MarketState::BullModerate,
        MarketState::SidewaysUp,
        MarketState::SidewaysFlat,
        MarketState::SidewaysDown,
        MarketState::BearModerate,
        MarketState::BearStrong,
    ];

    pub fn is_bull(self) -> bool {
        matches!(self, Self::BullStrong | Self::BullModerate)
    }

    pub fn is_bear(self) -> bool {
        matches!(self, Self::BearStrong | Self::BearModerate)
    }

    pub fn is_sideways(self) -> bool {
        matches!(
            self,
            Self::SidewaysUp | Self::SidewaysFlat | Self::SidewaysDown
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::BullStrong => "BULL_STRONG",
            Self::BullModerate => "BULL_MODERATE",
            Self::SidewaysUp => "SIDEWAYS_UP",
            Self::SidewaysFlat => "SIDEWAYS_FLAT",
            Self::SidewaysDown => "SIDEWAYS_DOWN",
            Self::BearModerate => "BEAR_MODERATE",
            Self::BearStrong => "BEAR_STRONG",
        }
    }
}

impl fmt::Display for MarketState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One value per market state.
///
/// Serialized as a flat table keyed by snake_case state name, so TOML
/// configs read naturally:
///
/// ```toml
/// [kelly.regime_multipliers]
/// bull_strong = 1.2
/// bear_strong = 0.6
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegimeTable<T> {
    pub bull_strong: T,
    pub bull_moderate: T,
    pub sideways_up: T,
    pub sideways_flat: T,
    pub sideways_down: T,
    pub bear_moderate: T,
    pub bear_strong: T,
}

impl<T: Copy> RegimeTable<T> {
    /// Table with the same value for every state.
    pub fn uniform(value: T) -> Self {
        Self {
            bull_strong: value,
            bull_moderate: value,
            sideways_up: value,
            sideways_flat: value,
            sideways_down: value,
            bear_moderate: value,
            bear_strong: value,
        }
    }

    pub fn get(&self, state: MarketState) -> T {
        match state {
            MarketState::BullStrong => self.bull_strong,
            MarketState::BullModerate => self.bull_moderate,
            MarketState::SidewaysUp => self.sideways_up,
            MarketState::SidewaysFlat => self.sideways_flat,
            MarketState::SidewaysDown => self.sideways_down,
            MarketState::BearModerate => self.bear_moderate,
            MarketState::BearStrong => self.bear_strong,
        }
    }

    /// Iterate `(state, value)` pairs in `MarketState::ALL` order.
    pub fn iter(&self) -> impl Iterator<Item = (MarketState, T)> + '_ {
        MarketState::ALL.iter().map(move |&s| (s, self.get(s)))
    }
}
