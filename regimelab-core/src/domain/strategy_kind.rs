use serde::{Deserialize, Serialize};
use std::fmt;

use super::regime::MarketState;

/// The four regime-specific sub-strategies the router can dispatch to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    TrendFollowing,
    Swing,
    Sideways,
    Defensive,
}

impl StrategyKind {
    /// Routing table: which sub-strategy owns a given market state.
    pub fn for_regime(state: MarketState) -> Self {
        match state {
            MarketState::BullStrong => Self::TrendFollowing,
            MarketState::BullModerate => Self::Swing,
            MarketState::SidewaysUp | MarketState::SidewaysFlat | MarketState::SidewaysDown => {
                Self::Sideways
            }
            MarketState::BearModerate | MarketState::BearStrong => Self::Defensive,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::TrendFollowing => "trend_following",
            Self::Swing => "swing",
            Self::Sideways => "sideways",
            Self::Defensive => "defensive",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
