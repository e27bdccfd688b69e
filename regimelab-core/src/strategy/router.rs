//! Routes each candle to the sub-strategy that owns its regime.

use serde::{Deserialize, Serialize};

use super::{
    CandleContext, Defensive, EntrySignal, ExitSignal, Sideways, SubStrategy, Swing,
    TrendFollowing,
};
use crate::domain::{ExitReason, MarketState, Position, StrategyKind};

/// What happens to an open position when the regime hands control to a
/// different sub-strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegimeSwitchPolicy {
    /// Close the position with `ExitReason::RegimeSwitch`.
    ForceExit,
    /// The sub-strategy that opened the position keeps managing it.
    #[default]
    KeepOriginal,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    pub regime_switch_policy: RegimeSwitchPolicy,
}

/// Owns the four sub-strategies and remembers which one is active.
#[derive(Debug, Clone)]
pub struct StrategyRouter {
    trend: TrendFollowing,
    swing: Swing,
    sideways: Sideways,
    defensive: Defensive,
    policy: RegimeSwitchPolicy,
    active: Option<StrategyKind>,
}

impl StrategyRouter {
    pub fn new(
        trend: TrendFollowing,
        swing: Swing,
        sideways: Sideways,
        defensive: Defensive,
        policy: RegimeSwitchPolicy,
    ) -> Self {
        Self {
            trend,
            swing,
            sideways,
            defensive,
            policy,
            active: None,
        }
    }

    pub fn policy(&self) -> RegimeSwitchPolicy {
        self.policy
    }

    /// Sub-strategy routed for the most recent candle.
    pub fn active(&self) -> Option<StrategyKind> {
        self.active
    }

    pub fn get(&self, kind: StrategyKind) -> &dyn SubStrategy {
        match kind {
            StrategyKind::TrendFollowing => &self.trend,
            StrategyKind::Swing => &self.swing,
            StrategyKind::Sideways => &self.sideways,
            StrategyKind::Defensive => &self.defensive,
        }
    }

    pub fn route(&mut self, regime: MarketState) -> StrategyKind {
        let kind = StrategyKind::for_regime(regime);
        if self.active != Some(kind) {
            tracing::trace!(from = ?self.active, to = %kind, %regime, "router switch");
        }
        self.active = Some(kind);
        kind
    }

    /// Entry check by the sub-strategy that owns `ctx.regime`.
    pub fn check_entry(&mut self, ctx: &CandleContext<'_>) -> Option<(StrategyKind, EntrySignal)> {
        let kind = self.route(ctx.regime);
        self.get(kind).check_entry(ctx).map(|sig| (kind, sig))
    }

    /// Exit check for an open position.
    ///
    /// Under `ForceExit` a routed sub-strategy different from the managing
    /// one closes the position outright. Otherwise the managing sub-strategy
    /// decides.
    pub fn check_exit(
        &mut self,
        position: &Position,
        ctx: &CandleContext<'_>,
    ) -> Option<ExitSignal> {
        let routed = self.route(ctx.regime);
        if routed != position.strategy && self.policy == RegimeSwitchPolicy::ForceExit {
            return Some(ExitSignal::full(ExitReason::RegimeSwitch));
        }
        self.get(position.strategy).check_exit(position, ctx)
    }
}

impl Default for StrategyRouter {
    fn default() -> Self {
        Self::new(
            TrendFollowing::default(),
            Swing::default(),
            Sideways::default(),
            Defensive::default(),
            RegimeSwitchPolicy::default(),
        )
    }
}
