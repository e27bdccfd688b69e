//! Open position owned by the simulation engine.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::regime::MarketState;
use super::strategy_kind::StrategyKind;
use crate::exits::ExitPlan;

/// The single open long position of a run.
///
/// Created on a filled buy, destroyed on a full sell or the forced
/// end-of-run liquidation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub entry_index: usize,
    pub entry_time: NaiveDateTime,
    /// Fill price including slippage.
    pub entry_price: f64,
    /// Base-asset units currently held.
    pub quantity: f64,
    /// Notional plus entry fee for the units currently held.
    pub cost_basis: f64,
    /// Entry fee attributable to the units currently held.
    pub entry_fee: f64,
    pub entry_regime: MarketState,
    /// Sub-strategy that opened (and by default manages) the position.
    pub strategy: StrategyKind,
    /// Running highest close since entry. Never decreases.
    pub highest_price: f64,
    pub bars_held: usize,
    /// Set once a partial take-profit has been executed.
    pub partial_taken: bool,
    pub exit_plan: ExitPlan,
}

impl Position {
    #[allow(clippy::too_many_arguments)]
    pub fn open(
        entry_index: usize,
        entry_time: NaiveDateTime,
        entry_price: f64,
        quantity: f64,
        entry_fee: f64,
        entry_regime: MarketState,
        strategy: StrategyKind,
        exit_plan: ExitPlan,
    ) -> Self {
        Self {
            entry_index,
            entry_time,
            entry_price,
            quantity,
            cost_basis: entry_price * quantity + entry_fee,
            entry_fee,
            entry_regime,
            strategy,
            highest_price: entry_price,
            bars_held: 0,
            partial_taken: false,
            exit_plan,
        }
    }

    /// Raise the trailing reference to `price` if it is a new high.
    pub fn update_high(&mut self, price: f64) {
        if price > self.highest_price {
            self.highest_price = price;
        }
    }

    pub fn tick_bar(&mut self) {
        self.bars_held += 1;
    }

    pub fn market_value(&self, price: f64) -> f64 {
        self.quantity * price
    }

    /// Unrealized return on the cost basis at `price` (before exit costs).
    pub fn unrealized_pct(&self, price: f64) -> f64 {
        if self.cost_basis <= 0.0 {
            return 0.0;
        }
        (self.market_value(price) - self.cost_basis) / self.cost_basis
    }

    /// Drop `quantity` units from the position, returning the
    /// `(cost_basis, entry_fee)` share that leaves with them.
    pub fn reduce(&mut self, quantity: f64) -> (f64, f64) {
        if self.quantity <= 0.0 {
            return (0.0, 0.0);
        }
        let share = (quantity / self.quantity).clamp(0.0, 1.0);
        let basis = self.cost_basis * share;
        let fee = self.entry_fee * share;
        self.quantity -= quantity.min(self.quantity);
        self.cost_basis -= basis;
        self.entry_fee -= fee;
        (basis, fee)
    }
}
