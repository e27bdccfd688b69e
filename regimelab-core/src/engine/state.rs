//! Engine configuration, mutable per-run state, and the run result.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::accounting::{buy_fill, sell_fill};
use crate::config::{ExecutionConfig, StrategyConfig};
use crate::domain::{
    Candle, EquityPoint, ExitReason, MarketState, Position, StrategyKind, Trade,
};
use crate::exits::ExitPlan;

/// Configuration for a single simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub execution: ExecutionConfig,
    /// No entries are evaluated before this candle index.
    pub warmup: usize,
}

impl EngineConfig {
    pub fn new(execution: ExecutionConfig, warmup: usize) -> Self {
        Self { execution, warmup }
    }
}

impl From<&StrategyConfig> for EngineConfig {
    fn from(config: &StrategyConfig) -> Self {
        Self::new(config.execution.clone(), config.effective_warmup())
    }
}

/// Mutable state that evolves candle by candle.
#[derive(Debug)]
pub struct EngineState {
    pub cash: f64,
    pub position: Option<Position>,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
    pub regimes: Vec<MarketState>,
    pub entries: usize,
    pub skipped_entries: usize,
}

impl EngineState {
    pub fn new(initial_capital: f64) -> Self {
        Self {
            cash: initial_capital,
            position: None,
            trades: Vec::new(),
            equity_curve: Vec::new(),
            regimes: Vec::new(),
            entries: 0,
            skipped_entries: 0,
        }
    }

    pub fn quantity(&self) -> f64 {
        self.position.as_ref().map_or(0.0, |p| p.quantity)
    }

    /// Open a position with `budget` of cash. No-op while already in a position.
    #[allow(clippy::too_many_arguments)]
    pub fn open(
        &mut self,
        index: usize,
        candle: &Candle,
        budget: f64,
        regime: MarketState,
        strategy: StrategyKind,
        plan: impl FnOnce(f64) -> ExitPlan,
        exec: &ExecutionConfig,
    ) -> bool {
        if self.position.is_some() {
            return false;
        }
        let Some(fill) = buy_fill(budget.min(self.cash), candle.close, exec) else {
            return false;
        };
        self.cash = (self.cash - fill.cost).max(0.0);
        self.entries += 1;
        tracing::debug!(
            index,
            price = fill.price,
            quantity = fill.quantity,
            fee = fill.fee,
            %regime,
            %strategy,
            "buy"
        );
        self.position = Some(Position::open(
            index,
            candle.timestamp,
            fill.price,
            fill.quantity,
            fill.fee,
            regime,
            strategy,
            plan(fill.price),
        ));
        true
    }

    /// Sell `fraction` of the open quantity and append the trade.
    ///
    /// A fraction of 1.0 (or more) closes the position. No-op when flat.
    pub fn close(
        &mut self,
        index: usize,
        candle: &Candle,
        fraction: f64,
        reason: ExitReason,
        exit_regime: MarketState,
        exec: &ExecutionConfig,
    ) -> Option<&Trade> {
        let pos = self.position.as_mut()?;
        if fraction.is_nan() || fraction <= 0.0 {
            return None;
        }
        let full = fraction >= 1.0;
        let quantity = if full {
            pos.quantity
        } else {
            pos.quantity * fraction
        };

        let fill = sell_fill(quantity, candle.close, exec);
        let (basis, entry_fee) = pos.reduce(quantity);
        let pnl = fill.proceeds - basis;
        let trade = Trade {
            entry_index: pos.entry_index,
            entry_time: pos.entry_time,
            entry_price: pos.entry_price,
            exit_index: index,
            exit_time: candle.timestamp,
            exit_price: fill.price,
            quantity,
            fees: entry_fee + fill.fee,
            pnl,
            pnl_pct: if basis > 0.0 { pnl / basis } else { 0.0 },
            exit_reason: reason,
            entry_regime: pos.entry_regime,
            exit_regime,
            strategy: pos.strategy,
        };
        tracing::debug!(
            index,
            price = fill.price,
            quantity,
            pnl,
            reason = %reason,
            partial = !full,
            "sell"
        );

        self.cash += fill.proceeds;
        if full || pos.quantity <= 0.0 {
            self.position = None;
        } else {
            pos.partial_taken = true;
        }
        self.trades.push(trade);
        self.trades.last()
    }

    /// Record the end-of-candle equity point.
    pub fn mark(&mut self, timestamp: NaiveDateTime, close: f64) -> f64 {
        let position_value = self.quantity() * close;
        let point = EquityPoint::new(timestamp, self.cash, position_value);
        self.equity_curve.push(point);
        point.total
    }
}

/// Outcome of one simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub initial_capital: f64,
    pub final_equity: f64,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
    /// Regime per candle.
    pub regimes: Vec<MarketState>,
    pub entries: usize,
    /// Entry signals dropped because the budget was below the minimum order.
    pub skipped_entries: usize,
}

impl RunResult {
    pub fn from_state(state: EngineState, initial_capital: f64) -> Self {
        let final_equity = state
            .equity_curve
            .last()
            .map_or(initial_capital, |p| p.total);
        Self {
            initial_capital,
            final_equity,
            trades: state.trades,
            equity_curve: state.equity_curve,
            regimes: state.regimes,
            entries: state.entries,
            skipped_entries: state.skipped_entries,
        }
    }

    pub fn total_return(&self) -> f64 {
        if self.initial_capital <= 0.0 {
            return 0.0;
        }
        (self.final_equity - self.initial_capital) / self.initial_capital
    }
}
