//! Trade: a closed round trip, appended once to the ledger and never mutated.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::regime::MarketState;
use super::strategy_kind::StrategyKind;

/// Why a position (or part of it) was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    TakeProfit,
    StopLoss,
    TrailingStop,
    Timeout,
    RegimeSwitch,
    SignalReversal,
    ForcedEnd,
}

impl ExitReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TakeProfit => "take_profit",
            Self::StopLoss => "stop_loss",
            Self::TrailingStop => "trailing_stop",
            Self::Timeout => "timeout",
            Self::RegimeSwitch => "regime_switch",
            Self::SignalReversal => "signal_reversal",
            Self::ForcedEnd => "forced_end",
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A closed trade record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    // ── Entry ──
    pub entry_index: usize,
    pub entry_time: NaiveDateTime,
    pub entry_price: f64,

    // ── Exit ──
    pub exit_index: usize,
    pub exit_time: NaiveDateTime,
    pub exit_price: f64,

    // ── Size ──
    pub quantity: f64,

    // ── PnL ──
    /// Entry fee share plus exit fee, in quote currency.
    pub fees: f64,
    /// Realized P&L net of all fees and slippage.
    pub pnl: f64,
    /// `pnl` as a fraction of the cost basis (notional + entry fee).
    pub pnl_pct: f64,

    // ── Context ──
    pub exit_reason: ExitReason,
    pub entry_regime: MarketState,
    pub exit_regime: MarketState,
    pub strategy: StrategyKind,
}

impl Trade {
    /// Break-even trades (`pnl == 0`) are neither winners nor losers.
    pub fn is_winner(&self) -> bool {
        self.pnl > 0.0
    }

    pub fn is_loser(&self) -> bool {
        self.pnl < 0.0
    }

    pub fn bars_held(&self) -> usize {
        self.exit_index.saturating_sub(self.entry_index)
    }
}
