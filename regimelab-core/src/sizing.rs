//! Dynamic Kelly position sizer.
//!
//! The capital fraction for a new entry comes from the Kelly criterion over
//! the most recent closed trades, damped, scaled by the current regime, and
//! clamped into `[kelly_min, kelly_max]`.

use serde::{Deserialize, Serialize};

use crate::domain::{MarketState, RegimeTable, Trade};

/// How much of the full Kelly fraction to bet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KellyDamping {
    Full,
    #[default]
    Half,
    Quarter,
}

impl KellyDamping {
    pub fn factor(self) -> f64 {
        match self {
            Self::Full => 1.0,
            Self::Half => 0.5,
            Self::Quarter => 0.25,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KellyConfig {
    /// Trades needed before the empirical fraction replaces `initial_kelly`.
    pub min_trades_required: usize,
    /// Most recent closed trades the statistics are computed over.
    pub lookback_trades: usize,
    pub initial_kelly: f64,
    pub kelly_min: f64,
    pub kelly_max: f64,
    pub damping: KellyDamping,
    pub regime_multipliers: RegimeTable<f64>,
}

impl Default for KellyConfig {
    fn default() -> Self {
        Self {
            min_trades_required: 20,
            lookback_trades: 50,
            initial_kelly: 0.5,
            kelly_min: 0.30,
            kelly_max: 0.98,
            damping: KellyDamping::Half,
            regime_multipliers: default_regime_multipliers(),
        }
    }
}

pub fn default_regime_multipliers() -> RegimeTable<f64> {
    RegimeTable {
        bull_strong: 1.2,
        bull_moderate: 1.0,
        sideways_up: 0.9,
        sideways_flat: 0.8,
        sideways_down: 0.75,
        bear_moderate: 0.7,
        bear_strong: 0.6,
    }
}

/// Statistics behind one sizing decision.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct KellyState {
    pub sample_size: usize,
    pub win_rate: f64,
    /// Mean winning `pnl_pct`.
    pub avg_win: f64,
    /// Mean losing `pnl_pct`, as a positive magnitude.
    pub avg_loss: f64,
    pub win_loss_ratio: f64,
    /// Undamped Kelly fraction before regime scaling and clamping.
    pub full_kelly: f64,
    /// Final clamped fraction.
    pub kelly_fraction: f64,
}

/// Raw Kelly statistics over `trades`, using `pnl_pct` as the per-trade return.
///
/// `full_kelly` is `p - (1-p)/b`, or `p` when there are no losing trades.
/// A negative edge floors `full_kelly` at 0.0. `kelly_fraction` is left at
/// zero; [`size`] fills it in.
pub fn kelly_stats(trades: &[Trade]) -> KellyState {
    let n = trades.len();
    if n == 0 {
        return KellyState::default();
    }
    // Break-even trades count toward `n` only.
    let returns = |keep: fn(&Trade) -> bool| -> Vec<f64> {
        trades.iter().filter(|t| keep(t)).map(|t| t.pnl_pct).collect()
    };
    let wins = returns(Trade::is_winner);
    let losses = returns(Trade::is_loser);

    let p = wins.len() as f64 / n as f64;
    let avg_win = mean(&wins);
    let avg_loss = mean(&losses).abs();

    let (b, k) = if losses.is_empty() || avg_loss == 0.0 {
        (f64::INFINITY, p)
    } else {
        let b = avg_win / avg_loss;
        if b <= 0.0 {
            (b, 0.0)
        } else {
            (b, (p - (1.0 - p) / b).max(0.0))
        }
    };

    KellyState {
        sample_size: n,
        win_rate: p,
        avg_win,
        avg_loss,
        win_loss_ratio: b,
        full_kelly: k,
        kelly_fraction: 0.0,
    }
}

/// Full sizing decision with its supporting statistics.
pub fn kelly_state(history: &[Trade], regime: MarketState, config: &KellyConfig) -> KellyState {
    let clamp = |v: f64| v.clamp(config.kelly_min, config.kelly_max);

    if history.len() < config.min_trades_required {
        return KellyState {
            sample_size: history.len(),
            kelly_fraction: clamp(config.initial_kelly),
            ..KellyState::default()
        };
    }

    let start = history.len().saturating_sub(config.lookback_trades.max(1));
    let mut state = kelly_stats(&history[start..]);

    let no_edge = state.full_kelly <= 0.0;
    state.kelly_fraction = if no_edge {
        config.kelly_min
    } else {
        let damped = state.full_kelly * config.damping.factor();
        clamp(damped * config.regime_multipliers.get(regime))
    };
    state
}

/// Capital fraction for a new entry, in `[kelly_min, kelly_max]`.
pub fn size(history: &[Trade], regime: MarketState, config: &KellyConfig) -> f64 {
    kelly_state(history, regime, config).kelly_fraction
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ExitReason, StrategyKind};
    use chrono::{NaiveDate, NaiveDateTime};

    fn ts() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn trade(pnl_pct: f64) -> Trade {
        Trade {
            entry_index: 0,
            entry_time: ts(),
            entry_price: 100.0,
            exit_index: 1,
            exit_time: ts() + chrono::Duration::hours(1),
            exit_price: 100.0 * (1.0 + pnl_pct),
            quantity: 1.0,
            fees: 0.0,
            pnl: 100.0 * pnl_pct,
            pnl_pct,
            exit_reason: ExitReason::TakeProfit,
            entry_regime: MarketState::SidewaysFlat,
            exit_regime: MarketState::SidewaysFlat,
            strategy: StrategyKind::Sideways,
        }
    }

    /// 60% winners at +4%, 40% losers at -2%.
    fn history(n: usize) -> Vec<Trade> {
        (0..n)
            .map(|i| if i % 5 < 3 { trade(0.04) } else { trade(-0.02) })
            .collect()
    }

    fn neutral_config(damping: KellyDamping) -> KellyConfig {
        KellyConfig {
            kelly_min: 0.01,
            kelly_max: 1.0,
            damping,
            regime_multipliers: RegimeTable::uniform(1.0),
            ..KellyConfig::default()
        }
    }

    #[test]
    fn kelly_formula() {
        let stats = kelly_stats(&history(50));
        assert!((stats.win_rate - 0.6).abs() < 1e-12);
        assert!((stats.win_loss_ratio - 2.0).abs() < 1e-12);
        assert!((stats.full_kelly - 0.4).abs() < 1e-12);

        let regime = MarketState::SidewaysFlat;
        let full = size(&history(50), regime, &neutral_config(KellyDamping::Full));
        let half = size(&history(50), regime, &neutral_config(KellyDamping::Half));
        let quarter = size(
            &history(50),
            MarketState::SidewaysFlat,
            &neutral_config(KellyDamping::Quarter),
        );
        assert!((full - 0.40).abs() < 1e-12);
        assert!((half - 0.20).abs() < 1e-12);
        assert!((quarter - 0.10).abs() < 1e-12);
    }

    #[test]
    fn break_even_trades_only_dilute_win_rate() {
        let mut trades = history(50);
        trades.extend((0..10).map(|_| trade(0.0)));
        let stats = kelly_stats(&trades);
        assert_eq!(stats.sample_size, 60);
        assert!((stats.win_rate - 0.5).abs() < 1e-12);
        assert!((stats.avg_loss - 0.02).abs() < 1e-12);
        assert!((stats.win_loss_ratio - 2.0).abs() < 1e-12);
        assert!((stats.full_kelly - 0.25).abs() < 1e-12);
    }

    #[test]
    fn cold_start_uses_initial_kelly() {
        let cfg = KellyConfig::default();
        assert_eq!(size(&[], MarketState::BullStrong, &cfg), 0.5);
        assert_eq!(size(&history(19), MarketState::BearStrong, &cfg), 0.5);
    }

    #[test]
    fn cold_start_is_clamped() {
        let cfg = KellyConfig {
            initial_kelly: 5.0,
            ..KellyConfig::default()
        };
        assert_eq!(size(&[], MarketState::BullStrong, &cfg), cfg.kelly_max);
    }

    #[test]
    fn negative_edge_returns_min() {
        let losers: Vec<Trade> = (0..30)
            .map(|i| if i % 5 == 0 { trade(0.01) } else { trade(-0.03) })
            .collect();
        let cfg = KellyConfig::default();
        assert_eq!(size(&losers, MarketState::BullStrong, &cfg), cfg.kelly_min);
    }

    #[test]
    fn no_losses_uses_win_rate() {
        let winners: Vec<Trade> = (0..25).map(|_| trade(0.02)).collect();
        let stats = kelly_stats(&winners);
        assert_eq!(stats.full_kelly, 1.0);
        let cfg = neutral_config(KellyDamping::Full);
        assert_eq!(size(&winners, MarketState::SidewaysFlat, &cfg), 1.0);
    }

    #[test]
    fn regime_multiplier_applies_before_clamp() {
        let cfg = KellyConfig {
            kelly_min: 0.01,
            kelly_max: 1.0,
            damping: KellyDamping::Half,
            ..KellyConfig::default()
        };
        let bull = size(&history(50), MarketState::BullStrong, &cfg);
        let bear = size(&history(50), MarketState::BearStrong, &cfg);
        assert!((bull - 0.24).abs() < 1e-12);
        assert!((bear - 0.12).abs() < 1e-12);
    }

    #[test]
    fn only_lookback_window_counts() {
        let mut trades: Vec<Trade> = (0..100).map(|_| trade(-0.05)).collect();
        trades.extend(history(50));
        let cfg = neutral_config(KellyDamping::Full);
        let f = size(&trades, MarketState::SidewaysFlat, &cfg);
        assert!((f - 0.40).abs() < 1e-12);
    }

    #[test]
    fn history_is_not_mutated() {
        let trades = history(40);
        let before: Vec<f64> = trades.iter().map(|t| t.pnl_pct).collect();
        let _ = size(&trades, MarketState::BullModerate, &KellyConfig::default());
        let after: Vec<f64> = trades.iter().map(|t| t.pnl_pct).collect();
        assert_eq!(before, after);
    }
}
