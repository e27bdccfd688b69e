//! Performance metrics: pure functions that compute strategy statistics.
//!
//! Every metric is a pure function: equity curve and/or trade list in, scalar out.
//! Returns are per equity step; annualization uses the timeframe's periods per year.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use regimelab_core::domain::{equity::totals, Trade};
use regimelab_core::sizing::kelly_stats;
use regimelab_core::RunResult;

/// Aggregate performance metrics for a single run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub initial_capital: f64,
    pub final_equity: f64,
    pub total_return: f64,
    /// Can overflow to `∞` on very short, steep curves.
    #[serde(with = "infinite_as_null")]
    pub cagr: f64,
    pub sharpe: f64,
    pub sortino: f64,
    #[serde(with = "infinite_as_null")]
    pub calmar: f64,
    /// Positive magnitude, e.g. 0.15 for a 15% peak-to-trough loss.
    pub max_drawdown: f64,
    pub win_rate: f64,
    /// Mean `pnl_pct` of winning trades.
    pub avg_win: f64,
    /// Mean `pnl_pct` magnitude of losing trades.
    pub avg_loss: f64,
    /// `∞` (serialized as `null`) when there are wins and no losses.
    #[serde(with = "infinite_as_null")]
    pub profit_factor: f64,
    /// Full Kelly fraction over every closed trade. Reporting only.
    pub empirical_kelly: f64,
    pub trade_count: usize,
    pub winning_trades: usize,
    /// Break-even trades are in neither count.
    pub losing_trades: usize,
    pub total_fees: f64,
    pub avg_bars_held: f64,
    pub max_consecutive_wins: usize,
    pub max_consecutive_losses: usize,
    pub entries: usize,
    pub skipped_entries: usize,
    pub exit_reasons: BTreeMap<String, usize>,
    /// Candles spent in each market state.
    pub regime_counts: BTreeMap<String, usize>,
}

impl PerformanceMetrics {
    /// Compute all metrics from a finished run.
    pub fn compute(result: &RunResult, periods_per_year: f64) -> Self {
        let equity = totals(&result.equity_curve);
        let trades = &result.trades;
        let returns = step_returns(&equity);

        let mut exit_reasons = BTreeMap::new();
        for t in trades {
            *exit_reasons
                .entry(t.exit_reason.as_str().to_string())
                .or_insert(0) += 1;
        }
        let mut regime_counts = BTreeMap::new();
        for r in &result.regimes {
            *regime_counts.entry(r.as_str().to_string()).or_insert(0) += 1;
        }

        Self {
            initial_capital: result.initial_capital,
            final_equity: result.final_equity,
            total_return: total_return(result.initial_capital, result.final_equity),
            cagr: cagr(&equity, periods_per_year),
            sharpe: sharpe_ratio(&returns, periods_per_year),
            sortino: sortino_ratio(&returns, periods_per_year),
            calmar: calmar_ratio(&equity, periods_per_year),
            max_drawdown: max_drawdown(&equity),
            win_rate: win_rate(trades),
            avg_win: avg_win(trades),
            avg_loss: avg_loss(trades),
            profit_factor: profit_factor(trades),
            empirical_kelly: kelly_stats(trades).full_kelly,
            trade_count: trades.len(),
            winning_trades: trades.iter().filter(|t| t.is_winner()).count(),
            losing_trades: trades.iter().filter(|t| t.is_loser()).count(),
            total_fees: trades.iter().map(|t| t.fees).sum(),
            avg_bars_held: avg_bars_held(trades),
            max_consecutive_wins: max_consecutive(trades, true),
            max_consecutive_losses: max_consecutive(trades, false),
            entries: result.entries,
            skipped_entries: result.skipped_entries,
            exit_reasons,
            regime_counts,
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Total return as a fraction of the starting capital.
pub fn total_return(initial_capital: f64, final_equity: f64) -> f64 {
    if initial_capital <= 0.0 {
        return 0.0;
    }
    (final_equity - initial_capital) / initial_capital
}

/// Compound annual growth rate over the curve's span.
///
/// Returns 0.0 for fewer than 2 points or a non-positive endpoint.
pub fn cagr(equity_curve: &[f64], periods_per_year: f64) -> f64 {
    let (Some(&first), Some(&last)) = (equity_curve.first(), equity_curve.last()) else {
        return 0.0;
    };
    if equity_curve.len() < 2 || first <= 0.0 || last <= 0.0 || periods_per_year <= 0.0 {
        return 0.0;
    }
    let years = (equity_curve.len() - 1) as f64 / periods_per_year;
    (last / first).powf(1.0 / years) - 1.0
}

/// Annualized Sharpe ratio: `mean(r) / std(r) * sqrt(periods_per_year)`.
///
/// Returns 0.0 when the standard deviation vanishes or fewer than 2 returns.
pub fn sharpe_ratio(returns: &[f64], periods_per_year: f64) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let std = std_dev(returns);
    if std < 1e-15 {
        return 0.0;
    }
    mean_f64(returns) / std * periods_per_year.sqrt()
}

/// Annualized Sortino ratio (downside deviation only).
///
/// Returns 0.0 if there is no downside or fewer than 2 returns.
pub fn sortino_ratio(returns: &[f64], periods_per_year: f64) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let downside_sq: f64 = returns.iter().filter(|&&r| r < 0.0).map(|r| r * r).sum();
    let downside_std = (downside_sq / returns.len() as f64).sqrt();
    if downside_std < 1e-15 {
        return 0.0;
    }
    mean_f64(returns) / downside_std * periods_per_year.sqrt()
}

/// Calmar ratio: CAGR / max drawdown. 0.0 without a drawdown or growth.
pub fn calmar_ratio(equity_curve: &[f64], periods_per_year: f64) -> f64 {
    let c = cagr(equity_curve, periods_per_year);
    let dd = max_drawdown(equity_curve);
    if dd <= 0.0 || c <= 0.0 {
        return 0.0;
    }
    c / dd
}

/// Maximum drawdown as a positive fraction (0.15 = 15% drawdown).
///
/// Returns 0.0 if equity never falls below a previous peak.
pub fn max_drawdown(equity_curve: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut max_dd = 0.0_f64;
    for &eq in equity_curve {
        peak = peak.max(eq);
        if peak > 0.0 {
            max_dd = max_dd.max((peak - eq) / peak);
        }
    }
    max_dd
}

/// Fraction of all trades that were winners; break-even trades count in the
/// denominator.
pub fn win_rate(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    trades.iter().filter(|t| t.is_winner()).count() as f64 / trades.len() as f64
}

pub fn avg_win(trades: &[Trade]) -> f64 {
    mean_f64(
        &trades
            .iter()
            .filter(|t| t.is_winner())
            .map(|t| t.pnl_pct)
            .collect::<Vec<_>>(),
    )
}

pub fn avg_loss(trades: &[Trade]) -> f64 {
    mean_f64(
        &trades
            .iter()
            .filter(|t| t.is_loser())
            .map(|t| t.pnl_pct.abs())
            .collect::<Vec<_>>(),
    )
}

/// Gross profit over gross loss in currency.
///
/// `∞` when there are profits and no losses, 0.0 when there are no profits.
pub fn profit_factor(trades: &[Trade]) -> f64 {
    let gross_profit: f64 = trades.iter().filter(|t| t.is_winner()).map(|t| t.pnl).sum();
    let gross_loss: f64 = trades
        .iter()
        .filter(|t| t.is_loser())
        .map(|t| t.pnl.abs())
        .sum();

    if gross_profit <= 0.0 {
        return 0.0;
    }
    if gross_loss < 1e-10 {
        return f64::INFINITY;
    }
    gross_profit / gross_loss
}

pub fn avg_bars_held(trades: &[Trade]) -> f64 {
    mean_f64(
        &trades
            .iter()
            .map(|t| t.bars_held() as f64)
            .collect::<Vec<_>>(),
    )
}

/// Longest run of consecutive winners (`winners = true`) or losers.
/// A break-even trade ends either streak.
pub fn max_consecutive(trades: &[Trade], winners: bool) -> usize {
    let mut max_streak = 0;
    let mut current = 0;
    for trade in trades {
        let hit = if winners {
            trade.is_winner()
        } else {
            trade.is_loser()
        };
        if hit {
            current += 1;
            max_streak = max_streak.max(current);
        } else {
            current = 0;
        }
    }
    max_streak
}

// ─── Helpers ────────────────────────────────────────────────────────

/// Simple returns between consecutive equity points.
pub fn step_returns(equity_curve: &[f64]) -> Vec<f64> {
    equity_curve
        .windows(2)
        .map(|w| if w[0] > 0.0 { (w[1] - w[0]) / w[0] } else { 0.0 })
        .collect()
}

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

/// JSON has no infinity: write `null`, read `null` back as `+∞`.
pub mod infinite_as_null {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, s: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            s.serialize_f64(*value)
        } else {
            s.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(d)?.unwrap_or(f64::INFINITY))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use regimelab_core::domain::{ExitReason, MarketState, StrategyKind};

    fn make_trade(pnl: f64) -> Trade {
        let t0 = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        Trade {
            entry_index: 0,
            entry_time: t0,
            entry_price: 100.0,
            exit_index: 5,
            exit_time: t0 + Duration::hours(5),
            exit_price: 100.0 + pnl / 10.0,
            quantity: 10.0,
            fees: 1.0,
            pnl,
            pnl_pct: pnl / 1_000.0,
            exit_reason: ExitReason::TakeProfit,
            entry_regime: MarketState::BullModerate,
            exit_regime: MarketState::BullModerate,
            strategy: StrategyKind::Swing,
        }
    }

    // ── Total return ──

    #[test]
    fn total_return_uses_initial_capital() {
        assert!((total_return(10_000.0, 11_000.0) - 0.1).abs() < 1e-12);
        assert!((total_return(10_000.0, 9_000.0) + 0.1).abs() < 1e-12);
        assert_eq!(total_return(0.0, 5.0), 0.0);
    }

    // ── Sharpe ──

    #[test]
    fn sharpe_constant_equity_is_zero() {
        let eq = vec![100_000.0; 100];
        assert_eq!(sharpe_ratio(&step_returns(&eq), 8_760.0), 0.0);
    }

    #[test]
    fn sharpe_single_point_is_zero() {
        assert_eq!(sharpe_ratio(&step_returns(&[100.0]), 365.0), 0.0);
        assert_eq!(sharpe_ratio(&[], 365.0), 0.0);
    }

    #[test]
    fn sharpe_known_returns() {
        let returns = [0.01, -0.01, 0.02, 0.0];
        let mean = 0.005;
        let var = [0.005_f64, -0.015, 0.015, -0.005]
            .iter()
            .map(|d| d * d)
            .sum::<f64>()
            / 3.0;
        let expected = mean / var.sqrt() * 365.0_f64.sqrt();
        assert!((sharpe_ratio(&returns, 365.0) - expected).abs() < 1e-12);
    }

    #[test]
    fn sharpe_scales_with_periods_per_year() {
        let returns = [0.01, -0.005, 0.02, 0.003];
        let daily = sharpe_ratio(&returns, 365.0);
        let hourly = sharpe_ratio(&returns, 8_760.0);
        assert!((hourly / daily - 24.0_f64.sqrt()).abs() < 1e-9);
    }

    // ── Sortino ──

    #[test]
    fn sortino_no_downside_is_zero() {
        assert_eq!(sortino_ratio(&[0.01, 0.02, 0.005], 365.0), 0.0);
    }

    #[test]
    fn sortino_with_downside_is_positive_for_net_gains() {
        assert!(sortino_ratio(&[0.02, -0.005, 0.02, 0.01], 365.0) > 0.0);
    }

    // ── Max drawdown ──

    #[test]
    fn max_drawdown_is_positive_magnitude() {
        let eq = vec![100_000.0, 110_000.0, 90_000.0, 95_000.0];
        let expected = (110_000.0 - 90_000.0) / 110_000.0;
        assert!((max_drawdown(&eq) - expected).abs() < 1e-12);
    }

    #[test]
    fn max_drawdown_monotonic_increase() {
        let eq: Vec<f64> = (0..100).map(|i| 100_000.0 + i as f64 * 100.0).collect();
        assert_eq!(max_drawdown(&eq), 0.0);
        assert_eq!(max_drawdown(&[]), 0.0);
    }

    // ── Trade statistics ──

    #[test]
    fn win_rate_and_averages() {
        let trades = vec![
            make_trade(100.0),
            make_trade(-50.0),
            make_trade(200.0),
            make_trade(-50.0),
        ];
        assert!((win_rate(&trades) - 0.5).abs() < 1e-12);
        assert!((avg_win(&trades) - 0.15).abs() < 1e-12);
        assert!((avg_loss(&trades) - 0.05).abs() < 1e-12);
        assert_eq!(win_rate(&[]), 0.0);
    }

    #[test]
    fn break_even_trades_are_neither_wins_nor_losses() {
        let trades = vec![
            make_trade(100.0),
            make_trade(0.0),
            make_trade(-50.0),
            make_trade(0.0),
        ];
        assert!((win_rate(&trades) - 0.25).abs() < 1e-12);
        assert!((avg_loss(&trades) - 0.05).abs() < 1e-12);
        assert!((profit_factor(&trades) - 2.0).abs() < 1e-12);
        assert_eq!(max_consecutive(&trades, false), 1);

        let losses = vec![make_trade(-10.0), make_trade(0.0), make_trade(-10.0)];
        assert_eq!(max_consecutive(&losses, false), 1);
    }

    #[test]
    fn profit_factor_known() {
        let trades = vec![make_trade(300.0), make_trade(-100.0), make_trade(-50.0)];
        assert!((profit_factor(&trades) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn profit_factor_without_losses_is_infinite() {
        let trades = vec![make_trade(100.0), make_trade(20.0)];
        assert!(profit_factor(&trades).is_infinite());
    }

    #[test]
    fn profit_factor_without_wins_is_zero() {
        assert_eq!(profit_factor(&[make_trade(-10.0)]), 0.0);
        assert_eq!(profit_factor(&[]), 0.0);
    }

    #[test]
    fn consecutive_streaks() {
        let trades = vec![
            make_trade(1.0),
            make_trade(1.0),
            make_trade(-1.0),
            make_trade(-1.0),
            make_trade(-1.0),
            make_trade(1.0),
        ];
        assert_eq!(max_consecutive(&trades, true), 2);
        assert_eq!(max_consecutive(&trades, false), 3);
    }

    #[test]
    fn cagr_one_year_of_daily_steps() {
        let mut eq = vec![100.0];
        let step = 1.1_f64.powf(1.0 / 365.0);
        for i in 1..=365 {
            eq.push(eq[i - 1] * step);
        }
        assert!((cagr(&eq, 365.0) - 0.1).abs() < 1e-9);
    }

    // ── Serialization ──

    #[test]
    fn infinite_profit_factor_round_trips_through_null() {
        #[derive(Serialize, Deserialize)]
        struct Wrap {
            #[serde(with = "infinite_as_null")]
            v: f64,
        }
        let json = serde_json::to_string(&Wrap { v: f64::INFINITY }).unwrap();
        assert_eq!(json, r#"{"v":null}"#);
        let back: Wrap = serde_json::from_str(&json).unwrap();
        assert!(back.v.is_infinite());
    }
}
