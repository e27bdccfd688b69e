//! Adaptive exit planner.
//!
//! Exit levels are computed once, at entry, from the fill price, the ATR at
//! entry, the entry regime and the candle timeframe:
//!
//! - price levels (take-profit, stop-loss, trailing) scale with volatility
//!   and regime;
//! - the timeout scales with regime and timeframe;
//! - every level is clamped to a safety range.
//!
//! The resulting [`ExitPlan`] is stored on the position and checked on every
//! subsequent candle.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::domain::{Candle, ExitReason, MarketState, Position, RegimeTable, Timeframe};

/// Per-regime multipliers applied to the base exit parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExitMultipliers {
    pub take_profit: f64,
    pub stop_loss: f64,
    pub trailing: f64,
    pub timeout: f64,
}

impl ExitMultipliers {
    pub const fn new(take_profit: f64, stop_loss: f64, trailing: f64, timeout: f64) -> Self {
        Self {
            take_profit,
            stop_loss,
            trailing,
            timeout,
        }
    }
}

/// Timeout multiplier per candle timeframe.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeframeMultipliers {
    #[serde(rename = "1m")]
    pub m1: f64,
    #[serde(rename = "5m")]
    pub m5: f64,
    #[serde(rename = "15m")]
    pub m15: f64,
    #[serde(rename = "30m")]
    pub m30: f64,
    #[serde(rename = "1h")]
    pub h1: f64,
    #[serde(rename = "4h")]
    pub h4: f64,
    #[serde(rename = "1d")]
    pub d1: f64,
}

impl Default for TimeframeMultipliers {
    fn default() -> Self {
        Self {
            m1: 0.25,
            m5: 0.35,
            m15: 0.5,
            m30: 0.6,
            h1: 0.75,
            h4: 1.0,
            d1: 1.5,
        }
    }
}

impl TimeframeMultipliers {
    pub fn get(&self, timeframe: Timeframe) -> f64 {
        match timeframe {
            Timeframe::M1 => self.m1,
            Timeframe::M5 => self.m5,
            Timeframe::M15 => self.m15,
            Timeframe::M30 => self.m30,
            Timeframe::H1 => self.h1,
            Timeframe::H4 => self.h4,
            Timeframe::D1 => self.d1,
        }
    }
}

/// Inclusive clamp range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

impl Bounds {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min > 0.0 && self.min <= self.max
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExitPlannerConfig {
    pub base_take_profit_pct: f64,
    pub base_stop_loss_pct: f64,
    pub base_trailing_stop_pct: f64,
    pub base_timeout_hours: f64,
    /// Gain over entry the running high must exceed before the trailing stop arms.
    pub trailing_activation_pct: f64,
    /// ATR/price ratio that maps to a volatility multiplier of 1.0.
    pub reference_atr_pct: f64,
    pub vol_min: f64,
    pub vol_max: f64,
    pub regime_multipliers: RegimeTable<ExitMultipliers>,
    pub timeframe_multipliers: TimeframeMultipliers,
    pub take_profit_bounds: Bounds,
    pub stop_loss_bounds: Bounds,
    pub trailing_bounds: Bounds,
    /// Timeout clamp, in hours.
    pub timeout_bounds: Bounds,
}

impl Default for ExitPlannerConfig {
    fn default() -> Self {
        Self {
            base_take_profit_pct: 0.06,
            base_stop_loss_pct: 0.025,
            base_trailing_stop_pct: 0.035,
            base_timeout_hours: 72.0,
            trailing_activation_pct: 0.015,
            reference_atr_pct: 0.02,
            vol_min: 0.5,
            vol_max: 2.0,
            regime_multipliers: default_regime_multipliers(),
            timeframe_multipliers: TimeframeMultipliers::default(),
            take_profit_bounds: Bounds::new(0.02, 0.20),
            stop_loss_bounds: Bounds::new(0.01, 0.05),
            trailing_bounds: Bounds::new(0.01, 0.10),
            timeout_bounds: Bounds::new(12.0, 168.0),
        }
    }
}

/// Strong bull regimes widen the take-profit and tighten the stop-loss;
/// bear regimes take profits early and leave the stop more room.
pub fn default_regime_multipliers() -> RegimeTable<ExitMultipliers> {
    RegimeTable {
        bull_strong: ExitMultipliers::new(1.5, 0.8, 1.3, 1.5),
        bull_moderate: ExitMultipliers::new(1.2, 0.9, 1.1, 1.2),
        sideways_up: ExitMultipliers::new(0.9, 1.0, 0.9, 1.0),
        sideways_flat: ExitMultipliers::new(0.8, 1.0, 0.8, 0.8),
        sideways_down: ExitMultipliers::new(0.7, 1.1, 0.8, 0.7),
        bear_moderate: ExitMultipliers::new(0.6, 1.2, 0.7, 0.5),
        bear_strong: ExitMultipliers::new(0.5, 1.3, 0.6, 0.4),
    }
}

/// Exit levels fixed at entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitPlan {
    pub take_profit_price: f64,
    pub stop_loss_price: f64,
    pub take_profit_pct: f64,
    pub stop_loss_pct: f64,
    pub trailing_stop_pct: f64,
    pub trailing_activation_pct: f64,
    #[serde(rename = "timeout_secs", with = "duration_secs")]
    pub timeout: Duration,
}

impl ExitPlan {
    /// Build a plan from percentage levels around `entry_price`.
    pub fn from_pcts(
        entry_price: f64,
        take_profit_pct: f64,
        stop_loss_pct: f64,
        trailing_stop_pct: f64,
        trailing_activation_pct: f64,
        timeout: Duration,
    ) -> Self {
        Self {
            take_profit_price: entry_price * (1.0 + take_profit_pct),
            stop_loss_price: entry_price * (1.0 - stop_loss_pct),
            take_profit_pct,
            stop_loss_pct,
            trailing_stop_pct,
            trailing_activation_pct,
            timeout,
        }
    }

    /// Price at which the trailing stop fires, or `None` while it is unarmed.
    pub fn trailing_level(&self, position: &Position) -> Option<f64> {
        let armed =
            position.highest_price > position.entry_price * (1.0 + self.trailing_activation_pct);
        armed.then(|| position.highest_price * (1.0 - self.trailing_stop_pct))
    }

    /// Check the static levels against `candle`'s close.
    ///
    /// Order: stop-loss, trailing stop, take-profit, timeout.
    pub fn check(&self, position: &Position, candle: &Candle) -> Option<ExitReason> {
        let close = candle.close;
        if close <= self.stop_loss_price {
            return Some(ExitReason::StopLoss);
        }
        if let Some(level) = self.trailing_level(position) {
            if close <= level {
                return Some(ExitReason::TrailingStop);
            }
        }
        if close >= self.take_profit_price {
            return Some(ExitReason::TakeProfit);
        }
        if candle.timestamp - position.entry_time >= self.timeout {
            return Some(ExitReason::Timeout);
        }
        None
    }
}

/// Volatility multiplier: ATR as a fraction of price against the reference.
pub fn volatility_multiplier(entry_price: f64, atr: f64, config: &ExitPlannerConfig) -> f64 {
    if atr <= 0.0 || !atr.is_finite() || entry_price <= 0.0 || config.reference_atr_pct <= 0.0 {
        return 1.0;
    }
    ((atr / entry_price) / config.reference_atr_pct).clamp(config.vol_min, config.vol_max)
}

/// Compute the exit plan for a new position.
pub fn plan(
    entry_price: f64,
    atr: f64,
    regime: MarketState,
    timeframe: Timeframe,
    config: &ExitPlannerConfig,
) -> ExitPlan {
    let vol = volatility_multiplier(entry_price, atr, config);
    let m = config.regime_multipliers.get(regime);
    let tf = config.timeframe_multipliers.get(timeframe);

    let tp = config
        .take_profit_bounds
        .clamp(config.base_take_profit_pct * vol * m.take_profit);
    let sl = config
        .stop_loss_bounds
        .clamp(config.base_stop_loss_pct * vol * m.stop_loss);
    let trailing = config
        .trailing_bounds
        .clamp(config.base_trailing_stop_pct * vol * m.trailing);
    let hours = config
        .timeout_bounds
        .clamp(config.base_timeout_hours * m.timeout * tf);

    ExitPlan::from_pcts(
        entry_price,
        tp,
        sl,
        trailing,
        config.trailing_activation_pct,
        Duration::seconds((hours * 3_600.0).round() as i64),
    )
}

mod duration_secs {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_i64(d.num_seconds())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        i64::deserialize(d).map(Duration::seconds)
    }
}
