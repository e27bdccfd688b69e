//! Strategy configuration: every tunable of a run in one serde tree.
//!
//! All sections carry `#[serde(default)]`, so a TOML file only needs to name
//! what it changes:
//!
//! ```toml
//! name = "half-kelly-force-exit"
//! timeframe = "4h"
//!
//! [kelly]
//! damping = "half"
//!
//! [router]
//! regime_switch_policy = "force_exit"
//! ```
//!
//! Validation happens once, before any run, and reports the first offending
//! field.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::Timeframe;
use crate::exits::{Bounds, ExitPlannerConfig};
use crate::indicators::IndicatorParams;
use crate::regime::RegimeThresholds;
use crate::sizing::KellyConfig;
use crate::strategy::{
    DefensiveParams, RouterConfig, SidewaysParams, StrategyRouter, SwingParams,
    TrendFollowingParams,
};
use crate::strategy::{Defensive, Sideways, Swing, TrendFollowing};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config field `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

/// Costs and capital of the simulated account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    pub initial_capital: f64,
    /// Fee per side, as a fraction of notional.
    pub fee_rate: f64,
    /// Adverse price move applied to every fill, as a fraction of close.
    pub slippage: f64,
    /// Entries with a smaller quote budget are skipped.
    pub min_order_amount: f64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            initial_capital: 10_000.0,
            fee_rate: 0.0005,
            slippage: 0.0005,
            min_order_amount: 5.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    pub name: String,
    pub timeframe: Timeframe,
    /// Candles skipped before the first entry may be evaluated.
    pub warmup: usize,
    pub execution: ExecutionConfig,
    pub indicators: IndicatorParams,
    pub regime: RegimeThresholds,
    pub kelly: KellyConfig,
    pub exits: ExitPlannerConfig,
    pub router: RouterConfig,
    pub trend_following: TrendFollowingParams,
    pub swing: SwingParams,
    pub sideways: SidewaysParams,
    pub defensive: DefensiveParams,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            name: "regime-kelly".to_string(),
            timeframe: Timeframe::default(),
            warmup: 40,
            execution: ExecutionConfig::default(),
            indicators: IndicatorParams::default(),
            regime: RegimeThresholds::default(),
            kelly: KellyConfig::default(),
            exits: ExitPlannerConfig::default(),
            router: RouterConfig::default(),
            trend_following: TrendFollowingParams::default(),
            swing: SwingParams::default(),
            sideways: SidewaysParams::default(),
            defensive: DefensiveParams::default(),
        }
    }
}

impl StrategyConfig {
    /// Parse and validate.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Deterministic identity of the configuration (BLAKE3 over its JSON form).
    pub fn fingerprint(&self) -> String {
        let json = serde_json::to_string(self).unwrap_or_default();
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }

    /// First candle index at which entries may be evaluated.
    ///
    /// At least `warmup`, and late enough that the candle and its predecessor
    /// are past the longest indicator lookback, so crosses never read a
    /// defaulted value.
    pub fn effective_warmup(&self) -> usize {
        self.warmup.max(self.indicators.max_lookback() + 1)
    }

    /// A fresh router for one run.
    pub fn build_router(&self) -> StrategyRouter {
        StrategyRouter::new(
            TrendFollowing::new(self.trend_following.clone()),
            Swing::new(self.swing.clone()),
            Sideways::new(self.sideways.clone()),
            Defensive::new(self.defensive.clone()),
            self.router.regime_switch_policy,
        )
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_execution()?;
        self.validate_kelly()?;
        self.validate_exits()?;
        self.validate_regime()?;
        self.validate_strategies()?;
        self.validate_indicators()
    }

    fn validate_execution(&self) -> Result<(), ConfigError> {
        let e = &self.execution;
        if !(e.initial_capital.is_finite() && e.initial_capital > 0.0) {
            return Err(invalid("execution.initial_capital", "must be positive"));
        }
        if !(0.0..0.1).contains(&e.fee_rate) {
            return Err(invalid("execution.fee_rate", "must be in [0, 0.1)"));
        }
        if !(0.0..0.1).contains(&e.slippage) {
            return Err(invalid("execution.slippage", "must be in [0, 0.1)"));
        }
        if !(e.min_order_amount.is_finite() && e.min_order_amount >= 0.0) {
            return Err(invalid("execution.min_order_amount", "must be >= 0"));
        }
        Ok(())
    }

    fn validate_kelly(&self) -> Result<(), ConfigError> {
        let k = &self.kelly;
        if !(k.kelly_min > 0.0 && k.kelly_min <= k.kelly_max && k.kelly_max <= 1.0) {
            return Err(invalid(
                "kelly.kelly_min",
                format!(
                    "require 0 < kelly_min <= kelly_max <= 1, got min={} max={}",
                    k.kelly_min, k.kelly_max
                ),
            ));
        }
        if !(k.initial_kelly.is_finite() && k.initial_kelly > 0.0) {
            return Err(invalid("kelly.initial_kelly", "must be positive"));
        }
        if k.lookback_trades == 0 {
            return Err(invalid("kelly.lookback_trades", "must be >= 1"));
        }
        if k.regime_multipliers.iter().any(|(_, m)| !(m.is_finite() && m > 0.0)) {
            return Err(invalid("kelly.regime_multipliers", "must all be positive"));
        }
        Ok(())
    }

    fn validate_exits(&self) -> Result<(), ConfigError> {
        let x = &self.exits;
        let positive = [
            ("exits.base_take_profit_pct", x.base_take_profit_pct),
            ("exits.base_stop_loss_pct", x.base_stop_loss_pct),
            ("exits.base_trailing_stop_pct", x.base_trailing_stop_pct),
            ("exits.base_timeout_hours", x.base_timeout_hours),
            ("exits.reference_atr_pct", x.reference_atr_pct),
            ("exits.vol_min", x.vol_min),
        ];
        for (field, v) in positive {
            if !(v.is_finite() && v > 0.0) {
                return Err(invalid(field, "must be positive"));
            }
        }
        if !x.vol_max.is_finite() || x.vol_max < x.vol_min {
            return Err(invalid("exits.vol_max", "must be finite and >= vol_min"));
        }
        if !(x.trailing_activation_pct >= 0.0 && x.trailing_activation_pct.is_finite()) {
            return Err(invalid("exits.trailing_activation_pct", "must be >= 0"));
        }
        let bounds: [(&'static str, Bounds); 4] = [
            ("exits.take_profit_bounds", x.take_profit_bounds),
            ("exits.stop_loss_bounds", x.stop_loss_bounds),
            ("exits.trailing_bounds", x.trailing_bounds),
            ("exits.timeout_bounds", x.timeout_bounds),
        ];
        for (field, b) in bounds {
            if !b.is_valid() {
                return Err(invalid(field, "require 0 < min <= max"));
            }
        }
        if x.stop_loss_bounds.max >= 1.0 {
            return Err(invalid("exits.stop_loss_bounds", "max must be below 1"));
        }
        let multipliers_ok = x.regime_multipliers.iter().all(|(_, m)| {
            [m.take_profit, m.stop_loss, m.trailing, m.timeout]
                .iter()
                .all(|v| v.is_finite() && *v > 0.0)
        });
        if !multipliers_ok {
            return Err(invalid("exits.regime_multipliers", "must all be positive"));
        }
        Ok(())
    }

    fn validate_regime(&self) -> Result<(), ConfigError> {
        let r = &self.regime;
        if r.window == 0 {
            return Err(invalid("regime.window", "must be >= 1"));
        }
        if r.strong_adx < r.trend_adx {
            return Err(invalid("regime.strong_adx", "must be >= trend_adx"));
        }
        Ok(())
    }

    fn validate_strategies(&self) -> Result<(), ConfigError> {
        if self.trend_following.adx_sustain == 0 {
            return Err(invalid("trend_following.adx_sustain", "must be >= 1"));
        }
        if !(0.0..1.0).contains(&self.swing.partial_take_fraction) {
            return Err(invalid("swing.partial_take_fraction", "must be in [0, 1)"));
        }
        let f = self.defensive.size_fraction;
        if !(f > 0.0 && f < 1.0) {
            return Err(invalid("defensive.size_fraction", "must be in (0, 1)"));
        }
        Ok(())
    }

    fn validate_indicators(&self) -> Result<(), ConfigError> {
        let p = &self.indicators;
        let periods = [
            p.rsi_period,
            p.macd_fast,
            p.macd_slow,
            p.macd_signal,
            p.adx_period,
            p.atr_period,
            p.mfi_period,
            p.bb_period,
            p.stoch_k,
            p.stoch_d,
            p.ema_fast,
            p.ema_slow,
        ];
        if periods.contains(&0) {
            return Err(invalid("indicators", "periods must be >= 1"));
        }
        if p.macd_fast >= p.macd_slow {
            return Err(invalid("indicators.macd_fast", "must be below macd_slow"));
        }
        if !(p.bb_std.is_finite() && p.bb_std > 0.0) {
            return Err(invalid("indicators.bb_std", "must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sizing::KellyDamping;
    use crate::strategy::RegimeSwitchPolicy;

    #[test]
    fn default_config_is_valid() {
        StrategyConfig::default().validate().unwrap();
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let cfg = StrategyConfig::from_toml_str(
            r#"
            name = "quarter"
            timeframe = "4h"

            [kelly]
            damping = "quarter"

            [router]
            regime_switch_policy = "force_exit"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.name, "quarter");
        assert_eq!(cfg.timeframe, Timeframe::H4);
        assert_eq!(cfg.kelly.damping, KellyDamping::Quarter);
        assert_eq!(cfg.kelly.lookback_trades, 50);
        assert_eq!(cfg.router.regime_switch_policy, RegimeSwitchPolicy::ForceExit);
        assert_eq!(cfg.execution, ExecutionConfig::default());
    }

    #[test]
    fn kelly_bounds_are_checked() {
        let mut cfg = StrategyConfig::default();
        cfg.kelly.kelly_min = 0.9;
        cfg.kelly.kelly_max = 0.5;
        let err = cfg.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "kelly.kelly_min", .. }));

        cfg.kelly.kelly_min = 0.0;
        cfg.kelly.kelly_max = 0.5;
        assert!(cfg.validate().is_err());

        cfg.kelly.kelly_min = 0.3;
        cfg.kelly.kelly_max = 1.2;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn negative_fee_rejected() {
        let mut cfg = StrategyConfig::default();
        cfg.execution.fee_rate = -0.001;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn inverted_exit_bounds_rejected() {
        let mut cfg = StrategyConfig::default();
        cfg.exits.take_profit_bounds = Bounds::new(0.2, 0.02);
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("take_profit_bounds"));
    }

    #[test]
    fn defensive_fraction_must_be_below_one() {
        let mut cfg = StrategyConfig::default();
        cfg.defensive.size_fraction = 1.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn effective_warmup_covers_longest_lookback() {
        let mut cfg = StrategyConfig::default();
        cfg.warmup = 0;
        cfg.indicators.macd_slow = 100;
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.effective_warmup(), cfg.indicators.max_lookback() + 1);
        assert!(cfg.effective_warmup() > 100);

        cfg.warmup = 500;
        assert_eq!(cfg.effective_warmup(), 500);
    }

    #[test]
    fn nan_vol_max_rejected() {
        let mut cfg = StrategyConfig::default();
        cfg.exits.vol_max = f64::NAN;
        let err = cfg.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "exits.vol_max", .. }));

        let err = StrategyConfig::from_toml_str("[exits]\nvol_max = nan").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "exits.vol_max", .. }));
    }

    #[test]
    fn unparsable_toml_is_a_parse_error() {
        let err = StrategyConfig::from_toml_str("warmup = \"soon\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn fingerprint_tracks_content() {
        let a = StrategyConfig::default();
        let mut b = a.clone();
        assert_eq!(a.fingerprint(), b.fingerprint());
        b.kelly.damping = KellyDamping::Full;
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
    }
}
