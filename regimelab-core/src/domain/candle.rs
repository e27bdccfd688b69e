//! Candle: the fundamental market data unit.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Neutral RSI used when the indicator is missing.
pub const NEUTRAL_RSI: f64 = 50.0;
/// Neutral MFI used when the indicator is missing.
pub const NEUTRAL_MFI: f64 = 50.0;
/// Neutral ADX used when the indicator is missing (weak trend).
pub const NEUTRAL_ADX: f64 = 20.0;
/// Neutral stochastic %K / %D used when missing.
pub const NEUTRAL_STOCH: f64 = 50.0;

fn nan() -> f64 {
    f64::NAN
}

/// OHLCV candle for a single instrument plus precomputed indicator columns.
///
/// Indicator columns are `NaN` when missing (warmup or absent from the input).
/// The simulation core never reads them directly: it goes through
/// [`Candle::indicators`], which substitutes neutral values so a single bad row
/// cannot stop a multi-year run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,

    #[serde(default = "nan")]
    pub rsi: f64,
    #[serde(default = "nan")]
    pub macd: f64,
    #[serde(default = "nan")]
    pub macd_signal: f64,
    #[serde(default = "nan")]
    pub adx: f64,
    #[serde(default = "nan")]
    pub atr: f64,
    #[serde(default = "nan")]
    pub mfi: f64,
    #[serde(default = "nan")]
    pub bb_upper: f64,
    #[serde(default = "nan")]
    pub bb_middle: f64,
    #[serde(default = "nan")]
    pub bb_lower: f64,
    #[serde(default = "nan")]
    pub stoch_k: f64,
    #[serde(default = "nan")]
    pub stoch_d: f64,
    #[serde(default = "nan")]
    pub ema_fast: f64,
    #[serde(default = "nan")]
    pub ema_slow: f64,
}

impl Candle {
    /// Plain OHLCV candle with every indicator column missing.
    pub fn new(
        timestamp: NaiveDateTime,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
            rsi: f64::NAN,
            macd: f64::NAN,
            macd_signal: f64::NAN,
            adx: f64::NAN,
            atr: f64::NAN,
            mfi: f64::NAN,
            bb_upper: f64::NAN,
            bb_middle: f64::NAN,
            bb_lower: f64::NAN,
            stoch_k: f64::NAN,
            stoch_d: f64::NAN,
            ema_fast: f64::NAN,
            ema_slow: f64::NAN,
        }
    }

    /// Basic OHLC sanity check: high >= low, high/low bracket open and close,
    /// strictly positive close.
    pub fn is_sane(&self) -> bool {
        let finite = self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite();
        finite
            && self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.close > 0.0
    }

    /// True if any indicator column is missing.
    pub fn has_missing_indicators(&self) -> bool {
        [
            self.rsi,
            self.macd,
            self.macd_signal,
            self.adx,
            self.atr,
            self.mfi,
            self.bb_upper,
            self.bb_middle,
            self.bb_lower,
            self.stoch_k,
            self.stoch_d,
            self.ema_fast,
            self.ema_slow,
        ]
        .iter()
        .any(|v| !v.is_finite())
    }

    /// Indicator snapshot with neutral defaults substituted for missing values.
    pub fn indicators(&self) -> IndicatorSnapshot {
        let or = |v: f64, default: f64| if v.is_finite() { v } else { default };
        let macd = or(self.macd, 0.0);
        IndicatorSnapshot {
            rsi: or(self.rsi, NEUTRAL_RSI),
            macd,
            // A missing signal line collapses onto MACD so no cross is implied.
            macd_signal: or(self.macd_signal, macd),
            adx: or(self.adx, NEUTRAL_ADX),
            atr: or(self.atr, 0.0).max(0.0),
            mfi: or(self.mfi, NEUTRAL_MFI),
            // Missing bands sit at the infinities so no band touch is implied.
            bb_upper: or(self.bb_upper, f64::INFINITY),
            bb_middle: or(self.bb_middle, self.close),
            bb_lower: or(self.bb_lower, f64::NEG_INFINITY),
            stoch_k: or(self.stoch_k, NEUTRAL_STOCH),
            stoch_d: or(self.stoch_d, NEUTRAL_STOCH),
            ema_fast: or(self.ema_fast, self.close),
            ema_slow: or(self.ema_slow, self.close),
        }
    }
}

/// Indicator values for one candle.
///
/// Every field is finite except a missing Bollinger band, which reads as
/// `+inf` (upper) or `-inf` (lower).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorSnapshot {
    pub rsi: f64,
    pub macd: f64,
    pub macd_signal: f64,
    pub adx: f64,
    pub atr: f64,
    pub mfi: f64,
    pub bb_upper: f64,
    pub bb_middle: f64,
    pub bb_lower: f64,
    pub stoch_k: f64,
    pub stoch_d: f64,
    pub ema_fast: f64,
    pub ema_slow: f64,
}

impl IndicatorSnapshot {
    /// MACD histogram (MACD minus signal line).
    pub fn macd_hist(&self) -> f64 {
        self.macd - self.macd_signal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn sample_candle() -> Candle {
        Candle::new(ts(), 100.0, 105.0, 98.0, 103.0, 50_000.0)
    }

    #[test]
    fn candle_is_sane() {
        assert!(sample_candle().is_sane());
    }

    #[test]
    fn candle_detects_insane_high_low() {
        let mut c = sample_candle();
        c.high = 97.0;
        assert!(!c.is_sane());
    }

    #[test]
    fn candle_detects_nan_close() {
        let mut c = sample_candle();
        c.close = f64::NAN;
        assert!(!c.is_sane());
    }

    #[test]
    fn missing_indicators_get_neutral_defaults() {
        let snap = sample_candle().indicators();
        assert_eq!(snap.rsi, NEUTRAL_RSI);
        assert_eq!(snap.mfi, NEUTRAL_MFI);
        assert_eq!(snap.adx, NEUTRAL_ADX);
        assert_eq!(snap.macd, 0.0);
        assert_eq!(snap.macd_signal, 0.0);
        assert_eq!(snap.atr, 0.0);
        assert_eq!(snap.bb_middle, 103.0);
        assert_eq!(snap.ema_slow, 103.0);
    }

    #[test]
    fn missing_bands_are_never_touched() {
        let c = sample_candle();
        let snap = c.indicators();
        assert!(c.close > snap.bb_lower);
        assert!(c.close < snap.bb_upper);
    }

    #[test]
    fn present_indicators_pass_through() {
        let mut c = sample_candle();
        c.rsi = 28.0;
        c.macd = 1.5;
        let snap = c.indicators();
        assert_eq!(snap.rsi, 28.0);
        assert_eq!(snap.macd, 1.5);
        // Signal missing: collapses onto MACD, histogram is flat.
        assert_eq!(snap.macd_hist(), 0.0);
    }

    #[test]
    fn has_missing_indicators_flag() {
        assert!(sample_candle().has_missing_indicators());
    }

    #[test]
    fn deserializes_without_indicator_columns() {
        let json = r#"{"timestamp":"2024-01-02T00:00:00",
            "open":1.0,"high":2.0,"low":0.5,"close":1.5,"volume":10.0}"#;
        let c: Candle = serde_json::from_str(json).unwrap();
        assert!(c.rsi.is_nan());
        assert_eq!(c.close, 1.5);
    }
}
