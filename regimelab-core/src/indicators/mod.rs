//! Indicator enrichment.
//!
//! Indicators are pure functions: candle history in, numeric series out,
//! computed once before the simulation loop. [`enrich`] fills every missing
//! (`NaN`) indicator column of a candle series from OHLCV and keeps values that
//! were supplied with the input.
//!
//! # Look-ahead contamination guard
//! No indicator value at candle t may depend on candle t+1 or later. Every
//! indicator must pass the truncated-vs-full series test.

pub mod adx;
pub mod atr;
pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod mfi;
pub mod rsi;
pub mod smoothing;
pub mod stochastic;

pub use adx::Adx;
pub use atr::Atr;
pub use bollinger::{Bollinger, BollingerBand};
pub use ema::Ema;
pub use macd::{Macd, MacdLine};
pub use mfi::Mfi;
pub use rsi::Rsi;
pub use stochastic::{StochLine, Stochastic};

use serde::{Deserialize, Serialize};

use crate::domain::Candle;

/// A single-series indicator.
///
/// `compute` returns one value per candle; the first `lookback()` values are
/// `NaN`.
pub trait Indicator: Send + Sync {
    fn name(&self) -> &str;

    /// Candles needed before the indicator produces valid output.
    fn lookback(&self) -> usize;

    fn compute(&self, candles: &[Candle]) -> Vec<f64>;
}

/// Periods for the enriched indicator columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorParams {
    pub rsi_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub adx_period: usize,
    pub atr_period: usize,
    pub mfi_period: usize,
    pub bb_period: usize,
    pub bb_std: f64,
    pub stoch_k: usize,
    pub stoch_d: usize,
    pub ema_fast: usize,
    pub ema_slow: usize,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            adx_period: 14,
            atr_period: 14,
            mfi_period: 14,
            bb_period: 20,
            bb_std: 2.0,
            stoch_k: 14,
            stoch_d: 3,
            ema_fast: 12,
            ema_slow: 26,
        }
    }
}

impl IndicatorParams {
    /// Longest warmup across all enriched columns.
    pub fn max_lookback(&self) -> usize {
        self.indicators()
            .iter()
            .map(|(_, ind)| ind.lookback())
            .max()
            .unwrap_or(0)
    }

    fn indicators(&self) -> Vec<(Column, Box<dyn Indicator>)> {
        let bb = |band| boxed(Bollinger::new(self.bb_period, self.bb_std, band));
        let (fast, slow, signal) = (self.macd_fast, self.macd_slow, self.macd_signal);
        vec![
            (Column::Rsi, boxed(Rsi::new(self.rsi_period))),
            (Column::Macd, boxed(Macd::line(fast, slow, signal))),
            (Column::MacdSignal, boxed(Macd::signal(fast, slow, signal))),
            (Column::Adx, boxed(Adx::new(self.adx_period))),
            (Column::Atr, boxed(Atr::new(self.atr_period))),
            (Column::Mfi, boxed(Mfi::new(self.mfi_period))),
            (Column::BbUpper, bb(BollingerBand::Upper)),
            (Column::BbMiddle, bb(BollingerBand::Middle)),
            (Column::BbLower, bb(BollingerBand::Lower)),
            (
                Column::StochK,
                boxed(Stochastic::new(self.stoch_k, self.stoch_d, StochLine::K)),
            ),
            (
                Column::StochD,
                boxed(Stochastic::new(self.stoch_k, self.stoch_d, StochLine::D)),
            ),
            (Column::EmaFast, boxed(Ema::new(self.ema_fast))),
            (Column::EmaSlow, boxed(Ema::new(self.ema_slow))),
        ]
    }
}

fn boxed<I: Indicator + 'static>(indicator: I) -> Box<dyn Indicator> {
    Box::new(indicator)
}

#[derive(Debug, Clone, Copy)]
enum Column {
    Rsi,
    Macd,
    MacdSignal,
    Adx,
    Atr,
    Mfi,
    BbUpper,
    BbMiddle,
    BbLower,
    StochK,
    StochD,
    EmaFast,
    EmaSlow,
}

impl Column {
    fn slot(self, candle: &mut Candle) -> &mut f64 {
        match self {
            Self::Rsi => &mut candle.rsi,
            Self::Macd => &mut candle.macd,
            Self::MacdSignal => &mut candle.macd_signal,
            Self::Adx => &mut candle.adx,
            Self::Atr => &mut candle.atr,
            Self::Mfi => &mut candle.mfi,
            Self::BbUpper => &mut candle.bb_upper,
            Self::BbMiddle => &mut candle.bb_middle,
            Self::BbLower => &mut candle.bb_lower,
            Self::StochK => &mut candle.stoch_k,
            Self::StochD => &mut candle.stoch_d,
            Self::EmaFast => &mut candle.ema_fast,
            Self::EmaSlow => &mut candle.ema_slow,
        }
    }
}

/// Fill missing indicator columns in place.
///
/// Values already present are kept. Warmup positions stay `NaN`.
pub fn enrich(candles: &mut [Candle], params: &IndicatorParams) {
    for (column, indicator) in params.indicators() {
        let series = indicator.compute(candles);
        for (candle, value) in candles.iter_mut().zip(series) {
            let slot = column.slot(candle);
            if slot.is_nan() {
                *slot = value;
            }
        }
    }
}

/// Count of candles that still have at least one missing indicator column.
pub fn count_missing(candles: &[Candle]) -> usize {
    candles.iter().filter(|c| c.has_missing_indicators()).count()
}

pub(crate) fn closes(candles: &[Candle]) -> Vec<f64> {
    candles.iter().map(|c| c.close).collect()
}

/// Candles from closes: open = previous close, high/low one unit outside.
#[cfg(test)]
pub fn make_candles(closes: &[f64]) -> Vec<Candle> {
    let data: Vec<(f64, f64, f64, f64)> = closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            (open, open.max(close) + 1.0, open.min(close) - 1.0, close)
        })
        .collect();
    make_ohlc_candles(&data)
}

#[cfg(test)]
pub fn make_ohlc_candles(data: &[(f64, f64, f64, f64)]) -> Vec<Candle> {
    let base = chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    data.iter()
        .enumerate()
        .map(|(i, &(o, h, l, c))| {
            Candle::new(base + chrono::Duration::hours(i as i64), o, h, l, c, 1_000.0)
        })
        .collect()
}

#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
