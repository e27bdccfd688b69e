//! MACD: EMA(fast) - EMA(slow) of close, with an EMA signal line.
//!
//! Two lines, exposed as separate instances like the band indicators.
//! Lookback: slow - 1 for the MACD line, slow + signal - 2 for the signal.

use super::smoothing::ema_of_series;
use super::{closes, Indicator};
use crate::domain::Candle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacdLine {
    Macd,
    Signal,
}

#[derive(Debug, Clone)]
pub struct Macd {
    fast: usize,
    slow: usize,
    signal: usize,
    line: MacdLine,
    name: String,
}

impl Macd {
    fn with_line(fast: usize, slow: usize, signal: usize, line: MacdLine) -> Self {
        let (fast, slow, signal) = (fast.max(1), slow.max(1), signal.max(1));
        let tag = match line {
            MacdLine::Macd => "macd",
            MacdLine::Signal => "macd_signal",
        };
        Self {
            fast,
            slow,
            signal,
            line,
            name: format!("{tag}_{fast}_{slow}_{signal}"),
        }
    }

    pub fn line(fast: usize, slow: usize, signal: usize) -> Self {
        Self::with_line(fast, slow, signal, MacdLine::Macd)
    }

    pub fn signal(fast: usize, slow: usize, signal: usize) -> Self {
        Self::with_line(fast, slow, signal, MacdLine::Signal)
    }
}

/// MACD line for the given close series.
pub fn macd_line(closes: &[f64], fast: usize, slow: usize) -> Vec<f64> {
    let f = ema_of_series(closes, fast);
    let s = ema_of_series(closes, slow);
    f.iter().zip(&s).map(|(a, b)| a - b).collect()
}

impl Indicator for Macd {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        let base = self.fast.max(self.slow) - 1;
        match self.line {
            MacdLine::Macd => base,
            MacdLine::Signal => base + self.signal - 1,
        }
    }

    fn compute(&self, candles: &[Candle]) -> Vec<f64> {
        let line = macd_line(&closes(candles), self.fast, self.slow);
        match self.line {
            MacdLine::Macd => line,
            MacdLine::Signal => ema_of_series(&line, self.signal),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_candles;

    #[test]
    fn macd_positive_in_uptrend() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let candles = make_candles(&closes);
        let line = Macd::line(12, 26, 9).compute(&candles);
        let signal = Macd::signal(12, 26, 9).compute(&candles);
        assert!(line[24].is_nan());
        assert!(line[25] > 0.0);
        assert!(signal[32].is_nan());
        assert!(signal[33].is_finite());
        assert!(line[59] > 0.0 && signal[59] > 0.0);
    }

    #[test]
    fn lookback_matches_first_value() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + (i as f64).sin()).collect();
        let candles = make_candles(&closes);
        for ind in [Macd::line(12, 26, 9), Macd::signal(12, 26, 9)] {
            let out = ind.compute(&candles);
            let lb = ind.lookback();
            assert!(out[lb - 1].is_nan(), "{}", ind.name());
            assert!(out[lb].is_finite(), "{}", ind.name());
        }
    }
}
