//! Stochastic oscillator.
//!
//! %K = 100 * (close - lowest low) / (highest high - lowest low) over
//! `k_period`; a zero range reads as 50. %D is the SMA of %K over `d_period`.

use super::smoothing::sma_of_series;
use super::Indicator;
use crate::domain::Candle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StochLine {
    K,
    D,
}

#[derive(Debug, Clone)]
pub struct Stochastic {
    k_period: usize,
    d_period: usize,
    line: StochLine,
    name: String,
}

impl Stochastic {
    pub fn new(k_period: usize, d_period: usize, line: StochLine) -> Self {
        let (k_period, d_period) = (k_period.max(1), d_period.max(1));
        let tag = match line {
            StochLine::K => "k",
            StochLine::D => "d",
        };
        Self {
            k_period,
            d_period,
            line,
            name: format!("stoch_{tag}_{k_period}_{d_period}"),
        }
    }
}

fn percent_k(candles: &[Candle], period: usize) -> Vec<f64> {
    let n = candles.len();
    let mut k = vec![f64::NAN; n];
    if n < period {
        return k;
    }
    for (i, slot) in k.iter_mut().enumerate().skip(period - 1) {
        let window = &candles[i + 1 - period..=i];
        let hh = window.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max);
        let ll = window.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
        let range = hh - ll;
        *slot = if range > 0.0 {
            100.0 * (candles[i].close - ll) / range
        } else {
            50.0
        };
    }
    k
}

impl Indicator for Stochastic {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        match self.line {
            StochLine::K => self.k_period - 1,
            StochLine::D => self.k_period + self.d_period - 2,
        }
    }

    fn compute(&self, candles: &[Candle]) -> Vec<f64> {
        let k = percent_k(candles, self.k_period);
        match self.line {
            StochLine::K => k,
            StochLine::D => sma_of_series(&k, self.d_period),
        }
    }
}
