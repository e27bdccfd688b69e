//! Bollinger Bands: SMA(close) +/- multiplier * population stddev.
//!
//! Each band is its own instance. Lookback: period - 1.

use super::Indicator;
use crate::domain::Candle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BollingerBand {
    Upper,
    Middle,
    Lower,
}

#[derive(Debug, Clone)]
pub struct Bollinger {
    period: usize,
    multiplier: f64,
    band: BollingerBand,
    name: String,
}

impl Bollinger {
    pub fn new(period: usize, multiplier: f64, band: BollingerBand) -> Self {
        let period = period.max(1);
        let tag = match band {
            BollingerBand::Upper => "upper",
            BollingerBand::Middle => "middle",
            BollingerBand::Lower => "lower",
        };
        Self {
            period,
            multiplier,
            band,
            name: format!("bollinger_{tag}_{period}_{multiplier}"),
        }
    }
}

impl Indicator for Bollinger {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, candles: &[Candle]) -> Vec<f64> {
        let n = candles.len();
        let mut result = vec![f64::NAN; n];
        if n < self.period {
            return result;
        }
        let p = self.period as f64;
        for (i, slot) in result.iter_mut().enumerate().skip(self.period - 1) {
            let window = &candles[i + 1 - self.period..=i];
            let mean = window.iter().map(|c| c.close).sum::<f64>() / p;
            let var = window.iter().map(|c| (c.close - mean).powi(2)).sum::<f64>() / p;
            let width = self.multiplier * var.sqrt();
            *slot = match self.band {
                BollingerBand::Upper => mean + width,
                BollingerBand::Middle => mean,
                BollingerBand::Lower => mean - width,
            };
        }
        result
    }
}
