//! Money Flow Index.
//!
//! Volume-weighted RSI over typical price `(high + low + close) / 3`.
//! Lookback: period.

use super::Indicator;
use crate::domain::Candle;

#[derive(Debug, Clone)]
pub struct Mfi {
    period: usize,
    name: String,
}

impl Mfi {
    pub fn new(period: usize) -> Self {
        let period = period.max(1);
        Self {
            period,
            name: format!("mfi_{period}"),
        }
    }
}

impl Indicator for Mfi {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, candles: &[Candle]) -> Vec<f64> {
        let n = candles.len();
        let mut result = vec![f64::NAN; n];
        if n < self.period + 1 {
            return result;
        }

        let typical: Vec<f64> = candles
            .iter()
            .map(|c| (c.high + c.low + c.close) / 3.0)
            .collect();

        // Signed raw money flow per candle, flow[0] undefined.
        let mut flow = vec![(0.0, 0.0); n];
        for i in 1..n {
            let raw = typical[i] * candles[i].volume;
            flow[i] = if typical[i] > typical[i - 1] {
                (raw, 0.0)
            } else if typical[i] < typical[i - 1] {
                (0.0, raw)
            } else {
                (0.0, 0.0)
            };
        }

        for (i, slot) in result.iter_mut().enumerate().skip(self.period) {
            let window = &flow[i + 1 - self.period..=i];
            let pos: f64 = window.iter().map(|f| f.0).sum();
            let neg: f64 = window.iter().map(|f| f.1).sum();
            *slot = if pos.is_nan() || neg.is_nan() {
                f64::NAN
            } else if pos == 0.0 && neg == 0.0 {
                50.0
            } else if neg == 0.0 {
                100.0
            } else {
                100.0 - 100.0 / (1.0 + pos / neg)
            };
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_candles, DEFAULT_EPSILON};

    #[test]
    fn rising_prices_give_full_inflow() {
        let candles = make_candles(&[10.0, 11.0, 12.0, 13.0]);
        let out = Mfi::new(3).compute(&candles);
        assert!(out[2].is_nan());
        assert_approx(out[3], 100.0, DEFAULT_EPSILON);
    }

    #[test]
    fn mixed_flow_in_range() {
        let candles = make_candles(&[10.0, 11.0, 8.0, 12.0, 9.0, 13.0]);
        let out = Mfi::new(3).compute(&candles);
        for v in &out[3..] {
            assert!(*v > 0.0 && *v < 100.0);
        }
    }
}
