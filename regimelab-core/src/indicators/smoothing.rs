//! Series helpers shared by the indicator implementations.
//!
//! All helpers skip a leading run of `NaN` (warmup of an upstream series) and
//! poison every value after a `NaN` found past the seed.

use crate::domain::Candle;

/// True range per candle.
///
/// `TR[0] = high - low`; afterwards
/// `TR[t] = max(high - low, |high - close[t-1]|, |low - close[t-1]|)`.
pub fn true_range(candles: &[Candle]) -> Vec<f64> {
    let n = candles.len();
    let mut tr = vec![f64::NAN; n];
    if n == 0 {
        return tr;
    }
    tr[0] = candles[0].high - candles[0].low;
    for i in 1..n {
        let (h, l, pc) = (candles[i].high, candles[i].low, candles[i - 1].close);
        tr[i] = (h - l).max((h - pc).abs()).max((l - pc).abs());
    }
    tr
}

fn first_valid(values: &[f64]) -> Option<usize> {
    values.iter().position(|v| !v.is_nan())
}

fn recursive(values: &[f64], period: usize, alpha: f64) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if period == 0 {
        return result;
    }
    let start = match first_valid(values) {
        Some(s) => s,
        None => return result,
    };
    let seed_end = start + period;
    if seed_end > n {
        return result;
    }
    let seed_window = &values[start..seed_end];
    if seed_window.iter().any(|v| v.is_nan()) {
        return result;
    }
    let mut prev = seed_window.iter().sum::<f64>() / period as f64;
    result[seed_end - 1] = prev;

    for i in seed_end..n {
        if values[i].is_nan() {
            return result;
        }
        prev = alpha * values[i] + (1.0 - alpha) * prev;
        result[i] = prev;
    }
    result
}

/// Wilder smoothing (alpha = 1/period), seeded with the mean of the first
/// `period` valid values.
pub fn wilder_smooth(values: &[f64], period: usize) -> Vec<f64> {
    recursive(values, period, 1.0 / period.max(1) as f64)
}

/// Exponential moving average (alpha = 2/(period+1)), SMA-seeded.
pub fn ema_of_series(values: &[f64], period: usize) -> Vec<f64> {
    recursive(values, period, 2.0 / (period as f64 + 1.0))
}

/// Simple moving average over a trailing window.
pub fn sma_of_series(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if period == 0 || n < period {
        return result;
    }
    for i in (period - 1)..n {
        let window = &values[i + 1 - period..=i];
        if window.iter().all(|v| !v.is_nan()) {
            result[i] = window.iter().sum::<f64>() / period as f64;
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};

    #[test]
    fn wilder_seed_and_step() {
        let out = wilder_smooth(&[2.0, 4.0, 6.0, 10.0], 3);
        assert!(out[0].is_nan() && out[1].is_nan());
        assert_approx(out[2], 4.0, DEFAULT_EPSILON);
        // 4 + (10 - 4) / 3
        assert_approx(out[3], 6.0, DEFAULT_EPSILON);
    }

    #[test]
    fn leading_nan_run_is_skipped() {
        let out = ema_of_series(&[f64::NAN, f64::NAN, 1.0, 1.0, 1.0], 2);
        assert!(out[2].is_nan());
        assert_approx(out[3], 1.0, DEFAULT_EPSILON);
        assert_approx(out[4], 1.0, DEFAULT_EPSILON);
    }

    #[test]
    fn sma_window() {
        let out = sma_of_series(&[1.0, 2.0, 3.0, 4.0], 2);
        assert!(out[0].is_nan());
        assert_approx(out[1], 1.5, DEFAULT_EPSILON);
        assert_approx(out[3], 3.5, DEFAULT_EPSILON);
    }
}
