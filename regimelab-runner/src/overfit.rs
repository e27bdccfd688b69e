//! In-sample vs out-of-sample overfitting check.

use serde::{Deserialize, Serialize};

use crate::metrics::PerformanceMetrics;

/// Default minimum acceptable OOS/IS return ratio.
pub const DEFAULT_OVERFIT_THRESHOLD: f64 = 0.6;

/// Verdict comparing in-sample and out-of-sample returns.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverfitVerdict {
    pub in_sample_return: f64,
    pub out_of_sample_return: f64,
    /// `oos / is`; `None` when the in-sample return is not positive.
    pub ratio: Option<f64>,
    pub threshold: f64,
    pub overfit: bool,
}

/// `ratio = oos / is`; overfit when `is <= 0` or `ratio < threshold`.
pub fn check(in_sample_return: f64, out_of_sample_return: f64, threshold: f64) -> OverfitVerdict {
    let ratio = (in_sample_return > 0.0).then(|| out_of_sample_return / in_sample_return);
    let overfit = match ratio {
        Some(r) => r.is_nan() || r < threshold,
        None => true,
    };
    OverfitVerdict {
        in_sample_return,
        out_of_sample_return,
        ratio,
        threshold,
        overfit,
    }
}

/// [`check`] over two metric sets' total returns.
pub fn check_metrics(
    in_sample: &PerformanceMetrics,
    out_of_sample: &PerformanceMetrics,
    threshold: f64,
) -> OverfitVerdict {
    check(in_sample.total_return, out_of_sample.total_return, threshold)
}
