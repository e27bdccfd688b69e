use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One equity snapshot per simulated candle.
///
/// `total == cash + position_value` holds exactly: `total` is always built
/// through [`EquityPoint::new`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: NaiveDateTime,
    pub cash: f64,
    pub position_value: f64,
    pub total: f64,
}

impl EquityPoint {
    pub fn new(timestamp: NaiveDateTime, cash: f64, position_value: f64) -> Self {
        Self {
            timestamp,
            cash,
            position_value,
            total: cash + position_value,
        }
    }
}

/// Extract the `total` column of an equity curve.
pub fn totals(curve: &[EquityPoint]) -> Vec<f64> {
    curve.iter().map(|p| p.total).collect()
}
