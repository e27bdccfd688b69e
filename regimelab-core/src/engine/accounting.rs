//! Fill arithmetic. Fees and slippage always work against the account.

use crate::config::ExecutionConfig;

/// A filled buy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BuyFill {
    /// Close plus slippage.
    pub price: f64,
    pub quantity: f64,
    pub fee: f64,
    /// Notional plus fee. Equals the budget.
    pub cost: f64,
}

/// A filled sell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SellFill {
    /// Close minus slippage.
    pub price: f64,
    pub quantity: f64,
    pub fee: f64,
    /// Notional minus fee.
    pub proceeds: f64,
}

/// Spend `budget` at `close`. The fee is carved out of the budget, so
/// `cost == budget` and cash never goes negative.
///
/// Returns `None` for a non-positive budget or price.
pub fn buy_fill(budget: f64, close: f64, exec: &ExecutionConfig) -> Option<BuyFill> {
    let price = close * (1.0 + exec.slippage);
    if !(budget > 0.0 && price > 0.0 && price.is_finite()) {
        return None;
    }
    let quantity = budget / (price * (1.0 + exec.fee_rate));
    let notional = quantity * price;
    let fee = notional * exec.fee_rate;
    Some(BuyFill {
        price,
        quantity,
        fee,
        cost: notional + fee,
    })
}

/// Sell `quantity` units at `close`.
pub fn sell_fill(quantity: f64, close: f64, exec: &ExecutionConfig) -> SellFill {
    let price = close * (1.0 - exec.slippage);
    let notional = quantity * price;
    let fee = notional * exec.fee_rate;
    SellFill {
        price,
        quantity,
        fee,
        proceeds: notional - fee,
    }
}
