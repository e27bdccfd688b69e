//! Domain types for RegimeLab

pub mod candle;
pub mod equity;
pub mod position;
pub mod regime;
pub mod strategy_kind;
pub mod timeframe;
pub mod trade;

pub use candle::{Candle, IndicatorSnapshot};
pub use equity::EquityPoint;
pub use position::Position;
pub use regime::{MarketState, RegimeTable};
pub use strategy_kind::StrategyKind;
pub use timeframe::Timeframe;
pub use trade::{ExitReason, Trade};
