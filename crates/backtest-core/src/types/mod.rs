//! Core data types for the backtesting engine.

mod cost;
mod ohlcv;
mod result;
mod timeframe;
mod trade;

pub use cost::{CostConfig, RoundingFlags, SymbolFilters};
pub use ohlcv::{prices, validate_bars, Bar, PriceSource};
pub use result::{BacktestResult, BacktestSummary, BarRecord, EquityPoint, PnlPoint};
pub use timeframe::Timeframe;
pub use trade::{Direction, DirectionFilter, EventType, ExitReason, PositionSide, TradeEvent};
