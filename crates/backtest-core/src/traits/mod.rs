//! Core traits for the backtesting engine.

mod data_source;
mod indicator;

pub use data_source::{BarProvider, ExchangeMetadata, MAX_BARS_PER_REQUEST};
pub use indicator::{BarIndicator, Indicator, StreamingIndicator};
