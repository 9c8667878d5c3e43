//! Core types and traits for the backtesting engine.
//!
//! This crate provides the foundational building blocks including:
//! - Market data types (Bar, PriceSource, Timeframe)
//! - Cost model and rounding configuration
//! - Trade events, equity/PnL points and run summaries
//! - Core traits for indicators and external data providers

pub mod types;
pub mod traits;
pub mod error;

pub use error::{EngineError, EngineResult};
pub use types::*;
pub use traits::*;
