//! Technical indicators for the backtesting engine.
//!
//! This crate provides:
//! - Moving averages (SMA, EMA), batch and streaming
//! - Wilder-smoothed volatility (RMA, ATR)
//! - Directional movement (+DI, -DI, ADX)
//! - Anchored VWAP with session, day, week and month resets
//!
//! Streaming indicators report `None` until their lookback window has
//! filled. Batch output from `Indicator::calculate` is aligned with the
//! input; `compute_indicator_series` returns ready values only.

pub mod directional;
pub mod moving_average;
pub mod series;
pub mod simd;
pub mod volatility;
pub mod vwap;

pub use directional::{Dmi, DmiOutput};
pub use moving_average::{Ema, Sma, StreamingEma, StreamingSma};
pub use series::{compute_indicator_series, IndicatorKind};
pub use volatility::{Atr, Rma, StreamingAtr};
pub use vwap::{AnchoredVwap, VwapAnchor};
