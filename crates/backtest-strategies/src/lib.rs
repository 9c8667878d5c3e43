//! Strategy families for the backtesting engine.
//!
//! This crate provides:
//! - Parameter records for each family, tagged by `StrategyParams`
//! - SMA crossover signals (shared by the full and minimal families)
//! - EMA/VWAP signals with delayed confirmation and a DMI trend filter
//! - A registry that builds parameters by name

mod crossover;
mod ema_vwap;
mod params;
mod registry;
mod signal;

pub use crossover::CrossoverSignals;
pub use ema_vwap::EmaVwapSignals;
pub use params::{
    ConfirmationMode, CrossoverParams, EmaVwapParams, MinimalCrossoverParams, StrategyParams,
};
pub use registry::{StrategyInfo, StrategyRegistry};
pub use signal::{compare_levels, cross_direction, Signal, SignalGenerator, LEVEL_TOLERANCE};
