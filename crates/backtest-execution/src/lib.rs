//! Fill simulation for the backtesting engine.
//!
//! Applies slippage in ticks, percentage commission, and tick/step
//! rounding to every price and quantity the engine records.

mod model;
mod rounding;

pub use model::{ExecutionModel, Fill};
pub use rounding::round_to_increment;
