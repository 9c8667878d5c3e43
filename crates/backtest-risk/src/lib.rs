//! Risk management for backtests.
//!
//! Provides position sizing, stop-loss and take-profit levels, and the
//! guards that block new entries.

mod guards;
mod position_sizer;
mod stop_loss;

pub use guards::{
    consecutive_loss_guard, direction_guard, dmi_guard, drawdown_guard, observe_equity,
    EntryGuards, GuardCheck, GuardParams, RunState,
};
pub use position_sizer::{OrderSizeMode, PositionSizer, SizingParams};
pub use stop_loss::{
    check_levels, initial_levels, trail, ExitParams, LevelHit, Levels, SlTpMethod, TargetSource,
};
