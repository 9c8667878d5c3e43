//! Backtesting engine.
//!
//! Replays a bar series through one strategy family and returns the trade
//! log, equity and PnL curves, summary statistics and a per-bar log. Every
//! entry point is a pure function of its inputs.

mod batch;
mod engine;
mod position;
mod report;
mod statistics;

pub use batch::{score_runs, RunScore};
pub use engine::{
    run_backtest, run_crossover_backtest, run_crossover_minimal_backtest, run_ema_vwap_backtest,
};
pub use position::OpenPosition;
pub use report::BacktestReport;
pub use statistics::{profit_factor, Aggregator, PROFIT_FACTOR_CAP};
