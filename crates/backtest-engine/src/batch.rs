//! Scores for callers that run many backtests and rank them.

use serde::{Deserialize, Serialize};
use tracing::warn;

use backtest_core::error::EngineError;
use backtest_core::types::{BacktestResult, BacktestSummary, Bar, CostConfig, RoundingFlags};
use backtest_strategies::StrategyParams;

use crate::engine::run_backtest;

/// The figures a grid search or resampling loop reads from one run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunScore {
    pub profit_factor: f64,
    pub pnl_total: f64,
    pub max_drawdown_percent: f64,
    pub total_trades: usize,
    /// The run returned an error and the other fields are placeholders
    pub failed: bool,
}

impl RunScore {
    /// Worst-case placeholder for a failed run.
    pub const FAILED: RunScore = RunScore {
        profit_factor: 0.0,
        pnl_total: 0.0,
        max_drawdown_percent: 100.0,
        total_trades: 0,
        failed: true,
    };

    pub fn from_summary(summary: &BacktestSummary) -> Self {
        Self {
            profit_factor: summary.profit_factor,
            pnl_total: summary.pnl_total,
            max_drawdown_percent: summary.max_drawdown_percent,
            total_trades: summary.total_trades,
            failed: false,
        }
    }

    /// Score a run outcome, mapping errors to [`RunScore::FAILED`].
    pub fn from_outcome(outcome: &Result<BacktestResult, EngineError>) -> Self {
        match outcome {
            Ok(result) => Self::from_summary(&result.summary),
            Err(_) => Self::FAILED,
        }
    }
}

/// Run every parameter set against the same bars, in order.
///
/// A failing run is logged and scored with the placeholder; it never stops
/// the remaining runs.
pub fn score_runs(
    bars: &[Bar],
    cost: CostConfig,
    initial_capital: f64,
    candidates: &[StrategyParams],
    rounding: RoundingFlags,
) -> Vec<RunScore> {
    candidates
        .iter()
        .map(|params| {
            let outcome = run_backtest(bars, cost, initial_capital, params, rounding);
            if let Err(e) = &outcome {
                warn!(strategy = params.name(), error = %e, "Backtest run failed");
            }
            RunScore::from_outcome(&outcome)
        })
        .collect()
}
