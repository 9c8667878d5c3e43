//! Signals and the closed set of signal generators.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use backtest_core::types::{Bar, Direction};

use crate::crossover::CrossoverSignals;
use crate::ema_vwap::EmaVwapSignals;
use crate::params::StrategyParams;

/// A directional signal produced on the close of a bar.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub direction: Direction,
    /// Human-readable reason, copied into the trade log
    pub reason: String,
}

impl Signal {
    pub fn new(direction: Direction, reason: impl Into<String>) -> Self {
        Self {
            direction,
            reason: reason.into(),
        }
    }
}

/// Relative distance under which two indicator values count as level.
pub const LEVEL_TOLERANCE: f64 = 1e-9;

/// Order `a` against `b`, treating values within [`LEVEL_TOLERANCE`] of
/// each other (relative to the larger magnitude, at least 1) as equal.
///
/// Averages of the same prices computed over different windows can differ
/// in the last few bits.
pub fn compare_levels(a: f64, b: f64) -> Ordering {
    let scale = a.abs().max(b.abs()).max(1.0);
    if (a - b).abs() <= LEVEL_TOLERANCE * scale {
        Ordering::Equal
    } else if a > b {
        Ordering::Greater
    } else {
        Ordering::Less
    }
}

/// Direction of a cross between two series, given their previous and
/// current ordering. A level previous state counts as either side.
pub fn cross_direction(prev: Ordering, now: Ordering) -> Option<Direction> {
    match (prev, now) {
        (Ordering::Less | Ordering::Equal, Ordering::Greater) => Some(Direction::Long),
        (Ordering::Greater | Ordering::Equal, Ordering::Less) => Some(Direction::Short),
        _ => None,
    }
}

/// Signal generator for one run, matching the strategy family.
#[derive(Debug, Clone)]
pub enum SignalGenerator {
    Crossover(CrossoverSignals),
    EmaVwap(EmaVwapSignals),
}

impl SignalGenerator {
    /// Build the generator for validated parameters.
    pub fn from_params(params: &StrategyParams) -> Self {
        match params {
            StrategyParams::Crossover(p) => SignalGenerator::Crossover(CrossoverSignals::new(
                p.fast_period,
                p.slow_period,
                p.source,
            )),
            StrategyParams::CrossoverMinimal(p) => SignalGenerator::Crossover(
                CrossoverSignals::new(p.fast_period, p.slow_period, p.source),
            ),
            StrategyParams::EmaVwap(p) => SignalGenerator::EmaVwap(EmaVwapSignals::new(p)),
        }
    }

    /// Feed one bar. Must be called exactly once per bar, in order.
    pub fn update(&mut self, bar: &Bar) -> Option<Signal> {
        match self {
            SignalGenerator::Crossover(g) => g.update(bar),
            SignalGenerator::EmaVwap(g) => g.update(bar),
        }
    }

    /// ADX for the trend filter, when the generator tracks one.
    pub fn adx(&self) -> Option<f64> {
        match self {
            SignalGenerator::Crossover(_) => None,
            SignalGenerator::EmaVwap(g) => g.adx(),
        }
    }

    pub fn record_indicators(&self, out: &mut BTreeMap<String, f64>) {
        match self {
            SignalGenerator::Crossover(g) => g.record_indicators(out),
            SignalGenerator::EmaVwap(g) => g.record_indicators(out),
        }
    }
}
