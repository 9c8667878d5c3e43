//! Execution cost and exchange rounding configuration.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Exchange-imposed price and quantity increments for one instrument.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SymbolFilters {
    /// Minimum price increment
    pub tick_size: f64,
    /// Minimum quantity increment
    pub step_size: f64,
}

impl SymbolFilters {
    /// Used when the exchange metadata lookup fails.
    pub const FALLBACK: SymbolFilters = SymbolFilters {
        tick_size: 0.01,
        step_size: 0.01,
    };
}

impl Default for SymbolFilters {
    fn default() -> Self {
        Self::FALLBACK
    }
}

/// Per-run cost model. Immutable for the duration of a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostConfig {
    /// Commission in percent of notional, charged on entry and on exit (0.1 = 0.1%)
    pub commission_percent: f64,
    /// Adverse slippage applied to every fill, in ticks
    pub slippage_ticks: f64,
    /// Minimum price increment
    pub tick_size: f64,
    /// Minimum quantity increment
    pub step_size: f64,
}

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            commission_percent: 0.1,
            slippage_ticks: 0.0,
            tick_size: SymbolFilters::FALLBACK.tick_size,
            step_size: SymbolFilters::FALLBACK.step_size,
        }
    }
}

impl CostConfig {
    /// Replace tick and step size with an instrument's filters.
    pub fn with_filters(mut self, filters: SymbolFilters) -> Self {
        self.tick_size = filters.tick_size;
        self.step_size = filters.step_size;
        self
    }

    /// Absolute slippage in price units.
    #[inline]
    pub fn slippage_amount(&self) -> f64 {
        self.slippage_ticks * self.tick_size
    }

    /// Validate the cost model.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(self.tick_size.is_finite() && self.tick_size > 0.0) {
            return Err(ValidationError::InvalidCost(format!(
                "tick_size must be positive, got {}",
                self.tick_size
            )));
        }
        if !(self.step_size.is_finite() && self.step_size > 0.0) {
            return Err(ValidationError::InvalidCost(format!(
                "step_size must be positive, got {}",
                self.step_size
            )));
        }
        if !(self.commission_percent.is_finite() && self.commission_percent >= 0.0) {
            return Err(ValidationError::InvalidCost(format!(
                "commission_percent must be non-negative, got {}",
                self.commission_percent
            )));
        }
        if !(self.slippage_ticks.is_finite() && self.slippage_ticks >= 0.0) {
            return Err(ValidationError::InvalidCost(format!(
                "slippage_ticks must be non-negative, got {}",
                self.slippage_ticks
            )));
        }
        Ok(())
    }
}

/// Independent toggles for exchange rounding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoundingFlags {
    /// Snap entry/exit prices to tick_size
    pub price_to_tick: bool,
    /// Snap position size to step_size
    pub quantity_step: bool,
    /// Snap stop/target levels to tick_size
    pub sl_tp_tick: bool,
}

impl RoundingFlags {
    /// Every rounding step enabled.
    pub const fn all() -> Self {
        Self {
            price_to_tick: true,
            quantity_step: true,
            sl_tp_tick: true,
        }
    }

    /// No rounding at all.
    pub const fn none() -> Self {
        Self {
            price_to_tick: false,
            quantity_step: false,
            sl_tp_tick: false,
        }
    }
}

impl Default for RoundingFlags {
    fn default() -> Self {
        Self::all()
    }
}
