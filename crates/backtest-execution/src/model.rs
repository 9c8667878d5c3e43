//! Execution model for simulated fills.

use backtest_core::types::{CostConfig, Direction, RoundingFlags};

use crate::rounding::round_to_increment;

/// A simulated fill.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fill {
    /// Executed price after slippage and rounding
    pub price: f64,
    pub quantity: f64,
    /// Commission charged on this fill
    pub commission: f64,
}

/// Applies slippage, commission and exchange rounding.
///
/// Slippage always moves the price against the trader: long entries and
/// short exits pay more, long exits and short entries receive less.
#[derive(Debug, Clone, Copy)]
pub struct ExecutionModel {
    cost: CostConfig,
    rounding: RoundingFlags,
}

impl ExecutionModel {
    /// Create a new execution model.
    pub fn new(cost: CostConfig, rounding: RoundingFlags) -> Self {
        Self { cost, rounding }
    }

    pub fn cost(&self) -> &CostConfig {
        &self.cost
    }

    pub fn rounding(&self) -> RoundingFlags {
        self.rounding
    }

    /// Executed price for opening a position at `raw_price`.
    pub fn apply_entry_cost(&self, raw_price: f64, direction: Direction) -> f64 {
        let slippage = self.cost.slippage_amount();
        let price = match direction {
            Direction::Long => raw_price + slippage,
            Direction::Short => raw_price - slippage,
        };
        self.round_price(price)
    }

    /// Executed price for closing a position at `raw_price`. Never negative.
    pub fn apply_exit_cost(&self, raw_price: f64, direction: Direction) -> f64 {
        let slippage = self.cost.slippage_amount();
        let price = match direction {
            Direction::Long => raw_price - slippage,
            Direction::Short => raw_price + slippage,
        };
        self.round_price(price.max(0.0))
    }

    /// Commission for a fill of `quantity` at `price`.
    #[inline]
    pub fn commission(&self, price: f64, quantity: f64) -> f64 {
        (price * quantity).abs() * self.cost.commission_percent / 100.0
    }

    /// Snap a fill price to tick_size when `price_to_tick` is set.
    pub fn round_price(&self, price: f64) -> f64 {
        if self.rounding.price_to_tick {
            round_to_increment(price, self.cost.tick_size)
        } else {
            price
        }
    }

    /// Snap a position size to step_size when `quantity_step` is set.
    pub fn round_quantity(&self, quantity: f64) -> f64 {
        if self.rounding.quantity_step {
            round_to_increment(quantity, self.cost.step_size)
        } else {
            quantity
        }
    }

    /// Snap a stop or target level to tick_size when `sl_tp_tick` is set.
    pub fn round_level(&self, level: f64) -> f64 {
        if self.rounding.sl_tp_tick {
            round_to_increment(level, self.cost.tick_size)
        } else {
            level
        }
    }

    /// Fill for opening a position. `quantity` is used as given.
    pub fn fill_entry(&self, raw_price: f64, quantity: f64, direction: Direction) -> Fill {
        let price = self.apply_entry_cost(raw_price, direction);
        Fill {
            price,
            quantity,
            commission: self.commission(price, quantity),
        }
    }

    /// Fill for closing a position of `quantity`.
    pub fn fill_exit(&self, raw_price: f64, quantity: f64, direction: Direction) -> Fill {
        let price = self.apply_exit_cost(raw_price, direction);
        Fill {
            price,
            quantity,
            commission: self.commission(price, quantity),
        }
    }
}
