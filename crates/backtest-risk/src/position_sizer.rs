//! Position sizing.

use serde::{Deserialize, Serialize};

use backtest_core::error::ValidationError;

/// How `order_size_value` is turned into a quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderSizeMode {
    /// value percent of current equity, divided by entry price
    #[default]
    PercentOfEquity,
    /// value units, rounded to step size
    FixedQuantity,
    /// value in quote currency, divided by entry price
    FixedValue,
    /// value units verbatim: no derivation and no step rounding
    ExplicitQty,
}

/// Sizing parameters shared by every strategy family.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizingParams {
    pub order_size_mode: OrderSizeMode,
    pub order_size_value: f64,
}

impl Default for SizingParams {
    fn default() -> Self {
        Self {
            order_size_mode: OrderSizeMode::PercentOfEquity,
            order_size_value: 100.0,
        }
    }
}

impl SizingParams {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(self.order_size_value.is_finite() && self.order_size_value > 0.0) {
            return Err(ValidationError::InvalidParameter {
                name: "order_size_value",
                reason: format!("must be positive, got {}", self.order_size_value),
            });
        }
        Ok(())
    }
}

/// Position sizer calculates the quantity for a new position.
#[derive(Debug, Clone, Copy)]
pub struct PositionSizer {
    params: SizingParams,
}

impl PositionSizer {
    /// Create a new position sizer.
    pub fn new(params: SizingParams) -> Self {
        Self { params }
    }

    /// Quantity before step rounding. Zero when it cannot be sized.
    pub fn calculate(&self, equity: f64, entry_price: f64) -> f64 {
        let value = self.params.order_size_value;

        let quantity = match self.params.order_size_mode {
            OrderSizeMode::FixedQuantity | OrderSizeMode::ExplicitQty => value,
            OrderSizeMode::PercentOfEquity => {
                if entry_price <= 0.0 || equity <= 0.0 {
                    return 0.0;
                }
                equity * value / 100.0 / entry_price
            }
            OrderSizeMode::FixedValue => {
                if entry_price <= 0.0 {
                    return 0.0;
                }
                value / entry_price
            }
        };

        if quantity.is_finite() && quantity > 0.0 {
            quantity
        } else {
            0.0
        }
    }

    /// Whether the quantity is subject to step rounding.
    pub fn rounds_to_step(&self) -> bool {
        self.params.order_size_mode != OrderSizeMode::ExplicitQty
    }
}
