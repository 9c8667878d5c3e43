//! Increment rounding in exact decimal arithmetic.

use num_traits::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};

/// Snap `value` to the nearest multiple of `increment`, ties away from zero.
///
/// Non-finite input or a non-positive increment returns `value` unchanged.
/// Values outside the decimal range fall back to f64 arithmetic, whose
/// `round` has the same tie rule.
pub fn round_to_increment(value: f64, increment: f64) -> f64 {
    if !value.is_finite() || !increment.is_finite() || increment <= 0.0 {
        return value;
    }

    round_decimal(value, increment).unwrap_or_else(|| (value / increment).round() * increment)
}

fn round_decimal(value: f64, increment: f64) -> Option<f64> {
    let value = Decimal::from_f64(value)?;
    let increment = Decimal::from_f64(increment)?;
    if increment.is_zero() {
        return None;
    }

    let steps = value
        .checked_div(increment)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    steps.checked_mul(increment)?.to_f64()
}
