//! Stop-loss and take-profit levels.
//!
//! Levels are set once at entry. Only the trailing stop moves afterwards,
//! and it only ever moves in the position's favor.

use serde::{Deserialize, Serialize};

use backtest_core::error::ValidationError;
use backtest_core::types::{Bar, Direction, ExitReason};

/// How protective levels are derived at entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SlTpMethod {
    /// Stop `atr_mult_rb * ATR` away, target `reward_mult_rb` times that risk
    RiskBased,
    /// Stop and target at fixed percentages of the entry price
    #[default]
    FixedPercent,
    /// Percentage stop that follows the best price seen, optional fixed target
    TrailingPercent,
    /// Risk-based and fixed levels together: tighter stop, nearer target
    Combined,
}

/// Exit parameters shared by the full-featured strategy families.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExitParams {
    pub sl_tp_method: SlTpMethod,
    pub atr_length: usize,
    pub atr_mult_rb: f64,
    pub reward_mult_rb: f64,
    pub fixed_sl_perc: f64,
    pub fixed_tp_perc: f64,
    pub trailing_sl_perc: f64,
    /// Target for the trailing method; none when absent or zero
    pub fixed_tp_for_trailing_perc: Option<f64>,
}

impl Default for ExitParams {
    fn default() -> Self {
        Self {
            sl_tp_method: SlTpMethod::FixedPercent,
            atr_length: 14,
            atr_mult_rb: 1.5,
            reward_mult_rb: 2.0,
            fixed_sl_perc: 2.0,
            fixed_tp_perc: 4.0,
            trailing_sl_perc: 2.0,
            fixed_tp_for_trailing_perc: None,
        }
    }
}

impl ExitParams {
    /// Whether entry levels depend on ATR.
    pub fn needs_atr(&self) -> bool {
        matches!(self.sl_tp_method, SlTpMethod::RiskBased | SlTpMethod::Combined)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.atr_length == 0 {
            return Err(ValidationError::InvalidPeriod { name: "atr_length" });
        }
        positive("atr_mult_rb", self.atr_mult_rb)?;
        positive("reward_mult_rb", self.reward_mult_rb)?;
        percent("fixed_sl_perc", self.fixed_sl_perc)?;
        positive("fixed_tp_perc", self.fixed_tp_perc)?;
        percent("trailing_sl_perc", self.trailing_sl_perc)?;
        if let Some(tp) = self.fixed_tp_for_trailing_perc {
            if !(tp.is_finite() && tp >= 0.0) {
                return Err(ValidationError::InvalidParameter {
                    name: "fixed_tp_for_trailing_perc",
                    reason: format!("must be zero or positive, got {}", tp),
                });
            }
        }
        Ok(())
    }
}

fn positive(name: &'static str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ValidationError::InvalidParameter {
            name,
            reason: format!("must be positive, got {}", value),
        })
    }
}

// A stop percentage at or above 100 would put a long stop at or below zero.
fn percent(name: &'static str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() && value > 0.0 && value < 100.0 {
        Ok(())
    } else {
        Err(ValidationError::InvalidParameter {
            name,
            reason: format!("must be in (0, 100), got {}", value),
        })
    }
}

/// Where a take-profit level came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetSource {
    RiskBased,
    Fixed,
}

/// Protective levels of an open position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Levels {
    pub stop: f64,
    pub target: Option<f64>,
    /// Stop follows the best price seen
    pub trailing: bool,
    /// Set only for the combined method
    pub target_source: Option<TargetSource>,
}

impl Levels {
    /// Exit reason for a stop touch.
    pub fn stop_reason(&self) -> ExitReason {
        if self.trailing {
            ExitReason::TrailingStop
        } else {
            ExitReason::StopLoss
        }
    }

    /// Human-readable label for a target touch.
    pub fn target_label(&self) -> &'static str {
        match self.target_source {
            Some(TargetSource::RiskBased) => "TakeProfit (risk-based)",
            Some(TargetSource::Fixed) => "TakeProfit (fixed)",
            None => "TakeProfit",
        }
    }

    /// Human-readable label for a stop touch.
    pub fn stop_label(&self) -> &'static str {
        if self.trailing {
            "TrailingStop"
        } else {
            "StopLoss"
        }
    }
}

fn offset(price: f64, direction: Direction, percent: f64) -> f64 {
    price * (1.0 + direction.sign() * percent / 100.0)
}

/// Levels at entry, each passed through `round`.
///
/// Returns `None` when the method needs ATR and none is available.
pub fn initial_levels<F>(
    params: &ExitParams,
    direction: Direction,
    entry_price: f64,
    atr: Option<f64>,
    round: F,
) -> Option<Levels>
where
    F: Fn(f64) -> f64,
{
    let sign = direction.sign();

    let risk_based = || {
        atr.filter(|a| a.is_finite()).map(|atr| {
            let risk = params.atr_mult_rb * atr;
            (entry_price - sign * risk, entry_price + sign * risk * params.reward_mult_rb)
        })
    };
    let fixed = || {
        (
            offset(entry_price, direction, -params.fixed_sl_perc),
            offset(entry_price, direction, params.fixed_tp_perc),
        )
    };

    let levels = match params.sl_tp_method {
        SlTpMethod::RiskBased => {
            let (stop, target) = risk_based()?;
            Levels {
                stop: round(stop),
                target: Some(round(target)),
                trailing: false,
                target_source: None,
            }
        }
        SlTpMethod::FixedPercent => {
            let (stop, target) = fixed();
            Levels {
                stop: round(stop),
                target: Some(round(target)),
                trailing: false,
                target_source: None,
            }
        }
        SlTpMethod::TrailingPercent => Levels {
            stop: round(offset(entry_price, direction, -params.trailing_sl_perc)),
            target: params
                .fixed_tp_for_trailing_perc
                .filter(|p| *p > 0.0)
                .map(|p| round(offset(entry_price, direction, p))),
            trailing: true,
            target_source: None,
        },
        SlTpMethod::Combined => {
            let (rb_stop, rb_target) = risk_based()?;
            let (fx_stop, fx_target) = fixed();
            let (rb_stop, rb_target) = (round(rb_stop), round(rb_target));
            let (fx_stop, fx_target) = (round(fx_stop), round(fx_target));

            // Tighter stop is the one closer to entry; nearer target likewise.
            let stop = match direction {
                Direction::Long => rb_stop.max(fx_stop),
                Direction::Short => rb_stop.min(fx_stop),
            };
            let risk_based_nearer = match direction {
                Direction::Long => rb_target <= fx_target,
                Direction::Short => rb_target >= fx_target,
            };
            let (target, source) = if risk_based_nearer {
                (rb_target, TargetSource::RiskBased)
            } else {
                (fx_target, TargetSource::Fixed)
            };
            Levels {
                stop,
                target: Some(target),
                trailing: false,
                target_source: Some(source),
            }
        }
    };

    Some(levels)
}

/// Move a trailing stop toward `anchor`, the best price seen since entry.
///
/// Non-trailing levels come back unchanged. The stop never loosens.
pub fn trail<F>(
    params: &ExitParams,
    direction: Direction,
    levels: &Levels,
    anchor: f64,
    round: F,
) -> Levels
where
    F: Fn(f64) -> f64,
{
    if !levels.trailing {
        return *levels;
    }

    let proposed = round(offset(anchor, direction, -params.trailing_sl_perc));
    let stop = match direction {
        Direction::Long => levels.stop.max(proposed),
        Direction::Short => levels.stop.min(proposed),
    };

    Levels { stop, ..*levels }
}

/// A protective level touched within a bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LevelHit {
    Stop { price: f64 },
    Target { price: f64 },
}

impl LevelHit {
    pub fn price(&self) -> f64 {
        match self {
            LevelHit::Stop { price } | LevelHit::Target { price } => *price,
        }
    }
}

/// Check whether `bar` touches the stop or target of a position.
///
/// The stop wins when both are touched. A bar that opens through the stop
/// fills at the open. Targets fill at the level.
pub fn check_levels(levels: &Levels, direction: Direction, bar: &Bar) -> Option<LevelHit> {
    match direction {
        Direction::Long => {
            if bar.low <= levels.stop {
                let price = if bar.open <= levels.stop { bar.open } else { levels.stop };
                return Some(LevelHit::Stop { price });
            }
            match levels.target {
                Some(target) if bar.high >= target => Some(LevelHit::Target { price: target }),
                _ => None,
            }
        }
        Direction::Short => {
            if bar.high >= levels.stop {
                let price = if bar.open >= levels.stop { bar.open } else { levels.stop };
                return Some(LevelHit::Stop { price });
            }
            match levels.target {
                Some(target) if bar.low <= target => Some(LevelHit::Target { price: target }),
                _ => None,
            }
        }
    }
}
