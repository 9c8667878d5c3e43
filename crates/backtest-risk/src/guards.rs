//! Entry guards.
//!
//! Guards only block new entries. They never close an open position.

use serde::{Deserialize, Serialize};
use tracing::warn;

use backtest_core::error::ValidationError;
use backtest_core::types::{Direction, DirectionFilter};

/// Result of a guard check.
#[derive(Debug, Clone, PartialEq)]
pub enum GuardCheck {
    /// Entry allowed
    Allowed,
    /// Entry blocked with reason
    Blocked { reason: String },
}

impl GuardCheck {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GuardCheck::Allowed)
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, GuardCheck::Blocked { .. })
    }

    /// Run `next` only if this check allowed the entry.
    pub fn and_then<F>(self, next: F) -> GuardCheck
    where
        F: FnOnce() -> GuardCheck,
    {
        match self {
            GuardCheck::Allowed => next(),
            blocked => blocked,
        }
    }
}

/// Drawdown and losing-streak limits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardParams {
    pub enable_max_drawdown: bool,
    /// Percent drawdown from peak equity that halts new entries for good
    pub max_drawdown_perc: f64,
    pub enable_max_consecutive_losses: bool,
    pub max_consecutive_losses: usize,
}

impl Default for GuardParams {
    fn default() -> Self {
        Self {
            enable_max_drawdown: false,
            max_drawdown_perc: 20.0,
            enable_max_consecutive_losses: false,
            max_consecutive_losses: 3,
        }
    }
}

impl GuardParams {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.enable_max_drawdown
            && !(self.max_drawdown_perc.is_finite()
                && self.max_drawdown_perc > 0.0
                && self.max_drawdown_perc <= 100.0)
        {
            return Err(ValidationError::InvalidParameter {
                name: "max_drawdown_perc",
                reason: format!("must be in (0, 100], got {}", self.max_drawdown_perc),
            });
        }
        if self.enable_max_consecutive_losses && self.max_consecutive_losses == 0 {
            return Err(ValidationError::InvalidParameter {
                name: "max_consecutive_losses",
                reason: "must be at least 1 when enabled".to_string(),
            });
        }
        Ok(())
    }
}

/// Run-level state the guards read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunState {
    pub peak_equity: f64,
    pub consecutive_losses: usize,
    /// Longest losing streak seen
    pub max_consecutive_losses: usize,
    /// Latched once the drawdown limit is breached
    pub drawdown_halted: bool,
}

impl RunState {
    pub fn new(initial_capital: f64) -> Self {
        Self {
            peak_equity: initial_capital,
            consecutive_losses: 0,
            max_consecutive_losses: 0,
            drawdown_halted: false,
        }
    }

    /// Percent drawdown of `equity` from the peak.
    pub fn drawdown_percent(&self, equity: f64) -> f64 {
        if self.peak_equity > 0.0 {
            ((self.peak_equity - equity) / self.peak_equity * 100.0).max(0.0)
        } else {
            0.0
        }
    }

    /// Losses extend the streak, wins reset it, break-even leaves it alone.
    pub fn record_closed_trade(&mut self, pnl: f64) {
        if pnl < 0.0 {
            self.consecutive_losses += 1;
            self.max_consecutive_losses = self.max_consecutive_losses.max(self.consecutive_losses);
        } else if pnl > 0.0 {
            self.consecutive_losses = 0;
        }
    }
}

/// Fold one mark-to-market equity value into the state.
///
/// Raises the peak and latches the drawdown halt when the limit is exceeded.
pub fn observe_equity(params: &GuardParams, state: &mut RunState, equity: f64) {
    if equity > state.peak_equity {
        state.peak_equity = equity;
    }

    if params.enable_max_drawdown && !state.drawdown_halted {
        let drawdown = state.drawdown_percent(equity);
        if drawdown > params.max_drawdown_perc {
            state.drawdown_halted = true;
            warn!(
                drawdown_pct = drawdown,
                limit_pct = params.max_drawdown_perc,
                "Max drawdown exceeded, new entries halted"
            );
        }
    }
}

pub fn drawdown_guard(params: &GuardParams, state: &RunState) -> GuardCheck {
    if params.enable_max_drawdown && state.drawdown_halted {
        GuardCheck::Blocked {
            reason: format!("Max drawdown ({:.2}%) exceeded", params.max_drawdown_perc),
        }
    } else {
        GuardCheck::Allowed
    }
}

pub fn consecutive_loss_guard(params: &GuardParams, state: &RunState) -> GuardCheck {
    if params.enable_max_consecutive_losses
        && state.consecutive_losses >= params.max_consecutive_losses
    {
        GuardCheck::Blocked {
            reason: format!(
                "Consecutive losses limit reached: {} (limit: {})",
                state.consecutive_losses, params.max_consecutive_losses
            ),
        }
    } else {
        GuardCheck::Allowed
    }
}

pub fn direction_guard(filter: DirectionFilter, direction: Direction) -> GuardCheck {
    if filter.allows(direction) {
        GuardCheck::Allowed
    } else {
        GuardCheck::Blocked {
            reason: format!("{} entries disabled by direction filter ({})", direction, filter),
        }
    }
}

/// Trend-strength filter: ADX must be ready and above `threshold`.
pub fn dmi_guard(threshold: f64, adx: Option<f64>) -> GuardCheck {
    match adx {
        Some(adx) if adx > threshold => GuardCheck::Allowed,
        Some(adx) => GuardCheck::Blocked {
            reason: format!("ADX {:.2} not above threshold {:.2}", adx, threshold),
        },
        None => GuardCheck::Blocked {
            reason: "ADX not ready".to_string(),
        },
    }
}

/// All guards for one entry attempt, evaluated in order.
#[derive(Debug, Clone, Copy)]
pub struct EntryGuards {
    params: GuardParams,
    direction: DirectionFilter,
    /// ADX threshold when the DMI filter is on
    dmi_threshold: Option<f64>,
}

impl EntryGuards {
    pub fn new(params: GuardParams, direction: DirectionFilter) -> Self {
        Self {
            params,
            direction,
            dmi_threshold: None,
        }
    }

    pub fn with_dmi_filter(mut self, threshold: f64) -> Self {
        self.dmi_threshold = Some(threshold);
        self
    }

    pub fn params(&self) -> &GuardParams {
        &self.params
    }

    pub fn check(&self, state: &RunState, direction: Direction, adx: Option<f64>) -> GuardCheck {
        direction_guard(self.direction, direction)
            .and_then(|| drawdown_guard(&self.params, state))
            .and_then(|| consecutive_loss_guard(&self.params, state))
            .and_then(|| match self.dmi_threshold {
                Some(threshold) => dmi_guard(threshold, adx),
                None => GuardCheck::Allowed,
            })
    }
}
