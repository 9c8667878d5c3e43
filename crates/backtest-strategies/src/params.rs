//! Parameter records for the strategy families.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use backtest_core::error::ValidationError;
use backtest_core::types::{DirectionFilter, PriceSource, RoundingFlags};
use backtest_indicators::VwapAnchor;
use backtest_risk::{ExitParams, GuardParams, SizingParams};

/// How an EMA/VWAP flip is confirmed before it becomes a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationMode {
    /// Act on the flip bar
    #[default]
    Off,
    /// Close stays on the signal side of VWAP
    OnClose,
    /// Whole bar stays on the signal side of VWAP
    OnHighLow,
    /// Close stays beyond VWAP by a multiple of ATR
    AtrBased,
}

impl fmt::Display for ConfirmationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConfirmationMode::Off => "off",
            ConfirmationMode::OnClose => "on_close",
            ConfirmationMode::OnHighLow => "on_high_low",
            ConfirmationMode::AtrBased => "atr_based",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for ConfirmationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "off" | "none" => Ok(ConfirmationMode::Off),
            "on_close" | "close" => Ok(ConfirmationMode::OnClose),
            "on_high_low" | "high_low" => Ok(ConfirmationMode::OnHighLow),
            "atr_based" | "atr" => Ok(ConfirmationMode::AtrBased),
            _ => Err(format!("Invalid confirmation mode: {}", s)),
        }
    }
}

fn check_periods(fast: usize, slow: usize) -> Result<(), ValidationError> {
    if fast == 0 {
        return Err(ValidationError::InvalidPeriod { name: "fast_period" });
    }
    if slow == 0 {
        return Err(ValidationError::InvalidPeriod { name: "slow_period" });
    }
    if fast >= slow {
        return Err(ValidationError::PeriodOrdering { fast, slow });
    }
    Ok(())
}

/// SMA crossover with protective exits and guards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrossoverParams {
    pub fast_period: usize,
    pub slow_period: usize,
    pub source: PriceSource,
    pub direction: DirectionFilter,
    #[serde(flatten)]
    pub sizing: SizingParams,
    #[serde(flatten)]
    pub exits: ExitParams,
    #[serde(flatten)]
    pub guards: GuardParams,
    pub rounding: RoundingFlags,
}

impl Default for CrossoverParams {
    fn default() -> Self {
        Self {
            fast_period: 10,
            slow_period: 30,
            source: PriceSource::Close,
            direction: DirectionFilter::Both,
            sizing: SizingParams::default(),
            exits: ExitParams::default(),
            guards: GuardParams::default(),
            rounding: RoundingFlags::default(),
        }
    }
}

impl CrossoverParams {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_periods(self.fast_period, self.slow_period)?;
        self.sizing.validate()?;
        self.exits.validate()?;
        self.guards.validate()
    }
}

/// SMA crossover that only ever exits on the opposite crossover.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinimalCrossoverParams {
    pub fast_period: usize,
    pub slow_period: usize,
    pub source: PriceSource,
    pub direction: DirectionFilter,
    #[serde(flatten)]
    pub sizing: SizingParams,
}

impl Default for MinimalCrossoverParams {
    fn default() -> Self {
        Self {
            fast_period: 10,
            slow_period: 30,
            source: PriceSource::Close,
            direction: DirectionFilter::Both,
            sizing: SizingParams::default(),
        }
    }
}

impl MinimalCrossoverParams {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_periods(self.fast_period, self.slow_period)?;
        self.sizing.validate()
    }
}

/// EMA against anchored VWAP with delayed confirmation and a DMI filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmaVwapParams {
    pub ema_period: usize,
    pub ema_source: PriceSource,
    pub vwap_source: PriceSource,
    pub vwap_anchor: VwapAnchor,
    pub confirmation_mode: ConfirmationMode,
    pub confirmation_bars: usize,
    pub confirmation_atr_mult: f64,
    pub enable_dmi_filter: bool,
    pub dmi_length: usize,
    pub dmi_smoothing: usize,
    pub dmi_threshold: f64,
    pub direction: DirectionFilter,
    #[serde(flatten)]
    pub sizing: SizingParams,
    #[serde(flatten)]
    pub exits: ExitParams,
    #[serde(flatten)]
    pub guards: GuardParams,
    pub rounding: RoundingFlags,
}

impl Default for EmaVwapParams {
    fn default() -> Self {
        Self {
            ema_period: 20,
            ema_source: PriceSource::Close,
            vwap_source: PriceSource::Hlc3,
            vwap_anchor: VwapAnchor::Session,
            confirmation_mode: ConfirmationMode::Off,
            confirmation_bars: 2,
            confirmation_atr_mult: 0.5,
            enable_dmi_filter: false,
            dmi_length: 14,
            dmi_smoothing: 14,
            dmi_threshold: 20.0,
            direction: DirectionFilter::Both,
            sizing: SizingParams::default(),
            exits: ExitParams::default(),
            guards: GuardParams::default(),
            rounding: RoundingFlags::default(),
        }
    }
}

impl EmaVwapParams {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.ema_period == 0 {
            return Err(ValidationError::InvalidPeriod { name: "ema_period" });
        }
        if self.confirmation_mode != ConfirmationMode::Off && self.confirmation_bars == 0 {
            return Err(ValidationError::InvalidParameter {
                name: "confirmation_bars",
                reason: format!("must be at least 1 with confirmation {}", self.confirmation_mode),
            });
        }
        if !(self.confirmation_atr_mult.is_finite() && self.confirmation_atr_mult >= 0.0) {
            return Err(ValidationError::InvalidParameter {
                name: "confirmation_atr_mult",
                reason: format!("must be zero or positive, got {}", self.confirmation_atr_mult),
            });
        }
        if self.enable_dmi_filter {
            if self.dmi_length == 0 {
                return Err(ValidationError::InvalidPeriod { name: "dmi_length" });
            }
            if self.dmi_smoothing == 0 {
                return Err(ValidationError::InvalidPeriod { name: "dmi_smoothing" });
            }
            if !(self.dmi_threshold.is_finite() && (0.0..=100.0).contains(&self.dmi_threshold)) {
                return Err(ValidationError::InvalidParameter {
                    name: "dmi_threshold",
                    reason: format!("must be in [0, 100], got {}", self.dmi_threshold),
                });
            }
        }
        self.sizing.validate()?;
        self.exits.validate()?;
        self.guards.validate()
    }
}

/// Parameters of one run, tagged by strategy family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum StrategyParams {
    Crossover(CrossoverParams),
    CrossoverMinimal(MinimalCrossoverParams),
    EmaVwap(EmaVwapParams),
}

impl StrategyParams {
    /// Registry key of the family.
    pub fn name(&self) -> &'static str {
        match self {
            StrategyParams::Crossover(_) => "crossover",
            StrategyParams::CrossoverMinimal(_) => "crossover_minimal",
            StrategyParams::EmaVwap(_) => "ema_vwap",
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            StrategyParams::Crossover(p) => p.validate(),
            StrategyParams::CrossoverMinimal(p) => p.validate(),
            StrategyParams::EmaVwap(p) => p.validate(),
        }
    }
}
