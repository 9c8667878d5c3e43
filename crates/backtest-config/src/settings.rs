//! Configuration structures.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use backtest_core::error::ValidationError;
use backtest_core::types::{CostConfig, SymbolFilters};

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub backtest: BacktestSettings,
    /// Tick and step sizes keyed by symbol
    #[serde(default)]
    pub instruments: HashMap<String, SymbolFilters>,
}

impl AppConfig {
    /// Check the values a run depends on.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let b = &self.backtest;
        if !(b.initial_capital.is_finite() && b.initial_capital > 0.0) {
            return Err(ValidationError::InvalidCapital(b.initial_capital));
        }
        b.cost_config(SymbolFilters::FALLBACK).validate()?;
        for filters in self.instruments.values() {
            CostConfig::default().with_filters(*filters).validate()?;
        }
        Ok(())
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

/// General app settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub name: String,
    pub environment: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            name: "backtest".to_string(),
            environment: "development".to_string(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `pretty` or `json`
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// Defaults for backtest runs, overridable per run from the command line.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestSettings {
    pub initial_capital: f64,
    /// Percent of notional per fill
    pub commission_percent: f64,
    pub slippage_ticks: f64,
}

impl Default for BacktestSettings {
    fn default() -> Self {
        Self {
            initial_capital: 10_000.0,
            commission_percent: 0.1,
            slippage_ticks: 0.0,
        }
    }
}

impl BacktestSettings {
    /// Cost model for an instrument with the given filters.
    pub fn cost_config(&self, filters: SymbolFilters) -> CostConfig {
        CostConfig {
            commission_percent: self.commission_percent,
            slippage_ticks: self.slippage_ticks,
            tick_size: filters.tick_size,
            step_size: filters.step_size,
        }
    }
}
