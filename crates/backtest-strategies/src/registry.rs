//! Strategy registry for building parameters by name.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use backtest_core::error::StrategyError;

use crate::params::{CrossoverParams, EmaVwapParams, MinimalCrossoverParams, StrategyParams};

/// Information about a registered strategy family.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyInfo {
    /// Registry key
    pub key: String,
    /// Display name
    pub name: String,
    pub description: String,
    /// Default parameters as JSON
    pub default_config: Value,
}

/// Registry of the built-in strategy families.
pub struct StrategyRegistry {
    strategies: BTreeMap<String, StrategyInfo>,
}

impl StrategyRegistry {
    /// Create a registry with all built-in strategy families.
    pub fn new() -> Self {
        let mut strategies = BTreeMap::new();

        let mut register = |key: &str, name: &str, description: &str, default_config: Value| {
            strategies.insert(
                key.to_string(),
                StrategyInfo {
                    key: key.to_string(),
                    name: name.to_string(),
                    description: description.to_string(),
                    default_config,
                },
            );
        };

        register(
            "crossover",
            "SMA Crossover",
            "Fast/slow SMA crossover with stop-loss, take-profit and risk guards",
            serde_json::to_value(CrossoverParams::default()).unwrap_or(Value::Null),
        );
        register(
            "crossover_minimal",
            "SMA Crossover (minimal)",
            "Fast/slow SMA crossover that exits only on the opposite crossover",
            serde_json::to_value(MinimalCrossoverParams::default()).unwrap_or(Value::Null),
        );
        register(
            "ema_vwap",
            "EMA/VWAP",
            "EMA crossing anchored VWAP with delayed confirmation and DMI trend filter",
            serde_json::to_value(EmaVwapParams::default()).unwrap_or(Value::Null),
        );

        Self { strategies }
    }

    /// List all strategy families, ordered by key.
    pub fn list(&self) -> Vec<&StrategyInfo> {
        self.strategies.values().collect()
    }

    /// Get strategy info by key.
    pub fn get(&self, key: &str) -> Option<&StrategyInfo> {
        self.strategies.get(key)
    }

    /// Check if a strategy exists.
    pub fn exists(&self, key: &str) -> bool {
        self.strategies.contains_key(key)
    }

    /// Get all strategy keys.
    pub fn names(&self) -> Vec<&String> {
        self.strategies.keys().collect()
    }

    /// Build validated parameters for `key` from JSON.
    ///
    /// Fields missing from `config` take their defaults.
    pub fn create(&self, key: &str, config: Value) -> Result<StrategyParams, StrategyError> {
        let invalid = |e: serde_json::Error| StrategyError::InvalidConfig(e.to_string());

        let params = match key {
            "crossover" => {
                StrategyParams::Crossover(serde_json::from_value(config).map_err(invalid)?)
            }
            "crossover_minimal" => {
                StrategyParams::CrossoverMinimal(serde_json::from_value(config).map_err(invalid)?)
            }
            "ema_vwap" => StrategyParams::EmaVwap(serde_json::from_value(config).map_err(invalid)?),
            _ => return Err(StrategyError::NotFound(key.to_string())),
        };

        params
            .validate()
            .map_err(|e| StrategyError::InvalidConfig(e.to_string()))?;
        Ok(params)
    }

    /// Build parameters with the default configuration.
    pub fn create_default(&self, key: &str) -> Result<StrategyParams, StrategyError> {
        self.create(key, Value::Object(Default::default()))
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_registry_creation() {
        let registry = StrategyRegistry::new();
        assert!(registry.exists("crossover"));
        assert!(registry.exists("crossover_minimal"));
        assert!(registry.exists("ema_vwap"));
        assert!(!registry.exists("nonexistent"));
        assert_eq!(registry.list().len(), 3);
    }

    #[test]
    fn test_create_with_defaults() {
        let registry = StrategyRegistry::new();
        for key in ["crossover", "crossover_minimal", "ema_vwap"] {
            let params = registry.create_default(key).unwrap();
            assert_eq!(params.name(), key);
        }
    }

    #[test]
    fn test_create_partial_config() {
        let registry = StrategyRegistry::new();
        let params = registry
            .create("crossover", json!({ "fast_period": 3, "slow_period": 7 }))
            .unwrap();
        match params {
            StrategyParams::Crossover(p) => {
                assert_eq!(p.fast_period, 3);
                assert_eq!(p.slow_period, 7);
            }
            other => panic!("unexpected variant {:?}", other),
        }
    }

    #[test]
    fn test_default_config_round_trips() {
        let registry = StrategyRegistry::new();
        let info = registry.get("ema_vwap").unwrap();
        assert!(registry.create("ema_vwap", info.default_config.clone()).is_ok());
    }

    #[test]
    fn test_errors() {
        let registry = StrategyRegistry::new();
        assert!(matches!(
            registry.create_default("rsi"),
            Err(StrategyError::NotFound(_))
        ));
        assert!(matches!(
            registry.create("crossover", json!({ "fast_period": 30, "slow_period": 10 })),
            Err(StrategyError::InvalidConfig(_))
        ));
        assert!(matches!(
            registry.create("crossover", json!({ "fast_period": "fast" })),
            Err(StrategyError::InvalidConfig(_))
        ));
    }
}
