//! Strategy registry for building strategies by name.

use crate::{
    BuyAndHoldConfig, BuyAndHoldStrategy, FlipConfig, FlipStrategy, SmaCrossoverConfig,
    SmaCrossoverStrategy,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use stratify_backtest::Strategy;
use stratify_core::error::StrategyError;

/// Information about a registered strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyInfo {
    /// Registry key
    pub name: String,
    /// Strategy description
    pub description: String,
    /// Default configuration as JSON
    pub default_config: serde_json::Value,
}

/// Registry for available strategies.
pub struct StrategyRegistry {
    strategies: BTreeMap<String, StrategyInfo>,
}

fn info<C: Serialize + Default>(name: &str, description: &str) -> StrategyInfo {
    StrategyInfo {
        name: name.to_string(),
        description: description.to_string(),
        default_config: serde_json::to_value(C::default()).unwrap_or_default(),
    }
}

fn parse<C: DeserializeOwned>(config: serde_json::Value) -> Result<C, StrategyError> {
    serde_json::from_value(config).map_err(|e| StrategyError::InvalidConfig(e.to_string()))
}

impl StrategyRegistry {
    /// Create a new strategy registry with all built-in strategies.
    pub fn new() -> Self {
        let strategies = [
            info::<BuyAndHoldConfig>(
                "buy_and_hold",
                "Buys a fixed number of units once per instrument and holds",
            ),
            info::<FlipConfig>(
                "flip",
                "Buys for part of a fixed cycle of bars and sells for the rest",
            ),
            info::<SmaCrossoverConfig>(
                "sma_crossover",
                "Buys on fast/slow SMA bullish crossovers, closes on bearish ones",
            ),
        ]
        .into_iter()
        .map(|i| (i.name.clone(), i))
        .collect();

        Self { strategies }
    }

    /// List all available strategies, sorted by name.
    pub fn list(&self) -> Vec<&StrategyInfo> {
        self.strategies.values().collect()
    }

    /// Get strategy info by name.
    pub fn get(&self, name: &str) -> Option<&StrategyInfo> {
        self.strategies.get(name)
    }

    /// Check if a strategy exists.
    pub fn exists(&self, name: &str) -> bool {
        self.strategies.contains_key(name)
    }

    /// Get all strategy names.
    pub fn names(&self) -> Vec<&str> {
        self.strategies.keys().map(String::as_str).collect()
    }

    /// Create a strategy instance from configuration.
    ///
    /// A non-empty `symbols` overrides the symbols in `config`.
    pub fn create(
        &self,
        name: &str,
        config: serde_json::Value,
        symbols: Vec<String>,
    ) -> Result<Box<dyn Strategy>, StrategyError> {
        match name {
            "buy_and_hold" => {
                let mut config: BuyAndHoldConfig = parse(config)?;
                if !symbols.is_empty() {
                    config.symbols = symbols;
                }
                config.validate()?;
                Ok(Box::new(BuyAndHoldStrategy::new(config)))
            }
            "flip" => {
                let mut config: FlipConfig = parse(config)?;
                if !symbols.is_empty() {
                    config.symbols = symbols;
                }
                config.validate()?;
                Ok(Box::new(FlipStrategy::new(config)))
            }
            "sma_crossover" => {
                let mut config: SmaCrossoverConfig = parse(config)?;
                if !symbols.is_empty() {
                    config.symbols = symbols;
                }
                config.validate()?;
                Ok(Box::new(SmaCrossoverStrategy::new(config)))
            }
            _ => Err(StrategyError::NotFound(name.to_string())),
        }
    }

    /// Create a strategy with default configuration.
    pub fn create_default(
        &self,
        name: &str,
        symbols: Vec<String>,
    ) -> Result<Box<dyn Strategy>, StrategyError> {
        let info = self
            .get(name)
            .ok_or_else(|| StrategyError::NotFound(name.to_string()))?;
        self.create(name, info.default_config.clone(), symbols)
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::new()
    }
}
