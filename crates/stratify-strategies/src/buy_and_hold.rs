//! Buy once and hold until the end of the run.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use stratify_backtest::{Strategy, StrategyContext};
use stratify_core::error::StrategyError;

use crate::trades_instrument;

/// Configuration for the Buy and Hold strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuyAndHoldConfig {
    /// Instruments to buy; empty means every instrument
    pub symbols: Vec<String>,
    /// Units bought per instrument
    pub units: u64,
}

impl Default for BuyAndHoldConfig {
    fn default() -> Self {
        Self {
            symbols: vec![],
            units: 100,
        }
    }
}

impl BuyAndHoldConfig {
    pub fn validate(&self) -> Result<(), StrategyError> {
        if self.units == 0 {
            return Err(StrategyError::InvalidConfig(
                "Units must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

/// Buys `units` of each instrument on its first bar.
pub struct BuyAndHoldStrategy {
    config: BuyAndHoldConfig,
    bought: HashSet<String>,
}

impl BuyAndHoldStrategy {
    pub fn new(config: BuyAndHoldConfig) -> Self {
        Self {
            config,
            bought: HashSet::new(),
        }
    }
}

impl Strategy for BuyAndHoldStrategy {
    fn name(&self) -> &str {
        "buy_and_hold"
    }

    fn next(&mut self, ctx: &mut StrategyContext) {
        if !trades_instrument(&self.config.symbols, ctx.instrument()) {
            return;
        }
        if self.bought.insert(ctx.instrument().to_string()) {
            ctx.buy(self.config.units);
        }
    }
}
