//! Alternating accumulate/distribute cycle, useful for exercising the
//! broker and the trade statistics.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use stratify_backtest::{Strategy, StrategyContext};
use stratify_core::error::StrategyError;

use crate::trades_instrument;

/// Configuration for the Flip strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FlipConfig {
    /// Instruments to trade; empty means every instrument
    pub symbols: Vec<String>,
    /// Units per order
    pub units: u64,
    /// Bars per cycle
    pub cycle: u32,
    /// Bars of each cycle spent buying, counting from one
    pub buy_bars: u32,
}

impl Default for FlipConfig {
    fn default() -> Self {
        Self {
            symbols: vec![],
            units: 10,
            cycle: 20,
            buy_bars: 9,
        }
    }
}

impl FlipConfig {
    pub fn validate(&self) -> Result<(), StrategyError> {
        if self.units == 0 {
            return Err(StrategyError::InvalidConfig(
                "Units must be greater than 0".into(),
            ));
        }
        if self.buy_bars >= self.cycle {
            return Err(StrategyError::InvalidConfig(
                "Buy bars must be fewer than the cycle length".into(),
            ));
        }
        Ok(())
    }
}

/// Buys for the first `buy_bars` bars of every cycle, sells for the rest.
pub struct FlipStrategy {
    config: FlipConfig,
    counters: HashMap<String, u32>,
}

impl FlipStrategy {
    pub fn new(config: FlipConfig) -> Self {
        Self {
            config,
            counters: HashMap::new(),
        }
    }
}

impl Strategy for FlipStrategy {
    fn name(&self) -> &str {
        "flip"
    }

    fn next(&mut self, ctx: &mut StrategyContext) {
        if !trades_instrument(&self.config.symbols, ctx.instrument()) {
            return;
        }

        let counter = self.counters.entry(ctx.instrument().to_string()).or_insert(0);
        *counter += 1;

        if *counter <= self.config.buy_bars {
            ctx.buy(self.config.units);
        } else {
            ctx.sell(self.config.units);
            if *counter == self.config.cycle {
                *counter = 0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::run_on_closes;
    use stratify_core::types::{FillStatus, OrderKind};

    #[test]
    fn test_cycle_shape() {
        let strategy = FlipStrategy::new(FlipConfig::default());
        let closes = vec![10.0; 40];
        let orders = run_on_closes(Box::new(strategy), &closes);

        let kinds: Vec<OrderKind> = orders.iter().map(|o| o.kind).collect();
        assert_eq!(kinds.len(), 40);
        for cycle in kinds.chunks(20) {
            assert!(cycle[..9].iter().all(|k| *k == OrderKind::Buy));
            assert!(cycle[9..].iter().all(|k| *k == OrderKind::Sell));
        }

        // 90 units bought per cycle; the last two sells of each cycle find
        // nothing left to sell
        let rejected = orders
            .iter()
            .filter(|o| o.status == FillStatus::Rejected)
            .count();
        assert_eq!(rejected, 4);
    }

    #[test]
    fn test_invalid_cycle() {
        let config = FlipConfig {
            buy_bars: 20,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
