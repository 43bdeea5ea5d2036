//! Simple Moving Average Crossover Strategy.
//!
//! Buys when the fast SMA crosses above the slow SMA and closes the
//! position when the fast SMA crosses below the slow SMA.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use stratify_backtest::{Strategy, StrategyContext};
use stratify_core::error::StrategyError;
use tracing::debug;

use crate::trades_instrument;

/// Configuration for the SMA Crossover strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmaCrossoverConfig {
    /// Instruments to trade; empty means every instrument
    pub symbols: Vec<String>,
    /// Fast moving average period
    pub fast_period: usize,
    /// Slow moving average period
    pub slow_period: usize,
    /// Units bought on a bullish crossover
    pub units: u64,
    /// Minimum crossover magnitude to act on (as a fraction of the slow SMA)
    pub signal_threshold: f64,
}

impl Default for SmaCrossoverConfig {
    fn default() -> Self {
        Self {
            symbols: vec![],
            fast_period: 10,
            slow_period: 30,
            units: 10,
            signal_threshold: 0.0,
        }
    }
}

impl SmaCrossoverConfig {
    pub fn validate(&self) -> Result<(), StrategyError> {
        if self.fast_period == 0 {
            return Err(StrategyError::InvalidConfig(
                "Fast period must be greater than 0".into(),
            ));
        }
        if self.fast_period >= self.slow_period {
            return Err(StrategyError::InvalidConfig(
                "Fast period must be less than slow period".into(),
            ));
        }
        if self.units == 0 {
            return Err(StrategyError::InvalidConfig(
                "Units must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct Averages {
    closes: VecDeque<f64>,
    prev: Option<(f64, f64)>,
}

impl Averages {
    fn mean_of_last(&self, n: usize) -> f64 {
        self.closes.iter().rev().take(n).sum::<f64>() / n as f64
    }
}

/// Simple Moving Average Crossover Strategy.
pub struct SmaCrossoverStrategy {
    config: SmaCrossoverConfig,
    state: HashMap<String, Averages>,
    signals_generated: usize,
}

impl SmaCrossoverStrategy {
    /// Create a new SMA Crossover strategy.
    pub fn new(config: SmaCrossoverConfig) -> Self {
        Self {
            config,
            state: HashMap::new(),
            signals_generated: 0,
        }
    }

    /// Crossovers acted upon so far.
    pub fn signals_generated(&self) -> usize {
        self.signals_generated
    }
}

impl Strategy for SmaCrossoverStrategy {
    fn name(&self) -> &str {
        "sma_crossover"
    }

    fn next(&mut self, ctx: &mut StrategyContext) {
        if !trades_instrument(&self.config.symbols, ctx.instrument()) {
            return;
        }

        let slow_period = self.config.slow_period;
        let averages = self.state.entry(ctx.instrument().to_string()).or_default();
        averages.closes.push_back(ctx.close());
        if averages.closes.len() > slow_period {
            averages.closes.pop_front();
        }
        if averages.closes.len() < slow_period {
            return;
        }

        let fast = averages.mean_of_last(self.config.fast_period);
        let slow = averages.mean_of_last(slow_period);
        let prev = averages.prev.replace((fast, slow));

        let Some((prev_fast, prev_slow)) = prev else {
            return;
        };
        let magnitude = if slow != 0.0 {
            ((fast - slow) / slow).abs()
        } else {
            0.0
        };
        if magnitude < self.config.signal_threshold {
            return;
        }

        // Bullish crossover: fast crosses above slow
        if prev_fast <= prev_slow && fast > slow {
            self.signals_generated += 1;
            debug!(instrument = ctx.instrument(), fast, slow, "bullish crossover");
            ctx.buy(self.config.units);
        }
        // Bearish crossover: fast crosses below slow
        else if prev_fast >= prev_slow && fast < slow {
            self.signals_generated += 1;
            debug!(instrument = ctx.instrument(), fast, slow, "bearish crossover");
            ctx.close_position();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::run_on_closes;
    use stratify_core::types::{FillStatus, OrderKind};

    fn config() -> SmaCrossoverConfig {
        SmaCrossoverConfig {
            fast_period: 3,
            slow_period: 5,
            units: 10,
            ..Default::default()
        }
    }

    #[test]
    fn test_config_validation() {
        assert!(SmaCrossoverConfig::default().validate().is_ok());

        let mut config = config();
        config.fast_period = 30;
        config.slow_period = 20;
        assert!(config.validate().is_err());

        let config = SmaCrossoverConfig {
            units: 0,
            ..self::config()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bullish_then_bearish_crossover() {
        let prices = [
            100.0, 99.0, 98.0, 97.0, 96.0, // downtrend
            97.0, 99.0, 102.0, 105.0, 108.0, // reversal up
            104.0, 99.0, 94.0, 90.0, 86.0, // reversal down
        ];

        let orders = run_on_closes(Box::new(SmaCrossoverStrategy::new(config())), &prices);

        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].kind, OrderKind::Buy);
        assert_eq!(orders[0].status, FillStatus::Filled);
        assert_eq!(orders[1].kind, OrderKind::Close);
        assert_eq!(orders[1].status, FillStatus::Filled);
        assert_eq!(orders[1].units_traded, 10);
    }

    #[test]
    fn test_no_orders_during_warmup() {
        let orders = run_on_closes(
            Box::new(SmaCrossoverStrategy::new(config())),
            &[100.0, 110.0, 90.0, 120.0],
        );
        assert!(orders.is_empty());
    }
}
