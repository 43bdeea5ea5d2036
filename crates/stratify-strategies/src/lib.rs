//! Reference strategy implementations.
//!
//! This crate provides:
//! - Buy and Hold
//! - Flip (fixed accumulate/distribute cycle)
//! - Simple Moving Average Crossover
//!
//! and a [`StrategyRegistry`] that builds them by name.

mod buy_and_hold;
mod flip;
mod registry;
mod sma_crossover;

pub use buy_and_hold::{BuyAndHoldConfig, BuyAndHoldStrategy};
pub use flip::{FlipConfig, FlipStrategy};
pub use registry::{StrategyInfo, StrategyRegistry};
pub use sma_crossover::{SmaCrossoverConfig, SmaCrossoverStrategy};

/// An empty symbol list means every instrument.
pub(crate) fn trades_instrument(symbols: &[String], instrument: &str) -> bool {
    symbols.is_empty() || symbols.iter().any(|s| s == instrument)
}
