//! Core types and traits for the backtesting simulator.
//!
//! This crate provides the foundational building blocks including:
//! - Market data types (Bar, MarketSeries)
//! - Orders with their fill-status state machine, and positions
//! - The market data source trait consumed by the engine

pub mod types;
pub mod traits;
pub mod error;

pub use error::{StratifyError, StratifyResult};
pub use types::*;
pub use traits::*;
