//! Core data types for the simulator.

mod ohlcv;
mod order;
mod position;

pub use ohlcv::{Bar, MarketSeries};
pub use order::{FillStatus, Order, OrderHandle, OrderId, OrderKind, OrderRef};
pub use position::Position;
