//! Error types for the backtesting simulator.
//!
//! Order rejection during execution is not an error: it is recorded as a
//! terminal [`FillStatus::Rejected`](crate::types::FillStatus) on the order.

use thiserror::Error;

use crate::types::{FillStatus, OrderId};

/// Top-level simulator error.
#[derive(Error, Debug)]
pub enum StratifyError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    #[error("Data error: {0}")]
    Data(#[from] DataError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Strategy error: {0}")]
    Strategy(#[from] StrategyError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Illegal order state transitions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderError {
    #[error("order {id} cannot move from {from} to {to}")]
    IllegalTransition {
        id: OrderId,
        from: FillStatus,
        to: FillStatus,
    },
}

/// Market data errors.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Instrument not found: {0}")]
    InstrumentNotFound(String),

    #[error("No data available for the requested range")]
    NoDataAvailable,

    #[error("Market data series for {0} is empty")]
    EmptySeries(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Data source error: {0}")]
    Internal(String),
}

/// Scheduler errors. These are the only fatal conditions of a run.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("no market data series attached")]
    NoSeries,

    #[error("market data series for {0} is empty")]
    EmptySeries(String),

    #[error("backtest already ran; build a new engine to run again")]
    AlreadyRan,
}

/// Strategy construction errors.
#[derive(Error, Debug)]
pub enum StrategyError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Strategy not found: {0}")]
    NotFound(String),
}

/// Result type alias for simulator operations.
pub type StratifyResult<T> = Result<T, StratifyError>;
