//! Backtest scheduler, strategy interface and statistics engine.

mod engine;
mod report;
pub mod statistics;
mod strategy;

pub use engine::{BacktestConfig, BacktestEngine, EngineState};
pub use report::{BacktestReport, StatisticEntry, StrategyReport};
pub use statistics::{
    DrawdownStats, MatchedTrade, Snapshot, StatId, StatValue, StatisticTracker, StatisticsManager,
    TradeStats, TrackerFactory,
};
pub use strategy::{OrderIdGenerator, Strategy, StrategyContext};
