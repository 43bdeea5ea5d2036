//! Statistics engine.
//!
//! Every strategy owns a [`StatisticsManager`] holding independent
//! trackers. Each tick the engine captures one [`Snapshot`] per strategy and
//! feeds it to all of that strategy's trackers; at the end of the run the
//! trackers finalize their path-dependent results.

mod manager;
mod snapshot;
mod tracker;
pub mod trackers;

use chrono::Duration;
use serde::{Serialize, Serializer};

pub use manager::{StatisticsManager, TrackerFactory};
pub use snapshot::Snapshot;
pub use tracker::StatisticTracker;
pub use trackers::{default_trackers, DrawdownStats, MatchedTrade, TradeStats};

/// Stable identifiers of the built-in trackers.
pub struct StatId;

impl StatId {
    pub const TOTAL_RETURN: &'static str = "total_return";
    pub const ANNUALIZED_RETURN: &'static str = "annualized_return";
    pub const STARTING_CASH: &'static str = "starting_cash";
    pub const FINAL_PORTFOLIO_VALUE: &'static str = "final_portfolio_value";
    pub const NET_PROFIT_OR_LOSS: &'static str = "net_profit_or_loss";
    pub const VOLATILITY: &'static str = "volatility";
    pub const MAX_DRAWDOWN: &'static str = "max_drawdown";
    pub const TRADES: &'static str = "trades";

    /// All built-in ids, in the order the default trackers are attached.
    pub const ALL: [&'static str; 8] = [
        Self::TOTAL_RETURN,
        Self::ANNUALIZED_RETURN,
        Self::STARTING_CASH,
        Self::FINAL_PORTFOLIO_VALUE,
        Self::NET_PROFIT_OR_LOSS,
        Self::VOLATILITY,
        Self::MAX_DRAWDOWN,
        Self::TRADES,
    ];
}

/// Value reported by a tracker.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StatValue {
    /// Not computed yet (the run has not reached the tracker's `end`)
    Unavailable,
    Number(f64),
    Drawdown(DrawdownStats),
    Trades(TradeStats),
}

impl StatValue {
    /// Plain number, if this is one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            StatValue::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_drawdown(&self) -> Option<&DrawdownStats> {
        match self {
            StatValue::Drawdown(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_trades(&self) -> Option<&TradeStats> {
        match self {
            StatValue::Trades(t) => Some(t),
            _ => None,
        }
    }

    pub fn is_available(&self) -> bool {
        !matches!(self, StatValue::Unavailable)
    }
}

/// Render a duration as `N Days, H Hours, M Minutes, S Seconds`.
pub fn format_duration(duration: Duration) -> String {
    let total = duration.num_seconds().max(0);
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;
    format!("{days} Days, {hours} Hours, {minutes} Minutes, {seconds} Seconds")
}

pub(crate) fn serialize_duration<S: Serializer>(
    duration: &Duration,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_i64(duration.num_seconds())
}
