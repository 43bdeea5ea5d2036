//! Built-in trackers.

mod drawdown;
mod returns;
mod trades;
mod volatility;

pub use drawdown::{DrawdownStats, DrawdownTracker};
pub use returns::{
    AnnualizedReturnTracker, FinalValueTracker, NetProfitTracker, StartingCashTracker,
    TotalReturnTracker,
};
pub use trades::{MatchedTrade, TradeStats, TradesTracker};
pub use volatility::VolatilityTracker;

use super::StatisticTracker;

/// One fresh instance of every built-in tracker.
pub fn default_trackers() -> Vec<Box<dyn StatisticTracker>> {
    vec![
        Box::new(TotalReturnTracker::default()),
        Box::new(AnnualizedReturnTracker::default()),
        Box::new(StartingCashTracker::default()),
        Box::new(FinalValueTracker::default()),
        Box::new(NetProfitTracker::default()),
        Box::new(VolatilityTracker::default()),
        Box::new(DrawdownTracker::default()),
        Box::new(TradesTracker::default()),
    ]
}
