use super::{Snapshot, StatValue};

/// A statistic computed from the per-tick snapshots of one strategy.
///
/// `start` receives the first snapshot, `update` every snapshot (including
/// the first), and `end` a closing snapshot taken after the last execution
/// pass.
pub trait StatisticTracker {
    /// Stable identifier used by [`StatisticsManager::statistic`](super::StatisticsManager::statistic).
    fn id(&self) -> &str;

    fn start(&mut self, _snapshot: &Snapshot) {}

    fn update(&mut self, _snapshot: &Snapshot) {}

    fn end(&mut self, _snapshot: &Snapshot) {}

    /// Current result.
    fn stats(&self) -> StatValue;

    /// Human readable result.
    fn stats_string(&self) -> String;
}
