use super::{Snapshot, StatValue, StatisticTracker};

/// Builds a fresh tracker instance; one is called per strategy.
pub type TrackerFactory = Box<dyn Fn() -> Box<dyn StatisticTracker>>;

/// The trackers attached to one strategy.
#[derive(Default)]
pub struct StatisticsManager {
    trackers: Vec<Box<dyn StatisticTracker>>,
    started: bool,
    finished: bool,
}

impl StatisticsManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, tracker: Box<dyn StatisticTracker>) {
        self.trackers.push(tracker);
    }

    pub fn len(&self) -> usize {
        self.trackers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trackers.is_empty()
    }

    /// Feed one tick. The first call also starts every tracker.
    pub fn observe(&mut self, snapshot: &Snapshot) {
        if !self.started {
            for tracker in &mut self.trackers {
                tracker.start(snapshot);
            }
            self.started = true;
        }
        for tracker in &mut self.trackers {
            tracker.update(snapshot);
        }
    }

    /// Finalize every tracker, in attachment order.
    pub fn end(&mut self, snapshot: &Snapshot) {
        if self.finished {
            return;
        }
        for tracker in &mut self.trackers {
            tracker.end(snapshot);
        }
        self.finished = true;
    }

    /// Result of the first tracker registered under `id`.
    pub fn statistic(&self, id: &str) -> Option<StatValue> {
        self.trackers
            .iter()
            .find(|t| t.id() == id)
            .map(|t| t.stats())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Box<dyn StatisticTracker>> {
        self.trackers.iter()
    }
}
