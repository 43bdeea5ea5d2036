//! Peak-to-trough drawdown episodes.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::statistics::{
    format_duration, serialize_duration, Snapshot, StatId, StatValue, StatisticTracker,
};

/// The deepest drawdown episode of the run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrawdownStats {
    /// Peak minus trough, in currency
    pub value: f64,
    /// `value` relative to the peak, in percent
    pub percent: f64,
    /// From the peak to the recovery (or the end of the run)
    #[serde(serialize_with = "serialize_duration")]
    pub duration: Duration,
    /// Number of recorded episodes
    pub episodes: usize,
}

#[derive(Debug, Clone, Copy)]
struct Episode {
    value: f64,
    percent: f64,
    duration: Duration,
}

/// Records one episode each time the portfolio makes a new high after
/// having been below its previous one.
///
/// The reported maximum is the episode with the largest absolute drawdown;
/// its percent and duration belong to that same episode. On ties the
/// earliest episode wins.
#[derive(Debug, Default)]
pub struct DrawdownTracker {
    history: Vec<f64>,
    peak: f64,
    peak_index: usize,
    episode_start: Option<DateTime<Utc>>,
    episodes: Vec<Episode>,
}

impl DrawdownTracker {
    /// Close the episode running from the peak up to, not including,
    /// `end_index`.
    fn close_episode(&mut self, end_index: usize, now: DateTime<Utc>) {
        let window = self
            .history
            .get(self.peak_index..end_index)
            .unwrap_or_default();
        let Some(trough) = window.iter().copied().reduce(f64::min) else {
            return;
        };

        let value = self.peak - trough;
        let duration = self
            .episode_start
            .map(|start| now - start)
            .unwrap_or_else(Duration::zero);

        if value > 0.0 && duration > Duration::zero() {
            let percent = if self.peak != 0.0 {
                value / self.peak * 100.0
            } else {
                0.0
            };
            self.episodes.push(Episode {
                value,
                percent,
                duration,
            });
        }
    }

    fn deepest(&self) -> Option<&Episode> {
        self.episodes.iter().fold(None, |best, e| match best {
            Some(b) if b.value >= e.value => Some(b),
            _ => Some(e),
        })
    }

    fn result(&self) -> DrawdownStats {
        match self.deepest() {
            Some(e) => DrawdownStats {
                value: e.value,
                percent: e.percent,
                duration: e.duration,
                episodes: self.episodes.len(),
            },
            None => DrawdownStats {
                value: 0.0,
                percent: 0.0,
                duration: Duration::zero(),
                episodes: 0,
            },
        }
    }
}

impl StatisticTracker for DrawdownTracker {
    fn id(&self) -> &str {
        StatId::MAX_DRAWDOWN
    }

    fn start(&mut self, snapshot: &Snapshot) {
        self.peak = snapshot.portfolio_value;
        self.peak_index = 0;
        self.episode_start = Some(snapshot.timestamp());
    }

    fn update(&mut self, snapshot: &Snapshot) {
        let value = snapshot.portfolio_value;
        let now = snapshot.timestamp();
        self.history.push(value);
        let index = self.history.len() - 1;

        if value > self.peak {
            self.close_episode(index, now);
            self.peak = value;
            self.peak_index = index;
            self.episode_start = Some(now);
        }
    }

    fn end(&mut self, snapshot: &Snapshot) {
        let below_peak = self.history.last().is_some_and(|&v| v < self.peak);
        if below_peak {
            self.close_episode(self.history.len(), snapshot.timestamp());
        }
    }

    fn stats(&self) -> StatValue {
        StatValue::Drawdown(self.result())
    }

    fn stats_string(&self) -> String {
        let r = self.result();
        format!(
            "Max Drawdown: {:.2} ({:.2}%) over {}",
            r.value,
            r.percent,
            format_duration(r.duration)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day(n: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(n)
    }

    fn run(values: &[f64]) -> DrawdownStats {
        let mut tracker = DrawdownTracker::default();
        tracker.start(&Snapshot::valued(day(0), values[0]));
        for (i, &v) in values.iter().enumerate() {
            tracker.update(&Snapshot::valued(day(i as i64), v));
        }
        let last = values.len() - 1;
        tracker.end(&Snapshot::valued(day(last as i64), values[last]));
        tracker.result()
    }

    #[test]
    fn test_monotonic_path_has_no_drawdown() {
        let stats = run(&[100.0, 100.0, 101.0, 105.0, 105.0, 110.0]);
        assert_eq!(stats.episodes, 0);
        assert_eq!(stats.value, 0.0);
        assert_eq!(stats.duration, Duration::zero());
    }

    #[test]
    fn test_recovered_episode() {
        // peak 100 on day 0, trough 80, new high on day 3
        let stats = run(&[100.0, 90.0, 80.0, 120.0]);
        assert_eq!(stats.episodes, 1);
        assert_eq!(stats.value, 20.0);
        assert_eq!(stats.percent, 20.0);
        assert_eq!(stats.duration, Duration::days(3));
    }

    #[test]
    fn test_open_episode_closed_at_end() {
        let stats = run(&[100.0, 120.0, 90.0, 95.0]);
        assert_eq!(stats.episodes, 1);
        assert_eq!(stats.value, 30.0);
        assert_eq!(stats.percent, 25.0);
        // from the day-1 peak to the last day
        assert_eq!(stats.duration, Duration::days(2));
    }

    #[test]
    fn test_max_chosen_by_value_with_its_own_percent() {
        // episode 1: 10 from 20 (50%), episode 2: 30 from 200 (15%)
        let stats = run(&[20.0, 10.0, 200.0, 170.0, 210.0]);
        assert_eq!(stats.episodes, 2);
        assert_eq!(stats.value, 30.0);
        assert_eq!(stats.percent, 15.0);
        assert_eq!(stats.duration, Duration::days(2));
    }

    #[test]
    fn test_ties_keep_first_episode() {
        let stats = run(&[100.0, 90.0, 110.0, 100.0, 100.0, 120.0]);
        assert_eq!(stats.episodes, 2);
        assert_eq!(stats.value, 10.0);
        assert_eq!(stats.percent, 10.0);
        assert_eq!(stats.duration, Duration::days(2));
    }

    #[test]
    fn test_stats_string_renders_duration() {
        let mut tracker = DrawdownTracker::default();
        tracker.start(&Snapshot::valued(day(0), 100.0));
        tracker.update(&Snapshot::valued(day(0), 100.0));
        tracker.update(&Snapshot::valued(day(1), 50.0));
        tracker.update(&Snapshot::valued(day(2), 150.0));
        tracker.end(&Snapshot::valued(day(2), 150.0));

        assert_eq!(
            tracker.stats_string(),
            "Max Drawdown: 50.00 (50.00%) over 2 Days, 0 Hours, 0 Minutes, 0 Seconds"
        );
    }
}
