//! OHLCV (Open, High, Low, Close, Volume) market data types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single bar of market data for one instrument at one timestamp.
///
/// Bars are immutable once produced by a data source. Bars of different
/// instruments may share a timestamp (a cross-section).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Instrument identifier
    pub instrument: String,
    /// Bar timestamp
    pub timestamp: DateTime<Utc>,
    /// Opening price
    pub open: f64,
    /// Closing price
    pub close: f64,
    /// Lowest price
    pub low: f64,
    /// Highest price
    pub high: f64,
    /// Units traded during the bar
    pub volume: u64,
}

impl Bar {
    /// Create a new bar.
    pub fn new(
        instrument: impl Into<String>,
        timestamp: DateTime<Utc>,
        open: f64,
        close: f64,
        low: f64,
        high: f64,
        volume: u64,
    ) -> Self {
        Self {
            instrument: instrument.into(),
            timestamp,
            open,
            close,
            low,
            high,
            volume,
        }
    }
}

/// An ordered sequence of bars for a single instrument.
///
/// Bars are kept sorted by timestamp; construction sorts them (stable, so
/// the provider's order survives for equal timestamps).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketSeries {
    /// Instrument identifier
    pub instrument: String,
    bars: Vec<Bar>,
}

impl MarketSeries {
    /// Create a series from bars in any order.
    pub fn new(instrument: impl Into<String>, mut bars: Vec<Bar>) -> Self {
        bars.sort_by_key(|b| b.timestamp);
        Self {
            instrument: instrument.into(),
            bars,
        }
    }

    /// Number of bars.
    #[inline]
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    /// Check if the series holds no bars.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Earliest timestamp, `None` for an empty series.
    pub fn first_timestamp(&self) -> Option<DateTime<Utc>> {
        self.bars.first().map(|b| b.timestamp)
    }

    /// Latest timestamp, `None` for an empty series.
    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.bars.last().map(|b| b.timestamp)
    }

    /// Bar at exactly `timestamp`, if the series has one.
    pub fn bar_at(&self, timestamp: DateTime<Utc>) -> Option<&Bar> {
        let idx = self.bars.partition_point(|b| b.timestamp < timestamp);
        self.bars.get(idx).filter(|b| b.timestamp == timestamp)
    }

    /// All bars at exactly `timestamp`, in list order.
    pub fn bars_at(&self, timestamp: DateTime<Utc>) -> impl Iterator<Item = &Bar> {
        let start = self.bars.partition_point(|b| b.timestamp < timestamp);
        self.bars[start..]
            .iter()
            .take_while(move |b| b.timestamp == timestamp)
    }

    /// Get an iterator over the bars.
    pub fn iter(&self) -> impl Iterator<Item = &Bar> {
        self.bars.iter()
    }
}

impl<'a> IntoIterator for &'a MarketSeries {
    type Item = &'a Bar;
    type IntoIter = std::slice::Iter<'a, Bar>;

    fn into_iter(self) -> Self::IntoIter {
        self.bars.iter()
    }
}
