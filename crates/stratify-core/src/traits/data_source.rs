//! Market data source trait.

use crate::error::DataError;
use crate::types::MarketSeries;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Provider of historical market data.
///
/// Retrieval is the only step of a backtest allowed to suspend; everything
/// after it runs synchronously over the returned series.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Fetch historical bars for `instrument` within `[start, end]`.
    ///
    /// # Returns
    /// A series ordered from oldest to newest. An empty range is reported as
    /// [`DataError::NoDataAvailable`] rather than an empty series.
    async fn fetch_series(
        &self,
        instrument: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<MarketSeries, DataError>;

    /// Get the data source name.
    fn name(&self) -> &str;
}
