//! Market data sources.

mod csv_source;

pub use csv_source::CsvDataSource;

use chrono::{DateTime, Utc};
use std::path::Path;
use stratify_core::error::DataError;
use stratify_core::traits::DataSource;
use stratify_core::types::MarketSeries;

/// Load one instrument's bars within `[start, end]` from a CSV file or
/// directory.
pub async fn load_csv(
    path: impl AsRef<Path>,
    instrument: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<MarketSeries, DataError> {
    let source = CsvDataSource::new(path)?;
    source.fetch_series(instrument, start, end).await
}
