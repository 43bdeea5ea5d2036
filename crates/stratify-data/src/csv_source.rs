//! CSV data source.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use csv::ReaderBuilder;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use stratify_core::error::DataError;
use stratify_core::traits::DataSource;
use stratify_core::types::{Bar, MarketSeries};
use tracing::debug;

/// CSV record format.
#[derive(Debug, Deserialize)]
struct CsvRecord {
    #[serde(alias = "Date", alias = "date", alias = "timestamp", alias = "Timestamp")]
    date: String,
    #[serde(alias = "Open", alias = "open")]
    open: f64,
    #[serde(alias = "High", alias = "high")]
    high: f64,
    #[serde(alias = "Low", alias = "low")]
    low: f64,
    #[serde(alias = "Close", alias = "close", alias = "Adj Close")]
    close: f64,
    #[serde(alias = "Volume", alias = "volume", default)]
    volume: f64,
}

/// Historical bars from CSV files.
///
/// The root is either a single file, served for any instrument, or a
/// directory holding one `<INSTRUMENT>.csv` per instrument.
#[derive(Debug, Clone)]
pub struct CsvDataSource {
    root: PathBuf,
}

impl CsvDataSource {
    /// Create a new CSV data source.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, DataError> {
        let root = path.as_ref().to_path_buf();
        if !root.exists() {
            return Err(DataError::Internal(format!(
                "path does not exist: {}",
                root.display()
            )));
        }
        Ok(Self { root })
    }

    /// File holding `instrument`'s bars.
    pub fn path_for(&self, instrument: &str) -> PathBuf {
        if self.root.is_dir() {
            self.root.join(format!("{instrument}.csv"))
        } else {
            self.root.clone()
        }
    }

    /// Load every bar of `instrument`, in file order.
    pub async fn load_all(&self, instrument: &str) -> Result<Vec<Bar>, DataError> {
        let path = self.path_for(instrument);
        let raw = tokio::fs::read(&path)
            .await
            .map_err(|_| DataError::InstrumentNotFound(instrument.to_string()))?;
        let bars = parse_bars(instrument, raw.as_slice())?;
        debug!(instrument, path = %path.display(), bars = bars.len(), "loaded csv");
        Ok(bars)
    }
}

#[async_trait]
impl DataSource for CsvDataSource {
    async fn fetch_series(
        &self,
        instrument: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<MarketSeries, DataError> {
        let bars: Vec<Bar> = self
            .load_all(instrument)
            .await?
            .into_iter()
            .filter(|b| b.timestamp >= start && b.timestamp <= end)
            .collect();

        if bars.is_empty() {
            return Err(DataError::NoDataAvailable);
        }
        Ok(MarketSeries::new(instrument, bars))
    }

    fn name(&self) -> &str {
        "csv"
    }
}

/// Parse CSV rows into bars for `instrument`.
fn parse_bars<R: std::io::Read>(instrument: &str, reader: R) -> Result<Vec<Bar>, DataError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut bars = Vec::new();
    for result in reader.deserialize() {
        let record: CsvRecord = result.map_err(|e| DataError::ParseError(e.to_string()))?;
        let timestamp = parse_timestamp(&record.date)?;

        bars.push(Bar::new(
            instrument,
            timestamp,
            record.open,
            record.close,
            record.low,
            record.high,
            record.volume.max(0.0).round() as u64,
        ));
    }
    Ok(bars)
}

/// Parse various timestamp formats.
fn parse_timestamp(date_str: &str) -> Result<DateTime<Utc>, DataError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(date_str) {
        return Ok(dt.with_timezone(&Utc));
    }

    let datetime_formats = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];
    for format in datetime_formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(date_str, format) {
            return Ok(dt.and_utc());
        }
    }

    let date_formats = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d-%m-%Y"];
    for format in date_formats {
        if let Ok(d) = NaiveDate::parse_from_str(date_str, format) {
            if let Some(dt) = d.and_hms_opt(0, 0, 0) {
                return Ok(dt.and_utc());
            }
        }
    }

    // Unix timestamp; milliseconds if > 10 digits
    if let Ok(ts) = date_str.parse::<i64>() {
        let parsed = if ts > 10_000_000_000 {
            DateTime::from_timestamp_millis(ts)
        } else {
            DateTime::from_timestamp(ts, 0)
        };
        if let Some(dt) = parsed {
            return Ok(dt);
        }
    }

    Err(DataError::ParseError(format!(
        "Could not parse date: {}",
        date_str
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io::Write;

    const AAPL: &str = "Date,Open,High,Low,Close,Volume\n\
        2024-01-02,100,105,99,104,1000\n\
        2024-01-03,104,106,101,102,1500\n\
        2024-01-04,102,103,98,99,0\n\
        2024-01-05,99,110,99,108,2000\n";

    fn ymd(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(parse_timestamp("2024-01-15").unwrap(), ymd(2024, 1, 15));
        assert_eq!(parse_timestamp("01/15/2024").unwrap(), ymd(2024, 1, 15));
        assert!(parse_timestamp("2024-01-15 10:30:00").is_ok());
        assert!(parse_timestamp("2024-01-15T10:30:00Z").is_ok());
        assert_eq!(
            parse_timestamp("1705312800000").unwrap(),
            parse_timestamp("1705312800").unwrap()
        );
        assert!(matches!(
            parse_timestamp("yesterday"),
            Err(DataError::ParseError(_))
        ));
    }

    #[test]
    fn test_parse_bars_maps_columns() {
        let bars = parse_bars("AAPL", AAPL.as_bytes()).unwrap();

        assert_eq!(bars.len(), 4);
        let first = &bars[0];
        assert_eq!(first.instrument, "AAPL");
        assert_eq!(first.timestamp, ymd(2024, 1, 2));
        assert_eq!(
            (first.open, first.close, first.low, first.high, first.volume),
            (100.0, 104.0, 99.0, 105.0, 1000)
        );
        assert_eq!(bars[2].volume, 0);
    }

    #[test]
    fn test_lowercase_headers_and_missing_volume() {
        let csv = "timestamp,open,high,low,close\n2024-01-02,1,2,0.5,1.5\n";
        let bars = parse_bars("X", csv.as_bytes()).unwrap();
        assert_eq!(bars[0].close, 1.5);
        assert_eq!(bars[0].volume, 0);
    }

    #[test]
    fn test_bad_row_is_parse_error() {
        let csv = "Date,Open,High,Low,Close,Volume\n2024-01-02,abc,2,1,1,1\n";
        assert!(matches!(
            parse_bars("X", csv.as_bytes()),
            Err(DataError::ParseError(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_series_filters_range() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(AAPL.as_bytes()).unwrap();
        let source = CsvDataSource::new(file.path()).unwrap();

        let series = source
            .fetch_series("AAPL", ymd(2024, 1, 3), ymd(2024, 1, 4))
            .await
            .unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.first_timestamp(), Some(ymd(2024, 1, 3)));
        assert_eq!(series.last_timestamp(), Some(ymd(2024, 1, 4)));

        let empty = source
            .fetch_series("AAPL", ymd(2025, 1, 1), ymd(2025, 12, 31))
            .await;
        assert!(matches!(empty, Err(DataError::NoDataAvailable)));
    }

    #[tokio::test]
    async fn test_directory_layout() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("AAPL.csv"), AAPL).unwrap();
        let source = CsvDataSource::new(dir.path()).unwrap();

        let series = source
            .fetch_series("AAPL", ymd(2024, 1, 1), ymd(2024, 12, 31))
            .await
            .unwrap();
        assert_eq!(series.len(), 4);
        assert_eq!(series.instrument, "AAPL");

        let missing = source
            .fetch_series("MSFT", ymd(2024, 1, 1), ymd(2024, 12, 31))
            .await;
        assert!(matches!(missing, Err(DataError::InstrumentNotFound(ref i)) if i == "MSFT"));
    }

    #[test]
    fn test_missing_root() {
        assert!(CsvDataSource::new("/definitely/not/here.csv").is_err());
    }
}
