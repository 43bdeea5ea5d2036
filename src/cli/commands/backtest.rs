//! Backtest command implementation.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use stratify_backtest::BacktestEngine;
use stratify_config::AppConfig;
use stratify_core::traits::DataSource;
use stratify_core::types::MarketSeries;
use stratify_data::CsvDataSource;
use stratify_strategies::StrategyRegistry;
use tracing::info;

use crate::cli::{BacktestArgs, OutputFormat};

pub async fn run(args: BacktestArgs, mut config: AppConfig) -> Result<()> {
    info!(strategy = %args.strategy, symbols = ?args.symbols, "starting backtest");

    if let Some(cash) = args.cash {
        config.backtest.cash = cash;
    }
    if let Some(rate) = args.commission {
        config.backtest.commission_rate = rate;
    }
    if let Some(bound) = args.slippage {
        config.backtest.slippage_bound = bound;
    }
    if args.seed.is_some() {
        config.backtest.seed = args.seed;
    }
    config.validate().context("Invalid backtest settings")?;

    // Create strategy
    let registry = StrategyRegistry::new();
    let strategy = match &args.strategy_config {
        Some(path) => {
            let raw = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read strategy config {}", path.display()))?;
            let value: serde_json::Value =
                serde_json::from_str(&raw).context("Strategy config is not valid JSON")?;
            registry.create(&args.strategy, value, args.symbols.clone())
        }
        None => registry.create_default(&args.strategy, args.symbols.clone()),
    }
    .context("Failed to create strategy")?;

    // Load data
    if args.data.is_file() && args.symbols.len() > 1 {
        bail!(
            "A single CSV file holds one symbol; pass a directory with one <SYMBOL>.csv per symbol"
        );
    }
    let start = match &args.start {
        Some(s) => parse_date(s, NaiveTime::MIN)?,
        None => DateTime::<Utc>::MIN_UTC,
    };
    let end = match &args.end {
        Some(s) => parse_date(s, end_of_day())?,
        None => DateTime::<Utc>::MAX_UTC,
    };
    let series = load_series(&args, start, end).await?;

    // Run backtest
    let mut engine = BacktestEngine::from_config(&config.backtest.to_engine_config());
    for s in series {
        engine.add_series(s)?;
    }
    engine.add_strategy(strategy);
    let report = engine.run()?;

    // Output results
    match args.output {
        OutputFormat::Json => println!("{}", report.to_json()?),
        OutputFormat::Text => println!("{}", report.summary()),
    }

    // Save if requested
    if let Some(save_path) = &args.save {
        tokio::fs::write(save_path, report.to_json()?)
            .await
            .with_context(|| format!("Failed to write {}", save_path.display()))?;
        info!("Results saved to {:?}", save_path);
    }

    Ok(())
}

async fn load_series(
    args: &BacktestArgs,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<MarketSeries>> {
    let source = CsvDataSource::new(&args.data)
        .with_context(|| format!("Data path '{}' is not usable", args.data.display()))?;

    let mut series = Vec::with_capacity(args.symbols.len());
    for symbol in &args.symbols {
        let s = source
            .fetch_series(symbol, start, end)
            .await
            .with_context(|| format!("Failed to load data for {symbol}"))?;
        info!(symbol = %symbol, bars = s.len(), "loaded market data");
        series.push(s);
    }
    Ok(series)
}

fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN)
}

fn parse_date(s: &str, time: NaiveTime) -> Result<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{s}', expected YYYY-MM-DD"))?;
    Ok(date.and_time(time).and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_date_bounds() {
        let start = parse_date("2024-03-01", NaiveTime::MIN).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());

        let end = parse_date("2024-03-01", end_of_day()).unwrap();
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 3, 1, 23, 59, 59).unwrap());

        assert!(parse_date("03/01/2024", NaiveTime::MIN).is_err());
    }
}
