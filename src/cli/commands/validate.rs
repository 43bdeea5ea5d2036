//! Validate configuration command.

use anyhow::Result;
use std::path::Path;
use stratify_config::AppConfig;

pub async fn run(config_path: Option<&Path>, config: &AppConfig) -> Result<()> {
    match config_path {
        Some(path) => println!("Validating configuration: {:?}", path),
        None => println!("Validating configuration: defaults and environment"),
    }

    if let Err(e) = config.validate() {
        println!("Configuration error: {}", e);
        return Err(e.into());
    }

    println!("Configuration is valid!");
    println!();
    println!("App: {}", config.app.name);
    println!("Environment: {}", config.app.environment);
    println!("Log level: {}", config.logging.level);
    println!("Starting cash: {:.2}", config.backtest.cash);
    println!("Commission rate: {}", config.backtest.commission_rate);
    println!("Slippage bound: {}", config.backtest.slippage_bound);
    match config.backtest.seed {
        Some(seed) => println!("Slippage seed: {}", seed),
        None => println!("Slippage seed: entropy"),
    }
    println!();
    println!("Effective configuration:");
    println!("{}", config.to_toml()?);

    Ok(())
}
