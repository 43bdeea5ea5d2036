//! Configuration management.
//!
//! Settings come from an optional TOML file, overridden by environment
//! variables such as `STRATIFY__BACKTEST__CASH=5000`.

mod settings;

pub use settings::{AppConfig, AppSettings, BacktestSettings, LoggingConfig};

use config::{Config, ConfigError, Environment, File};
use std::path::Path;

/// Load configuration from file and environment.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(File::from(path).required(true));
    }

    let config = builder
        .add_source(
            Environment::with_prefix("STRATIFY")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    config.try_deserialize()
}
