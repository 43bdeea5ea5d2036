//! Configuration structures.

use serde::{Deserialize, Serialize};
use stratify_backtest::BacktestConfig;
use stratify_core::error::StratifyError;

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub backtest: BacktestSettings,
}

impl AppConfig {
    /// Check the values the simulator itself does not police.
    pub fn validate(&self) -> Result<(), StratifyError> {
        self.logging.validate()?;
        self.backtest.validate()
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, StratifyError> {
        toml::to_string_pretty(self).map_err(|e| StratifyError::Serialization(e.to_string()))
    }
}

/// General app settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    pub name: String,
    pub environment: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            name: "stratify".to_string(),
            environment: "development".to_string(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`
    pub level: String,
    /// `pretty` or `json`
    pub format: String,
    /// Optional log file, written without ANSI colours
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file: None,
        }
    }
}

impl LoggingConfig {
    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }

    fn validate(&self) -> Result<(), StratifyError> {
        match self.format.to_ascii_lowercase().as_str() {
            "pretty" | "json" => Ok(()),
            other => Err(StratifyError::Config(format!(
                "unknown log format '{other}', expected 'pretty' or 'json'"
            ))),
        }
    }
}

/// Backtest settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestSettings {
    /// Starting cash
    pub cash: f64,
    /// Commission as a decimal fraction of traded value
    pub commission_rate: f64,
    /// Maximum adverse slippage as a decimal fraction
    pub slippage_bound: f64,
    /// Slippage seed; unseeded runs draw from OS entropy
    pub seed: Option<u64>,
}

impl Default for BacktestSettings {
    fn default() -> Self {
        let engine = BacktestConfig::default();
        Self {
            cash: engine.cash,
            commission_rate: engine.commission_rate,
            slippage_bound: engine.slippage_bound,
            seed: engine.seed,
        }
    }
}

impl BacktestSettings {
    fn validate(&self) -> Result<(), StratifyError> {
        if !self.cash.is_finite() {
            return Err(StratifyError::Config(format!(
                "backtest.cash must be finite, got {}",
                self.cash
            )));
        }
        if self.commission_rate.is_nan() || self.commission_rate < 0.0 {
            return Err(StratifyError::Config(format!(
                "backtest.commission_rate must be non-negative, got {}",
                self.commission_rate
            )));
        }
        if self.slippage_bound.is_nan() || self.slippage_bound < 0.0 {
            return Err(StratifyError::Config(format!(
                "backtest.slippage_bound must be non-negative, got {}",
                self.slippage_bound
            )));
        }
        Ok(())
    }

    /// Engine configuration for these settings.
    pub fn to_engine_config(&self) -> BacktestConfig {
        BacktestConfig {
            cash: self.cash,
            commission_rate: self.commission_rate,
            slippage_bound: self.slippage_bound,
            seed: self.seed,
        }
    }
}
