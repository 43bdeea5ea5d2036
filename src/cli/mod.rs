//! CLI definitions.

pub mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "stratify")]
#[command(author, version, about = "Discrete-event backtesting simulator for trading strategies")]
pub struct Cli {
    /// Configuration file path (TOML)
    #[arg(short, long, env = "STRATIFY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level, overriding the configuration file
    #[arg(short, long)]
    pub log_level: Option<LogLevel>,

    /// Enable JSON log format
    #[arg(long)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a backtest over CSV market data
    Backtest(BacktestArgs),
    /// List available strategies
    Strategies,
    /// Validate configuration
    ValidateConfig,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(clap::Args)]
pub struct BacktestArgs {
    /// CSV file, or directory holding one <SYMBOL>.csv per symbol
    #[arg(short, long)]
    pub data: PathBuf,

    /// Symbols to trade (comma-separated)
    #[arg(short = 'S', long, value_delimiter = ',', required = true)]
    pub symbols: Vec<String>,

    /// Strategy to backtest
    #[arg(short, long)]
    pub strategy: String,

    /// Strategy configuration file (JSON)
    #[arg(long)]
    pub strategy_config: Option<PathBuf>,

    /// Starting cash
    #[arg(long)]
    pub cash: Option<f64>,

    /// Commission rate as a decimal (0.001 = 0.1%)
    #[arg(long)]
    pub commission: Option<f64>,

    /// Maximum slippage as a decimal (0.01 = 1%)
    #[arg(long)]
    pub slippage: Option<f64>,

    /// Seed for reproducible slippage
    #[arg(long)]
    pub seed: Option<u64>,

    /// Start date (YYYY-MM-DD)
    #[arg(long)]
    pub start: Option<String>,

    /// End date (YYYY-MM-DD), inclusive
    #[arg(long)]
    pub end: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Save the JSON report to a file
    #[arg(long)]
    pub save: Option<PathBuf>,
}
