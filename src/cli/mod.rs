//! CLI definitions.

pub mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use backtest_core::types::{PriceSource, Timeframe};
use backtest_indicators::VwapAnchor;

#[derive(Parser)]
#[command(name = "backtest")]
#[command(author, version, about = "Deterministic bar-replay backtester")]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config/default.toml", env = "BACKTEST_CONFIG")]
    pub config: PathBuf,

    /// Log level, defaults to the configured level
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
    pub fn as_str(&self) -> &'static str {
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
    /// Run a backtest over a CSV file
    Run(RunArgs),
    /// List available strategies with their default parameters
    Strategies,
    /// Compute an indicator series over a CSV file
    Indicator(IndicatorArgs),
    /// Validate configuration
    ValidateConfig,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(clap::Args)]
pub struct RunArgs {
    /// Data file (CSV)
    #[arg(short, long)]
    pub data: PathBuf,

    /// Strategy to backtest
    #[arg(short, long)]
    pub strategy: String,

    /// Strategy parameters (TOML or JSON); missing fields take defaults
    #[arg(short, long)]
    pub params: Option<PathBuf>,

    /// Symbol used to look up tick and step sizes
    #[arg(short = 'S', long)]
    pub symbol: Option<String>,

    /// Interval of the data file
    #[arg(short, long, default_value = "1h")]
    pub timeframe: Timeframe,

    /// Only use the most recent N bars
    #[arg(long)]
    pub bars: Option<usize>,

    /// Initial capital
    #[arg(long)]
    pub capital: Option<f64>,

    /// Commission in percent of notional per fill
    #[arg(long)]
    pub commission: Option<f64>,

    /// Slippage per fill in ticks
    #[arg(long)]
    pub slippage_ticks: Option<f64>,

    /// Override the instrument tick size
    #[arg(long)]
    pub tick_size: Option<f64>,

    /// Override the instrument step size
    #[arg(long)]
    pub step_size: Option<f64>,

    /// Disable all exchange rounding
    #[arg(long)]
    pub no_rounding: bool,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Save the full result as JSON
    #[arg(long)]
    pub save: Option<PathBuf>,

    /// Write the trade log as CSV
    #[arg(long)]
    pub trades_csv: Option<PathBuf>,

    /// Write the equity and PnL curves as CSV
    #[arg(long)]
    pub equity_csv: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum IndicatorName {
    Sma,
    Ema,
    Atr,
    Adx,
    PlusDi,
    MinusDi,
    Vwap,
}

#[derive(clap::Args)]
pub struct IndicatorArgs {
    /// Data file (CSV)
    #[arg(short, long)]
    pub data: PathBuf,

    /// Indicator to compute
    #[arg(short, long, value_enum)]
    pub kind: IndicatorName,

    /// Indicator period
    #[arg(short, long, default_value = "14")]
    pub period: usize,

    /// Price source for SMA, EMA and VWAP
    #[arg(long)]
    pub source: Option<PriceSource>,

    /// VWAP anchor period
    #[arg(long, default_value = "session")]
    pub anchor: VwapAnchor,
}
