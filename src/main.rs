//! Backtester CLI application.

mod cli;
mod logging;

use anyhow::{Context, Result};
use clap::Parser;

use backtest_config::load_config_or_default;
use cli::{Cli, Commands};
use logging::setup_logging;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_file = cli.config.exists().then_some(cli.config.as_path());
    let config = load_config_or_default(config_file)
        .with_context(|| format!("Failed to load configuration from {:?}", cli.config))?;

    let level = cli
        .log_level
        .map(|l| l.as_str().to_string())
        .unwrap_or_else(|| config.logging.level.clone());
    let json = cli.json_logs || config.logging.format.eq_ignore_ascii_case("json");
    setup_logging(&level, json);

    match cli.command {
        Commands::Run(args) => cli::commands::run::run(args, &config),
        Commands::Strategies => cli::commands::strategies::run(),
        Commands::Indicator(args) => cli::commands::indicator::run(args),
        Commands::ValidateConfig => cli::commands::validate::run(&cli.config),
    }
}
