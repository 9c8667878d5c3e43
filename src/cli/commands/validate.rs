//! Validate configuration command.

use anyhow::Result;
use std::path::Path;

use backtest_config::load_config;

pub fn run(config_path: &Path) -> Result<()> {
    println!("Validating configuration: {:?}", config_path);

    let config = match load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            println!("Configuration error: {}", e);
            return Err(e.into());
        }
    };
    if let Err(e) = config.validate() {
        println!("Configuration error: {}", e);
        return Err(e.into());
    }

    println!("Configuration is valid!");
    println!();
    println!("App: {}", config.app.name);
    println!("Environment: {}", config.app.environment);
    println!("Log level: {}", config.logging.level);
    println!("Initial capital: {}", config.backtest.initial_capital);
    println!("Commission: {}%", config.backtest.commission_percent);
    println!("Slippage: {} ticks", config.backtest.slippage_ticks);
    println!("Instruments: {}", config.instruments.len());
    println!();
    println!("{}", config.to_toml()?);

    Ok(())
}
