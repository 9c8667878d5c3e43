//! Run command implementation.

use anyhow::{Context, Result};
use serde_json::Value;
use std::path::Path;
use tracing::info;

use backtest_config::AppConfig;
use backtest_core::traits::BarProvider;
use backtest_core::types::{CostConfig, RoundingFlags, SymbolFilters};
use backtest_data::{resolve_symbol_filters, CsvDataSource, InstrumentTable};
use backtest_engine::{run_backtest, BacktestReport};
use backtest_strategies::{StrategyParams, StrategyRegistry};

use crate::cli::{OutputFormat, RunArgs};

pub fn run(args: RunArgs, config: &AppConfig) -> Result<()> {
    info!("Starting backtest for strategy: {}", args.strategy);

    let rounding = if args.no_rounding {
        RoundingFlags::none()
    } else {
        RoundingFlags::all()
    };

    let registry = StrategyRegistry::new();
    let overrides = match &args.params {
        Some(path) => load_params(path)?,
        None => Value::Object(Default::default()),
    };
    let mut params = registry
        .create(&args.strategy, overrides)
        .context("Failed to create strategy")?;
    if args.no_rounding {
        set_rounding(&mut params, rounding);
    }

    let source = CsvDataSource::new(&args.data)
        .with_context(|| format!("Cannot open data file '{}'", args.data.display()))?;
    let symbol = args.symbol.clone().unwrap_or_else(|| "DATA".to_string());
    let bars = match args.bars {
        Some(count) => source.fetch_bars(&symbol, args.timeframe, count)?,
        None => source.load_all()?,
    };
    info!("Loaded {} bars from {}", bars.len(), args.data.display());

    let cost = cost_config(&args, config);
    let capital = args.capital.unwrap_or(config.backtest.initial_capital);

    let result = run_backtest(&bars, cost, capital, &params, rounding).context("Backtest failed")?;
    let report = BacktestReport::new(format!("{} / {}", params.name(), symbol), result);

    match args.output {
        OutputFormat::Json => println!("{}", report.to_json()?),
        OutputFormat::Text => println!("{}", report.summary()),
    }

    if let Some(save_path) = &args.save {
        std::fs::write(save_path, report.to_json()?)
            .with_context(|| format!("Cannot write {}", save_path.display()))?;
        info!("Results saved to {:?}", save_path);
    }
    if let Some(path) = &args.trades_csv {
        std::fs::write(path, report.trades_to_csv())
            .with_context(|| format!("Cannot write {}", path.display()))?;
        info!("Trade log saved to {:?}", path);
    }
    if let Some(path) = &args.equity_csv {
        std::fs::write(path, report.equity_to_csv())
            .with_context(|| format!("Cannot write {}", path.display()))?;
        info!("Equity curve saved to {:?}", path);
    }

    Ok(())
}

/// Read strategy parameters from a TOML or JSON file.
fn load_params(path: &Path) -> Result<Value> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read parameters from {}", path.display()))?;

    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        serde_json::from_str(&text).context("Invalid JSON parameters")
    } else {
        toml::from_str(&text).context("Invalid TOML parameters")
    }
}

fn set_rounding(params: &mut StrategyParams, rounding: RoundingFlags) {
    match params {
        StrategyParams::Crossover(p) => p.rounding = rounding,
        StrategyParams::EmaVwap(p) => p.rounding = rounding,
        StrategyParams::CrossoverMinimal(_) => {}
    }
}

fn cost_config(args: &RunArgs, config: &AppConfig) -> CostConfig {
    let filters = match &args.symbol {
        Some(symbol) => {
            let table = InstrumentTable::from_map(config.instruments.clone());
            resolve_symbol_filters(&table, symbol)
        }
        None => SymbolFilters::FALLBACK,
    };
    let filters = SymbolFilters {
        tick_size: args.tick_size.unwrap_or(filters.tick_size),
        step_size: args.step_size.unwrap_or(filters.step_size),
    };

    let mut cost = config.backtest.cost_config(filters);
    if let Some(commission) = args.commission {
        cost.commission_percent = commission;
    }
    if let Some(slippage) = args.slippage_ticks {
        cost.slippage_ticks = slippage;
    }
    cost
}
