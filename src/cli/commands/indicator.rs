//! Indicator command implementation.

use anyhow::{Context, Result};

use backtest_core::types::PriceSource;
use backtest_data::load_csv;
use backtest_indicators::{compute_indicator_series, IndicatorKind};

use crate::cli::{IndicatorArgs, IndicatorName};

pub fn run(args: IndicatorArgs) -> Result<()> {
    let bars = load_csv(&args.data)
        .with_context(|| format!("Cannot load bars from '{}'", args.data.display()))?;

    let kind = match args.kind {
        IndicatorName::Sma => IndicatorKind::Sma {
            source: args.source.unwrap_or_default(),
        },
        IndicatorName::Ema => IndicatorKind::Ema {
            source: args.source.unwrap_or_default(),
        },
        IndicatorName::Atr => IndicatorKind::Atr,
        IndicatorName::Adx => IndicatorKind::Adx,
        IndicatorName::PlusDi => IndicatorKind::PlusDi,
        IndicatorName::MinusDi => IndicatorKind::MinusDi,
        IndicatorName::Vwap => IndicatorKind::Vwap {
            anchor: args.anchor,
            source: args.source.unwrap_or(PriceSource::Hlc3),
        },
    };

    let values = compute_indicator_series(&bars, kind, args.period)?;

    // Values start at the first ready bar
    let offset = bars.len() - values.len();
    println!("timestamp,value");
    for (bar, value) in bars[offset..].iter().zip(values.iter()) {
        println!("{},{}", bar.timestamp, value);
    }

    Ok(())
}
