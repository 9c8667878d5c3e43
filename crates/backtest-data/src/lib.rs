//! Data sources for backtests.
//!
//! Bars come from local CSV files and instrument filters from a static
//! table, both behind the provider traits in `backtest-core`.

mod csv_source;
mod instruments;

pub use csv_source::CsvDataSource;
pub use instruments::{resolve_symbol_filters, InstrumentTable};

use std::path::Path;

use backtest_core::error::DataError;
use backtest_core::types::Bar;

/// Load every bar from a CSV file, oldest first.
pub fn load_csv(path: impl AsRef<Path>) -> Result<Vec<Bar>, DataError> {
    CsvDataSource::new(path)?.load_all()
}
