//! Interfaces to external market data and exchange metadata.
//!
//! The engine never calls these itself; callers fetch bars and filters
//! up front and pass plain values into a run.

use crate::error::DataError;
use crate::types::{Bar, SymbolFilters, Timeframe};

/// Upper bound on bars returned by a single upstream request.
/// Network implementations page backwards in chunks of this size.
pub const MAX_BARS_PER_REQUEST: usize = 1000;

/// Source of historical bars.
pub trait BarProvider: Send + Sync {
    /// Fetch the most recent `count` bars, ordered from oldest to newest.
    fn fetch_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> Result<Vec<Bar>, DataError>;
}

/// Source of per-instrument tick and step sizes.
pub trait ExchangeMetadata: Send + Sync {
    /// Look up the filters for `symbol`.
    fn symbol_filters(&self, symbol: &str) -> Result<SymbolFilters, DataError>;
}
