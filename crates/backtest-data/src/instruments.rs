//! Static instrument metadata.

use std::collections::HashMap;
use tracing::warn;

use backtest_core::error::DataError;
use backtest_core::traits::ExchangeMetadata;
use backtest_core::types::SymbolFilters;

/// Tick and step sizes keyed by symbol, usually loaded from configuration.
#[derive(Debug, Clone, Default)]
pub struct InstrumentTable {
    filters: HashMap<String, SymbolFilters>,
}

impl InstrumentTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(filters: HashMap<String, SymbolFilters>) -> Self {
        let filters = filters
            .into_iter()
            .map(|(symbol, f)| (symbol.to_uppercase(), f))
            .collect();
        Self { filters }
    }

    pub fn insert(&mut self, symbol: &str, filters: SymbolFilters) {
        self.filters.insert(symbol.to_uppercase(), filters);
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl ExchangeMetadata for InstrumentTable {
    fn symbol_filters(&self, symbol: &str) -> Result<SymbolFilters, DataError> {
        let filters = self
            .filters
            .get(&symbol.to_uppercase())
            .copied()
            .ok_or_else(|| DataError::SymbolNotFound(symbol.to_string()))?;

        if !(filters.tick_size > 0.0 && filters.step_size > 0.0) {
            return Err(DataError::Internal(format!(
                "Invalid filters for {}: tick_size {}, step_size {}",
                symbol, filters.tick_size, filters.step_size
            )));
        }
        Ok(filters)
    }
}

/// Look up filters for `symbol`, falling back to [`SymbolFilters::FALLBACK`].
pub fn resolve_symbol_filters(metadata: &dyn ExchangeMetadata, symbol: &str) -> SymbolFilters {
    match metadata.symbol_filters(symbol) {
        Ok(filters) => filters,
        Err(e) => {
            warn!(
                symbol,
                error = %e,
                tick_size = SymbolFilters::FALLBACK.tick_size,
                step_size = SymbolFilters::FALLBACK.step_size,
                "Symbol filters unavailable, using fallback"
            );
            SymbolFilters::FALLBACK
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> InstrumentTable {
        let mut table = InstrumentTable::new();
        table.insert(
            "btcusdt",
            SymbolFilters {
                tick_size: 0.1,
                step_size: 0.00001,
            },
        );
        table.insert(
            "BROKEN",
            SymbolFilters {
                tick_size: 0.0,
                step_size: 1.0,
            },
        );
        table
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let filters = table().symbol_filters("BTCUSDT").unwrap();
        assert_eq!(filters.tick_size, 0.1);
        assert_eq!(filters.step_size, 0.00001);
    }

    #[test]
    fn test_fallback() {
        let table = table();
        assert!(matches!(
            table.symbol_filters("ETHUSDT"),
            Err(DataError::SymbolNotFound(_))
        ));
        assert_eq!(resolve_symbol_filters(&table, "ETHUSDT"), SymbolFilters::FALLBACK);
        assert_eq!(resolve_symbol_filters(&table, "BROKEN"), SymbolFilters::FALLBACK);
        assert_eq!(resolve_symbol_filters(&table, "btcusdt").tick_size, 0.1);
    }

    #[test]
    fn test_from_map() {
        let mut map = HashMap::new();
        map.insert("solusdt".to_string(), SymbolFilters::FALLBACK);
        let table = InstrumentTable::from_map(map);
        assert_eq!(table.len(), 1);
        assert!(table.symbol_filters("SOLUSDT").is_ok());
    }
}
