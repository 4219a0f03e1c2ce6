//! In-memory provider backed by pre-built series.
//!
//! Used for offline runs and tests. Unknown symbols answer with an empty
//! series, the same way an instrument with no history behaves upstream.

use super::provider::{DataError, MarketDataProvider, RawQuote, Series};
use chrono::NaiveDate;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct StaticProvider {
    series: HashMap<String, Vec<RawQuote>>,
    failing: HashMap<String, String>,
}

impl StaticProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register quotes for a symbol, replacing any previous set.
    pub fn with_series(mut self, symbol: impl Into<String>, quotes: Vec<RawQuote>) -> Self {
        self.series.insert(symbol.into(), quotes);
        self
    }

    /// Make every fetch of `symbol` fail with `DataError::NetworkUnreachable`.
    pub fn with_failure(mut self, symbol: impl Into<String>, reason: impl Into<String>) -> Self {
        self.failing.insert(symbol.into(), reason.into());
        self
    }
}

impl MarketDataProvider for StaticProvider {
    fn name(&self) -> &str {
        "static"
    }

    fn fetch(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<Series, DataError> {
        if let Some(reason) = self.failing.get(symbol) {
            return Err(DataError::NetworkUnreachable(reason.clone()));
        }

        let quotes = self
            .series
            .get(symbol)
            .map(|quotes| {
                quotes
                    .iter()
                    .filter(|q| {
                        let date = q.timestamp.date_naive();
                        date >= start && date <= end
                    })
                    .copied()
                    .collect()
            })
            .unwrap_or_default();

        Ok(Series::new(symbol, quotes))
    }
}
