//! Market-data provider trait and structured error types.
//!
//! The MarketDataProvider trait abstracts over data sources (Yahoo Finance,
//! in-memory fixtures) so the pipeline can run against synthetic data in tests.

use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

/// One raw observation from a provider, before calendar normalization.
///
/// Either price may be missing (the provider reported a null for that field).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawQuote {
    pub timestamp: DateTime<Utc>,
    pub open: Option<f64>,
    pub close: Option<f64>,
}

impl RawQuote {
    pub fn new(timestamp: DateTime<Utc>, open: Option<f64>, close: Option<f64>) -> Self {
        Self {
            timestamp,
            open,
            close,
        }
    }
}

/// Daily open/close series for a single provider symbol.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Series {
    pub symbol: String,
    pub quotes: Vec<RawQuote>,
}

impl Series {
    pub fn new(symbol: impl Into<String>, quotes: Vec<RawQuote>) -> Self {
        Self {
            symbol: symbol.into(),
            quotes,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }
}

/// Structured error types for data operations.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("HTTP {status} for {symbol}")]
    HttpStatus { symbol: String, status: u16 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("data error: {0}")]
    Other(String),
}

/// Trait for market-data providers.
///
/// `fetch` returns unadjusted daily open/close observations for `[start, end]`.
/// An empty series is a valid answer; errors are reserved for failures.
pub trait MarketDataProvider {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    fn fetch(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<Series, DataError>;
}
