//! Market data: providers, fetching and calendar alignment

pub mod align;
pub mod fetch;
pub mod memory;
pub mod provider;
pub mod yahoo;

pub use align::{align_series, NamedSeries};
pub use fetch::{fetch_all, FetchProgress, LogProgress};
pub use memory::StaticProvider;
pub use provider::{DataError, MarketDataProvider, RawQuote, Series};
pub use yahoo::YahooProvider;
