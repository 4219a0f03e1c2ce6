//! Fetch orchestrator — pulls every configured instrument one at a time.

use super::align::NamedSeries;
use super::provider::{DataError, MarketDataProvider};
use crate::config::Instrument;
use chrono::NaiveDate;

/// Progress callback for multi-instrument fetches.
pub trait FetchProgress {
    /// Called when starting to fetch an instrument.
    fn on_start(&self, instrument: &Instrument, index: usize, total: usize);

    /// Called after a successful fetch with the number of raw rows returned.
    fn on_complete(&self, instrument: &Instrument, rows: usize);

    /// Called when the provider returned no rows and the instrument is dropped.
    fn on_empty(&self, instrument: &Instrument);
}

/// Progress reporter that logs through `tracing`.
pub struct LogProgress;

impl FetchProgress for LogProgress {
    fn on_start(&self, instrument: &Instrument, index: usize, total: usize) {
        tracing::info!(
            "[{}/{}] fetching {} ({})",
            index + 1,
            total,
            instrument.name,
            instrument.symbol
        );
    }

    fn on_complete(&self, instrument: &Instrument, rows: usize) {
        tracing::debug!(instrument = %instrument.name, rows, "fetched");
    }

    fn on_empty(&self, instrument: &Instrument) {
        tracing::warn!(
            instrument = %instrument.name,
            symbol = %instrument.symbol,
            "provider returned no rows; instrument omitted"
        );
    }
}

/// Fetch all instruments in order.
///
/// Empty series are dropped. The first provider error aborts the whole fetch.
pub fn fetch_all(
    provider: &dyn MarketDataProvider,
    instruments: &[Instrument],
    start: NaiveDate,
    end: NaiveDate,
    progress: &dyn FetchProgress,
) -> Result<Vec<NamedSeries>, DataError> {
    let total = instruments.len();
    let mut fetched = Vec::with_capacity(total);

    for (i, instrument) in instruments.iter().enumerate() {
        progress.on_start(instrument, i, total);

        let series = provider.fetch(&instrument.symbol, start, end)?;
        if series.is_empty() {
            progress.on_empty(instrument);
            continue;
        }

        progress.on_complete(instrument, series.len());
        fetched.push(NamedSeries {
            name: instrument.name.clone(),
            series,
        });
    }

    Ok(fetched)
}
