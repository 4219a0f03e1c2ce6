//! End-to-end pipeline: fetch → align → derive → select → write.

use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

use crate::config::{ConfigError, PipelineConfig};
use crate::data::align::align_series;
use crate::data::fetch::{fetch_all, FetchProgress};
use crate::data::provider::{DataError, MarketDataProvider};
use crate::export::{output_columns, write_csv, ExportError};
use crate::table::{PriceTable, TableError};
use crate::transform::derive_deviations;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Export(#[from] ExportError),
}

/// Everything a run produced, for inspection by the caller.
#[derive(Debug)]
pub struct PipelineReport {
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Aligned table with every fetched and derived column.
    pub merged: PriceTable,
    /// The column selection that was written.
    pub output: PriceTable,
    /// Configured instruments for which the provider returned no rows.
    pub omitted: Vec<String>,
    pub path: PathBuf,
}

/// Fetch, align and derive without writing anything.
///
/// Returns the merged table and the names of omitted instruments.
pub fn build_table(
    config: &PipelineConfig,
    provider: &dyn MarketDataProvider,
    end: NaiveDate,
    progress: &dyn FetchProgress,
) -> Result<(PriceTable, Vec<String>), PipelineError> {
    config.validate(end)?;
    let tz = config.reference_timezone()?;

    tracing::info!(
        provider = provider.name(),
        start = %config.start,
        %end,
        instruments = config.instruments.len(),
        "fetching"
    );
    let fetched = fetch_all(provider, &config.instruments, config.start, end, progress)?;

    let omitted = config
        .instruments
        .iter()
        .filter(|i| !fetched.iter().any(|f| f.name == i.name))
        .map(|i| i.name.clone())
        .collect();

    let mut table = align_series(&fetched, tz)?;
    let added = derive_deviations(&mut table, &config.fx, &config.commodities)?;
    tracing::debug!(columns = ?added, "derived columns");

    Ok((table, omitted))
}

/// Run the whole pipeline and write the CSV to `config.output`.
///
/// `today` resolves an open-ended date range. Nothing is written unless every
/// earlier stage succeeds.
pub fn run(
    config: &PipelineConfig,
    provider: &dyn MarketDataProvider,
    today: NaiveDate,
    progress: &dyn FetchProgress,
) -> Result<PipelineReport, PipelineError> {
    let end = config.end_or(today);
    let (merged, omitted) = build_table(config, provider, end, progress)?;

    let columns = output_columns(&config.fx, &config.commodities, config.include_converted);
    let output = merged.select(&columns);
    write_csv(&output, &config.output)?;

    Ok(PipelineReport {
        start: config.start,
        end,
        merged,
        output,
        omitted,
        path: config.output.clone(),
    })
}
