//! metalgap core — precious-metal ETF vs. futures deviation pipeline.
//!
//! This crate contains the whole data path:
//! - Configuration of instruments, conversion factors and date range
//! - Market-data provider trait with a Yahoo Finance implementation
//! - Calendar alignment with forward-fill
//! - Yen conversion and deviation percentages
//! - CSV export and console preview

pub mod config;
pub mod data;
pub mod export;
pub mod pipeline;
pub mod table;
pub mod transform;

pub use config::{Commodity, ConfigError, Instrument, PipelineConfig};
pub use pipeline::{build_table, run, PipelineError, PipelineReport};
pub use table::{Field, PriceTable};
