//! metalgap CLI — download prices and write the ETF deviation CSV.
//!
//! With no arguments the standard configuration is used: USD/JPY, gold,
//! silver, platinum and palladium futures against their Tokyo-listed ETFs,
//! from 2018-08-01 to today.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use metalgap_core::data::{LogProgress, YahooProvider};
use metalgap_core::export::format_preview;
use metalgap_core::PipelineConfig;

const PREVIEW_ROWS: usize = 5;

#[derive(Parser)]
#[command(
    name = "metalgap",
    about = "Precious-metal ETF deviation from yen-converted futures",
    version
)]
struct Cli {
    /// Path to a TOML config file. Defaults to the built-in instrument set.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Start date (YYYY-MM-DD).
    #[arg(long)]
    start: Option<String>,

    /// End date (YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    end: Option<String>,

    /// Output CSV path.
    #[arg(long)]
    output: Option<PathBuf>,

    /// IANA timezone used to assign observations to calendar dates.
    #[arg(long)]
    timezone: Option<String>,

    /// Also write the yen-converted futures columns.
    #[arg(long, default_value_t = false)]
    include_converted: bool,

    /// Log filter (e.g. info, debug, metalgap_core=trace). RUST_LOG takes precedence.
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Print the effective configuration as TOML and exit.
    #[arg(long, default_value_t = false)]
    print_config: bool,
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("invalid date '{s}'"))
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("metalgap={level},metalgap_core={level}"))
    });
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn build_config(cli: &Cli) -> Result<PipelineConfig> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => PipelineConfig::default(),
    };

    if let Some(start) = cli.start.as_deref() {
        config.start = parse_date(start)?;
    }
    if let Some(end) = cli.end.as_deref() {
        config.end = Some(parse_date(end)?);
    }
    if let Some(output) = &cli.output {
        config.output = output.clone();
    }
    if let Some(tz) = &cli.timezone {
        config.timezone = tz.clone();
    }
    if cli.include_converted {
        config.include_converted = true;
    }

    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let config = build_config(&cli)?;

    if cli.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    let provider = YahooProvider::new().context("failed to create Yahoo Finance provider")?;
    let today = chrono::Local::now().date_naive();

    let report = metalgap_core::run(&config, &provider, today, &LogProgress)
        .context("pipeline failed")?;

    if !report.omitted.is_empty() {
        tracing::warn!(omitted = ?report.omitted, "instruments without data");
    }
    tracing::info!(
        "{} rows from {} to {} written to {}",
        report.output.len(),
        report.start,
        report.end,
        report.path.display()
    );

    println!("{}", format_preview(&report.output, PREVIEW_ROWS));

    Ok(())
}
