//! Pipeline configuration — instruments, conversion factors, date range, output.
//!
//! The configuration is an immutable value passed into the pipeline. It can be
//! loaded from a TOML file; `PipelineConfig::default()` is the standard
//! precious-metals setup (USD/JPY, four futures, their Tokyo ETFs and the
//! composite noble-metal fund).

use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_OUTPUT: &str = "1676_market_prices_and_dev_20180801_to_now.csv";
pub const DEFAULT_TIMEZONE: &str = "UTC";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("unknown timezone '{0}'")]
    UnknownTimezone(String),

    #[error("start date {start} is after end date {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("duplicate instrument name '{0}'")]
    DuplicateInstrument(String),

    #[error("instrument '{0}' is referenced but not configured")]
    MissingInstrument(String),

    #[error("conversion factor for {commodity} must be finite, got {factor}")]
    InvalidFactor { commodity: String, factor: f64 },
}

/// A logical instrument name mapped to a provider symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
    pub name: String,
    pub symbol: String,
}

impl Instrument {
    pub fn new(name: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            symbol: symbol.into(),
        }
    }
}

/// A commodity with its futures→ETF unit conversion factor.
///
/// The commodity `Gold` pairs the instruments `Gold_F` and `Gold_ETF`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commodity {
    pub name: String,
    pub factor: f64,
}

impl Commodity {
    pub fn new(name: impl Into<String>, factor: f64) -> Self {
        Self {
            name: name.into(),
            factor,
        }
    }

    pub fn futures(&self) -> String {
        format!("{}_F", self.name)
    }

    pub fn etf(&self) -> String {
        format!("{}_ETF", self.name)
    }

    /// Name of the yen-converted futures series, e.g. `Gold_F_JPY`.
    pub fn converted(&self) -> String {
        format!("{}_F_JPY", self.name)
    }

    /// Name of the deviation series, e.g. `Gold_dev`.
    pub fn deviation(&self) -> String {
        format!("{}_dev", self.name)
    }
}

/// Complete configuration for one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// First date requested from the provider (inclusive).
    pub start: NaiveDate,

    /// Last date requested (inclusive). `None` means today at run time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<NaiveDate>,

    /// Name of the FX instrument (quote currency per USD).
    pub fx: String,

    /// IANA timezone that provider timestamps are normalized to before
    /// truncating to a calendar date.
    #[serde(default = "default_timezone")]
    pub timezone: String,

    #[serde(default = "default_output")]
    pub output: PathBuf,

    /// Also write the `*_F_JPY_*` columns to the CSV.
    #[serde(default)]
    pub include_converted: bool,

    /// Instruments in fetch order.
    pub instruments: Vec<Instrument>,

    /// Commodities in presentation order.
    pub commodities: Vec<Commodity>,
}

fn default_timezone() -> String {
    DEFAULT_TIMEZONE.to_string()
}

fn default_output() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT)
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let instruments = [
            ("USDJPY", "JPY=X"),
            ("Gold_F", "GC=F"),
            ("Gold_ETF", "1672.T"),
            ("Silver_F", "SI=F"),
            ("Silver_ETF", "1673.T"),
            ("Platinum_F", "PL=F"),
            ("Platinum_ETF", "1674.T"),
            ("Palladium_F", "PA=F"),
            ("Palladium_ETF", "1675.T"),
            ("NobleMetal_ETF", "1676.T"),
        ]
        .into_iter()
        .map(|(name, symbol)| Instrument::new(name, symbol))
        .collect();

        let commodities = [
            ("Gold", 0.1),
            ("Silver", 1.0),
            ("Platinum", 0.1),
            ("Palladium", 0.1),
        ]
        .into_iter()
        .map(|(name, factor)| Commodity::new(name, factor))
        .collect();

        Self {
            start: NaiveDate::from_ymd_opt(2018, 8, 1).unwrap_or_default(),
            end: None,
            fx: "USDJPY".into(),
            timezone: default_timezone(),
            output: default_output(),
            include_converted: false,
            instruments,
            commodities,
        }
    }
}

impl PipelineConfig {
    /// Load a configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse a configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Serialize the configuration to TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// End date, falling back to `today` when unset.
    pub fn end_or(&self, today: NaiveDate) -> NaiveDate {
        self.end.unwrap_or(today)
    }

    pub fn reference_timezone(&self) -> Result<Tz, ConfigError> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| ConfigError::UnknownTimezone(self.timezone.clone()))
    }

    pub fn instrument(&self, name: &str) -> Option<&Instrument> {
        self.instruments.iter().find(|i| i.name == name)
    }

    /// Check internal consistency against the resolved end date.
    pub fn validate(&self, end: NaiveDate) -> Result<(), ConfigError> {
        if self.start > end {
            return Err(ConfigError::InvalidRange {
                start: self.start,
                end,
            });
        }

        self.reference_timezone()?;

        let mut seen = HashSet::new();
        for instrument in &self.instruments {
            if !seen.insert(instrument.name.as_str()) {
                return Err(ConfigError::DuplicateInstrument(instrument.name.clone()));
            }
        }

        if self.instrument(&self.fx).is_none() {
            return Err(ConfigError::MissingInstrument(self.fx.clone()));
        }

        for commodity in &self.commodities {
            if !commodity.factor.is_finite() {
                return Err(ConfigError::InvalidFactor {
                    commodity: commodity.name.clone(),
                    factor: commodity.factor,
                });
            }
            for name in [commodity.futures(), commodity.etf()] {
                if self.instrument(&name).is_none() {
                    return Err(ConfigError::MissingInstrument(name));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    #[test]
    fn default_config_is_valid() {
        let config = PipelineConfig::default();
        config.validate(today()).unwrap();
        assert_eq!(config.instruments.len(), 10);
        assert_eq!(config.commodities.len(), 4);
        assert_eq!(config.instrument("NobleMetal_ETF").unwrap().symbol, "1676.T");
        assert_eq!(config.start, NaiveDate::from_ymd_opt(2018, 8, 1).unwrap());
        assert_eq!(config.output, PathBuf::from(DEFAULT_OUTPUT));
    }

    #[test]
    fn toml_roundtrip() {
        let config = PipelineConfig::default();
        let toml_str = config.to_toml().unwrap();
        let parsed = PipelineConfig::from_toml(&toml_str).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn optional_fields_default() {
        let config = PipelineConfig::from_toml(
            r#"
            start = "2024-01-01"
            fx = "USDJPY"

            [[instruments]]
            name = "USDJPY"
            symbol = "JPY=X"

            [[instruments]]
            name = "Gold_F"
            symbol = "GC=F"

            [[instruments]]
            name = "Gold_ETF"
            symbol = "1672.T"

            [[commodities]]
            name = "Gold"
            factor = 0.1
            "#,
        )
        .unwrap();

        assert_eq!(config.end, None);
        assert_eq!(config.timezone, "UTC");
        assert!(!config.include_converted);
        assert_eq!(config.end_or(today()), today());
        config.validate(today()).unwrap();
    }

    #[test]
    fn rejects_inverted_range() {
        let mut config = PipelineConfig::default();
        config.end = Some(NaiveDate::from_ymd_opt(2018, 1, 1).unwrap());
        let end = config.end_or(today());
        assert!(matches!(
            config.validate(end),
            Err(ConfigError::InvalidRange { .. })
        ));
    }

    #[test]
    fn rejects_unknown_timezone() {
        let config = PipelineConfig {
            timezone: "Mars/Olympus".into(),
            ..PipelineConfig::default()
        };
        assert!(matches!(
            config.validate(today()),
            Err(ConfigError::UnknownTimezone(_))
        ));
    }

    #[test]
    fn tokyo_timezone_parses() {
        let config = PipelineConfig {
            timezone: "Asia/Tokyo".into(),
            ..PipelineConfig::default()
        };
        assert_eq!(config.reference_timezone().unwrap(), chrono_tz::Asia::Tokyo);
    }

    #[test]
    fn rejects_duplicate_names() {
        let mut config = PipelineConfig::default();
        config.instruments.push(Instrument::new("Gold_F", "GC=F"));
        assert!(matches!(
            config.validate(today()),
            Err(ConfigError::DuplicateInstrument(name)) if name == "Gold_F"
        ));
    }

    #[test]
    fn rejects_commodity_without_etf() {
        let mut config = PipelineConfig::default();
        config.instruments.retain(|i| i.name != "Silver_ETF");
        assert!(matches!(
            config.validate(today()),
            Err(ConfigError::MissingInstrument(name)) if name == "Silver_ETF"
        ));
    }

    #[test]
    fn rejects_missing_fx() {
        let config = PipelineConfig {
            fx: "EURJPY".into(),
            ..PipelineConfig::default()
        };
        assert!(matches!(
            config.validate(today()),
            Err(ConfigError::MissingInstrument(name)) if name == "EURJPY"
        ));
    }

    #[test]
    fn commodity_column_names() {
        let gold = Commodity::new("Gold", 0.1);
        assert_eq!(gold.futures(), "Gold_F");
        assert_eq!(gold.etf(), "Gold_ETF");
        assert_eq!(gold.converted(), "Gold_F_JPY");
        assert_eq!(gold.deviation(), "Gold_dev");
    }
}
