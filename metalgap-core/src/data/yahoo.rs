//! Yahoo Finance data provider.
//!
//! Fetches daily open/close observations from Yahoo's v8 chart API using a
//! blocking client. There is no retry: a failed request is returned to the
//! caller as-is.
//!
//! Yahoo Finance has no official API and is subject to unannounced format changes.

use super::provider::{DataError, MarketDataProvider, RawQuote, Series};
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use reqwest::Url;
use serde::Deserialize;
use std::time::Duration;

const CHART_BASE_URL: &str = "https://query2.finance.yahoo.com/v8/finance/chart/";

/// Yahoo Finance v8 chart API response.
#[derive(Debug, Deserialize)]
pub(crate) struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    #[serde(default)]
    meta: Option<ChartMeta>,
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    #[serde(rename = "exchangeTimezoneName")]
    exchange_timezone_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteData>,
}

// Yahoo returns `"quote": [{}]` for ranges without any bars.
#[derive(Debug, Default, Deserialize)]
struct QuoteData {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
}

/// Yahoo Finance data provider.
pub struct YahooProvider {
    client: reqwest::blocking::Client,
}

impl YahooProvider {
    pub fn new() -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }

    /// Build the chart API URL for a symbol and an inclusive date range.
    pub(crate) fn chart_url(symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<Url, DataError> {
        let start_ts = start.and_time(NaiveTime::MIN).and_utc().timestamp();
        let end_ts = end
            .and_hms_opt(23, 59, 59)
            .map(|dt| dt.and_utc().timestamp())
            .ok_or_else(|| DataError::Other(format!("invalid end date: {end}")))?;

        let mut url = Url::parse(CHART_BASE_URL)
            .map_err(|e| DataError::Other(format!("invalid chart base URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| DataError::Other("chart base URL cannot take path segments".into()))?
            .pop_if_empty()
            .push(symbol);
        url.query_pairs_mut()
            .append_pair("period1", &start_ts.to_string())
            .append_pair("period2", &end_ts.to_string())
            .append_pair("interval", "1d")
            .append_pair("includeAdjustedClose", "false");
        Ok(url)
    }

    /// Parse the chart API response into raw quotes.
    ///
    /// A response with no timestamps, or Yahoo's "Not Found" error for a range
    /// without data, is an empty series rather than an error.
    ///
    /// Daily bars are re-stamped to midnight of their exchange-local date, so a
    /// Tokyo bar reported at 09:00 JST becomes 00:00 JST (15:00 UTC the day
    /// before).
    pub(crate) fn parse_response(symbol: &str, resp: ChartResponse) -> Result<Series, DataError> {
        let Some(result) = resp.chart.result else {
            return match resp.chart.error {
                Some(err) if err.code == "Not Found" => {
                    tracing::debug!(symbol, description = %err.description, "no data for range");
                    Ok(Series::new(symbol, Vec::new()))
                }
                Some(err) => Err(DataError::ResponseFormatChanged(format!(
                    "{}: {}",
                    err.code, err.description
                ))),
                None => Err(DataError::ResponseFormatChanged(
                    "empty result with no error".into(),
                )),
            };
        };

        let Some(data) = result.into_iter().next() else {
            return Ok(Series::new(symbol, Vec::new()));
        };

        let Some(timestamps) = data.timestamp else {
            return Ok(Series::new(symbol, Vec::new()));
        };

        let exchange_tz = data
            .meta
            .and_then(|m| m.exchange_timezone_name)
            .and_then(|name| match name.parse::<Tz>() {
                Ok(tz) => Some(tz),
                Err(_) => {
                    tracing::warn!(symbol, timezone = %name, "unknown exchange timezone, using UTC");
                    None
                }
            })
            .unwrap_or(Tz::UTC);

        let quote = data.indicators.quote.into_iter().next().unwrap_or_default();

        let mut quotes = Vec::with_capacity(timestamps.len());
        for (i, &ts) in timestamps.iter().enumerate() {
            let open = quote.open.get(i).copied().flatten();
            let close = quote.close.get(i).copied().flatten();

            // Rows with neither price are non-trading placeholders
            if open.is_none() && close.is_none() {
                continue;
            }

            quotes.push(RawQuote::new(exchange_midnight(ts, exchange_tz)?, open, close));
        }

        Ok(Series::new(symbol, quotes))
    }
}

/// Midnight of the exchange-local date that `ts` falls on, in UTC.
fn exchange_midnight(ts: i64, tz: Tz) -> Result<DateTime<Utc>, DataError> {
    let invalid = || DataError::ResponseFormatChanged(format!("invalid timestamp: {ts}"));

    let instant = DateTime::from_timestamp(ts, 0).ok_or_else(invalid)?;
    let local_date = instant.with_timezone(&tz).date_naive();
    tz.from_local_datetime(&local_date.and_time(NaiveTime::MIN))
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(invalid)
}

impl MarketDataProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn fetch(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<Series, DataError> {
        let url = Self::chart_url(symbol, start, end)?;
        tracing::debug!(%url, "requesting chart");

        let resp = self
            .client
            .get(url)
            .send()
            .map_err(|e| DataError::NetworkUnreachable(e.to_string()))?;

        let status = resp.status();
        // Yahoo answers a range without data with 404 and a chart error body
        if status == reqwest::StatusCode::NOT_FOUND {
            let chart: ChartResponse = resp.json().map_err(|_| DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            })?;
            return Self::parse_response(symbol, chart);
        }
        if !status.is_success() {
            return Err(DataError::HttpStatus {
                symbol: symbol.to_string(),
                status: status.as_u16(),
            });
        }

        let chart: ChartResponse = resp.json().map_err(|e| {
            DataError::ResponseFormatChanged(format!("failed to parse response for {symbol}: {e}"))
        })?;

        Self::parse_response(symbol, chart)
    }
}
