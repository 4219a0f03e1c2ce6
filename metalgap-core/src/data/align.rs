//! Multi-instrument calendar alignment.
//!
//! Markets in the set (FX, US futures, Tokyo ETFs) trade on different
//! calendars. Every timestamp is moved into one reference timezone and
//! truncated to a date; the per-instrument daily series are then outer-joined
//! on date and forward-filled so each row has a usable value.

use super::provider::Series;
use crate::table::{Field, PriceTable, TableError};
use chrono::NaiveDate;
use chrono_tz::Tz;
use std::collections::{BTreeMap, BTreeSet};

/// One calendar day of an instrument after collapsing intraday observations.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DailyBar {
    pub open: Option<f64>,
    pub close: Option<f64>,
}

impl DailyBar {
    fn get(&self, field: Field) -> Option<f64> {
        match field {
            Field::Open => self.open,
            Field::Close => self.close,
        }
    }
}

/// A fetched series labelled with its logical instrument name.
#[derive(Debug, Clone)]
pub struct NamedSeries {
    pub name: String,
    pub series: Series,
}

/// Collapse raw quotes to one bar per calendar date in `tz`.
///
/// Quotes are taken in timestamp order; for each field the last non-missing
/// observation of the day wins.
pub fn collapse_daily(series: &Series, tz: Tz) -> BTreeMap<NaiveDate, DailyBar> {
    let mut quotes: Vec<_> = series.quotes.iter().collect();
    quotes.sort_by_key(|q| q.timestamp);

    let mut days: BTreeMap<NaiveDate, DailyBar> = BTreeMap::new();
    for quote in quotes {
        let date = quote.timestamp.with_timezone(&tz).date_naive();
        let day = days.entry(date).or_default();
        if quote.open.is_some() {
            day.open = quote.open;
        }
        if quote.close.is_some() {
            day.close = quote.close;
        }
    }
    days
}

/// Outer-join the instruments on date without filling gaps.
///
/// Columns are `{name}_Open`, `{name}_Close` in input order. Instruments with
/// an empty series contribute no columns.
pub fn join_daily(inputs: &[NamedSeries], tz: Tz) -> Result<PriceTable, TableError> {
    let collapsed: Vec<(&str, BTreeMap<NaiveDate, DailyBar>)> = inputs
        .iter()
        .filter(|input| !input.series.is_empty())
        .map(|input| (input.name.as_str(), collapse_daily(&input.series, tz)))
        .collect();

    // Union of all dates
    let mut all_dates = BTreeSet::new();
    for (_, days) in &collapsed {
        all_dates.extend(days.keys().copied());
    }
    let dates: Vec<NaiveDate> = all_dates.into_iter().collect();

    let mut table = PriceTable::new(dates)?;
    for (name, days) in &collapsed {
        for field in Field::ALL {
            let values = table
                .dates()
                .iter()
                .map(|date| days.get(date).and_then(|bar| bar.get(field)))
                .collect();
            table.insert_column(field.column(name), values)?;
        }
    }

    Ok(table)
}

/// Align instruments to a common daily calendar: join then forward-fill.
pub fn align_series(inputs: &[NamedSeries], tz: Tz) -> Result<PriceTable, TableError> {
    let mut table = join_daily(inputs, tz)?;
    let filled = table.forward_fill();
    tracing::info!(rows = table.len(), filled, "aligned instruments");
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::provider::RawQuote;
    use chrono::{TimeZone, Utc};

    fn quote(y: i32, m: u32, d: u32, h: u32, open: Option<f64>, close: Option<f64>) -> RawQuote {
        RawQuote::new(Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap(), open, close)
    }

    fn named(name: &str, quotes: Vec<RawQuote>) -> NamedSeries {
        NamedSeries {
            name: name.into(),
            series: Series::new(name, quotes),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn collapse_keeps_last_observation_per_field() {
        let series = Series::new(
            "JPY=X",
            vec![
                quote(2024, 1, 2, 20, None, Some(143.0)),
                quote(2024, 1, 2, 0, Some(141.0), Some(141.5)),
                quote(2024, 1, 2, 12, Some(142.0), None),
            ],
        );

        let days = collapse_daily(&series, Tz::UTC);
        assert_eq!(days.len(), 1);
        assert_eq!(
            days[&date(2024, 1, 2)],
            DailyBar {
                open: Some(142.0),
                close: Some(143.0)
            }
        );
    }

    #[test]
    fn timezone_decides_the_calendar_date() {
        // 15:00 UTC is midnight of the next day in Tokyo
        let series = Series::new("1672.T", vec![quote(2024, 1, 3, 15, Some(1.0), Some(1.0))]);

        let utc = collapse_daily(&series, Tz::UTC);
        assert!(utc.contains_key(&date(2024, 1, 3)));

        let tokyo = collapse_daily(&series, chrono_tz::Asia::Tokyo);
        assert!(tokyo.contains_key(&date(2024, 1, 4)));
    }

    #[test]
    fn outer_join_unions_dates_and_leaves_gaps() {
        let inputs = vec![
            named(
                "USDJPY",
                vec![
                    quote(2024, 1, 2, 0, Some(141.0), Some(142.0)),
                    quote(2024, 1, 3, 0, Some(142.0), Some(143.0)),
                ],
            ),
            named(
                "Gold_ETF",
                vec![
                    quote(2024, 1, 3, 0, Some(9000.0), Some(9010.0)),
                    quote(2024, 1, 4, 0, Some(9020.0), Some(9030.0)),
                ],
            ),
        ];

        let table = join_daily(&inputs, Tz::UTC).unwrap();
        assert_eq!(
            table.dates(),
            &[date(2024, 1, 2), date(2024, 1, 3), date(2024, 1, 4)]
        );
        let names: Vec<&str> = table.column_names().collect();
        assert_eq!(
            names,
            vec!["USDJPY_Open", "USDJPY_Close", "Gold_ETF_Open", "Gold_ETF_Close"]
        );
        assert_eq!(
            table.column("USDJPY_Close").unwrap(),
            &[Some(142.0), Some(143.0), None]
        );
        assert_eq!(
            table.column("Gold_ETF_Close").unwrap(),
            &[None, Some(9010.0), Some(9030.0)]
        );
    }

    #[test]
    fn align_forward_fills_calendar_gaps() {
        let inputs = vec![
            named(
                "USDJPY",
                vec![
                    quote(2024, 1, 2, 0, Some(141.0), Some(142.0)),
                    quote(2024, 1, 3, 0, Some(142.0), Some(143.0)),
                ],
            ),
            named(
                "Gold_ETF",
                vec![
                    quote(2024, 1, 3, 0, Some(9000.0), Some(9010.0)),
                    quote(2024, 1, 4, 0, Some(9020.0), Some(9030.0)),
                ],
            ),
        ];

        let table = align_series(&inputs, Tz::UTC).unwrap();
        assert_eq!(
            table.column("USDJPY_Close").unwrap(),
            &[Some(142.0), Some(143.0), Some(143.0)]
        );
        // Leading gap stays empty
        assert_eq!(
            table.column("Gold_ETF_Open").unwrap(),
            &[None, Some(9000.0), Some(9020.0)]
        );
    }

    #[test]
    fn empty_series_contributes_no_columns() {
        let inputs = vec![
            named("USDJPY", vec![quote(2024, 1, 2, 0, Some(141.0), Some(142.0))]),
            named("Palladium_F", vec![]),
        ];

        let table = align_series(&inputs, Tz::UTC).unwrap();
        assert_eq!(table.len(), 1);
        assert!(!table.has_column("Palladium_F_Close"));
        assert!(table.has_column("USDJPY_Close"));
    }

    #[test]
    fn no_inputs_is_empty_table() {
        let table = align_series(&[], Tz::UTC).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.column_names().count(), 0);
    }
}
