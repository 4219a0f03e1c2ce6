//! Date-indexed wide table of price columns.
//!
//! One row per calendar date (strictly ascending, unique) and any number of
//! named `Option<f64>` columns, each exactly as long as the date axis.
//! `None` is a missing cell.

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum TableError {
    #[error("column '{name}' has {got} values, table has {expected} rows")]
    LengthMismatch {
        name: String,
        expected: usize,
        got: usize,
    },

    #[error("date axis is not strictly ascending at {0}")]
    UnsortedDates(NaiveDate),
}

/// Which observation of the day a column holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Open,
    Close,
}

impl Field {
    pub const ALL: [Field; 2] = [Field::Open, Field::Close];

    pub fn suffix(self) -> &'static str {
        match self {
            Field::Open => "Open",
            Field::Close => "Close",
        }
    }

    /// Column name for a series, e.g. `Gold_F` + `Close` = `Gold_F_Close`.
    pub fn column(self, series: &str) -> String {
        format!("{series}_{}", self.suffix())
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Column {
    name: String,
    values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceTable {
    dates: Vec<NaiveDate>,
    columns: Vec<Column>,
}

impl PriceTable {
    /// Create an empty-column table over a date axis.
    pub fn new(dates: Vec<NaiveDate>) -> Result<Self, TableError> {
        if let Some(w) = dates.windows(2).find(|w| w[0] >= w[1]) {
            return Err(TableError::UnsortedDates(w[1]));
        }
        Ok(Self {
            dates,
            columns: Vec::new(),
        })
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&[Option<f64>]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
    }

    /// Add a column, or replace the values of an existing one in place.
    pub fn insert_column(
        &mut self,
        name: impl Into<String>,
        values: Vec<Option<f64>>,
    ) -> Result<(), TableError> {
        let name = name.into();
        if values.len() != self.dates.len() {
            return Err(TableError::LengthMismatch {
                name,
                expected: self.dates.len(),
                got: values.len(),
            });
        }

        match self.columns.iter_mut().find(|c| c.name == name) {
            Some(existing) => existing.values = values,
            None => self.columns.push(Column { name, values }),
        }
        Ok(())
    }

    /// Forward-fill every column in place.
    ///
    /// A missing cell takes the nearest earlier value of the same column.
    /// Leading gaps stay missing. Returns the number of cells filled.
    pub fn forward_fill(&mut self) -> usize {
        let mut filled = 0;
        for column in &mut self.columns {
            let mut last = None;
            let mut column_filled = 0;
            for cell in &mut column.values {
                match *cell {
                    Some(v) => last = Some(v),
                    None if last.is_some() => {
                        *cell = last;
                        column_filled += 1;
                    }
                    None => {}
                }
            }
            if column_filled > 0 {
                tracing::debug!(column = %column.name, filled = column_filled, "forward-filled");
            }
            filled += column_filled;
        }
        filled
    }

    /// Project onto `names` in the given order, skipping names not present.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> PriceTable {
        let columns = names
            .iter()
            .filter_map(|name| self.columns.iter().find(|c| c.name == name.as_ref()))
            .cloned()
            .collect();
        PriceTable {
            dates: self.dates.clone(),
            columns,
        }
    }

    /// Row `i` as `(date, cells)` in column order.
    pub fn row(&self, i: usize) -> Option<(NaiveDate, Vec<Option<f64>>)> {
        let date = *self.dates.get(i)?;
        let cells = self.columns.iter().map(|c| c.values[i]).collect();
        Some((date, cells))
    }
}
