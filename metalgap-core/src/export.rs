//! CSV export and console preview of the final table.
//!
//! The CSV is UTF-8 with a byte-order mark, has a `Date` row label, and prints
//! numbers with four decimals. Missing and NaN cells are empty strings.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::Commodity;
use crate::table::{Field, PriceTable};

/// UTF-8 byte-order mark written at the start of the file.
pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV encoding failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to flush CSV writer: {0}")]
    Flush(String),

    #[error("write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Presentation order of the output columns.
///
/// FX pair first, then one block per commodity: futures, (converted futures),
/// ETF, deviation, each as Open/Close.
pub fn output_columns(fx: &str, commodities: &[Commodity], include_converted: bool) -> Vec<String> {
    let mut series = vec![fx.to_string()];
    for commodity in commodities {
        series.push(commodity.futures());
        if include_converted {
            series.push(commodity.converted());
        }
        series.push(commodity.etf());
        series.push(commodity.deviation());
    }

    series
        .iter()
        .flat_map(|name| Field::ALL.map(|field| field.column(name)))
        .collect()
}

/// Format one cell the way it appears in the CSV.
pub fn format_cell(value: Option<f64>) -> String {
    match value {
        None => String::new(),
        Some(v) if v.is_nan() => String::new(),
        Some(v) if v == f64::INFINITY => "inf".into(),
        Some(v) if v == f64::NEG_INFINITY => "-inf".into(),
        Some(v) => format!("{v:.4}"),
    }
}

/// Render the table as CSV bytes, BOM included.
pub fn render_csv(table: &PriceTable) -> Result<Vec<u8>, ExportError> {
    let mut wtr = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(UTF8_BOM.to_vec());

    let mut header = vec!["Date"];
    header.extend(table.column_names());
    wtr.write_record(&header)?;

    for i in 0..table.len() {
        if let Some((date, cells)) = table.row(i) {
            let mut record = Vec::with_capacity(cells.len() + 1);
            record.push(date.format("%Y-%m-%d").to_string());
            record.extend(cells.into_iter().map(format_cell));
            wtr.write_record(&record)?;
        }
    }

    wtr.into_inner()
        .map_err(|e| ExportError::Flush(e.to_string()))
}

/// Write the table to `path` in a single call.
///
/// The CSV is fully rendered before the file is touched.
pub fn write_csv(table: &PriceTable, path: &Path) -> Result<(), ExportError> {
    let bytes = render_csv(table)?;
    std::fs::write(path, bytes).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(path = %path.display(), rows = table.len(), "wrote CSV");
    Ok(())
}

/// Fixed-width text rendering of the first and last `n` rows.
pub fn format_preview(table: &PriceTable, n: usize) -> String {
    let names: Vec<&str> = table.column_names().collect();
    let widths: Vec<usize> = names.iter().map(|name| name.len().max(10)).collect();

    let header = names
        .iter()
        .zip(&widths)
        .fold(format!("{:<10}", "Date"), |mut line, (name, w)| {
            line.push_str(&format!("  {name:>w$}", w = *w));
            line
        });

    let render_rows = |range: std::ops::Range<usize>| {
        let mut out = header.clone();
        for (date, cells) in range.filter_map(|i| table.row(i)) {
            out.push('\n');
            out.push_str(&date.format("%Y-%m-%d").to_string());
            for (cell, w) in cells.into_iter().zip(&widths) {
                let text = match format_cell(cell) {
                    s if s.is_empty() => "NaN".to_string(),
                    s => s,
                };
                out.push_str(&format!("  {text:>w$}", w = *w));
            }
        }
        out
    };

    let len = table.len();
    let head = render_rows(0..n.min(len));
    let tail = render_rows(len.saturating_sub(n)..len);
    format!("{head}\n\n{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample() -> PriceTable {
        let dates = vec![
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
        ];
        let mut t = PriceTable::new(dates).unwrap();
        t.insert_column("USDJPY_Close", vec![Some(141.23456), None])
            .unwrap();
        t.insert_column("Gold_dev_Close", vec![Some(f64::INFINITY), Some(f64::NAN)])
            .unwrap();
        t
    }

    #[test]
    fn default_column_order() {
        let commodities = vec![Commodity::new("Gold", 0.1), Commodity::new("Silver", 1.0)];
        let cols = output_columns("USDJPY", &commodities, false);
        assert_eq!(
            cols,
            vec![
                "USDJPY_Open",
                "USDJPY_Close",
                "Gold_F_Open",
                "Gold_F_Close",
                "Gold_ETF_Open",
                "Gold_ETF_Close",
                "Gold_dev_Open",
                "Gold_dev_Close",
                "Silver_F_Open",
                "Silver_F_Close",
                "Silver_ETF_Open",
                "Silver_ETF_Close",
                "Silver_dev_Open",
                "Silver_dev_Close",
            ]
        );
    }

    #[test]
    fn converted_columns_follow_futures() {
        let cols = output_columns("USDJPY", &[Commodity::new("Gold", 0.1)], true);
        assert_eq!(&cols[2..6], &["Gold_F_Open", "Gold_F_Close", "Gold_F_JPY_Open", "Gold_F_JPY_Close"]);
        assert_eq!(cols.len(), 10);
    }

    #[test]
    fn cell_formatting() {
        assert_eq!(format_cell(Some(18000.0)), "18000.0000");
        assert_eq!(format_cell(Some(2.777_777_8)), "2.7778");
        assert_eq!(format_cell(None), "");
        assert_eq!(format_cell(Some(f64::NAN)), "");
        assert_eq!(format_cell(Some(f64::INFINITY)), "inf");
        assert_eq!(format_cell(Some(f64::NEG_INFINITY)), "-inf");
    }

    #[test]
    fn csv_has_bom_header_and_rows() {
        let bytes = render_csv(&sample()).unwrap();
        assert!(bytes.starts_with(UTF8_BOM));

        let text = std::str::from_utf8(&bytes[UTF8_BOM.len()..]).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Date,USDJPY_Close,Gold_dev_Close",
                "2024-01-02,141.2346,inf",
                "2024-01-03,,",
            ]
        );
    }

    #[test]
    fn write_csv_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        write_csv(&sample(), &path).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(UTF8_BOM));
    }

    #[test]
    fn write_to_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.csv");
        let err = write_csv(&sample(), &path).unwrap_err();
        assert!(matches!(err, ExportError::Io { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn preview_shows_head_and_tail() {
        let preview = format_preview(&sample(), 1);
        let blocks: Vec<&str> = preview.split("\n\n").collect();
        assert_eq!(blocks.len(), 2);
        assert!(blocks[0].starts_with("Date"));
        assert!(blocks[0].contains("2024-01-02"));
        assert!(!blocks[0].contains("2024-01-03"));
        assert!(blocks[1].contains("2024-01-03"));
        assert!(blocks[1].contains("NaN"));
    }
}
