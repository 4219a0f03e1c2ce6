//! Yen conversion of futures prices and ETF deviation percentages.
//!
//! For each commodity `C` and field `P` (Open, Close):
//!
//! ```text
//! C_F_JPY_P = C_F_P * FX_P * factor_C
//! C_dev_P   = (C_ETF_P - C_F_JPY_P) / C_F_JPY_P * 100
//! ```
//!
//! All computations are per row. A missing input cell gives a missing output
//! cell. A zero denominator is not guarded and yields inf or NaN.

use crate::config::Commodity;
use crate::table::{Field, PriceTable, TableError};

/// Futures quote converted to yen in ETF units.
pub fn converted_price(futures: f64, fx: f64, factor: f64) -> f64 {
    futures * fx * factor
}

/// Percentage by which the ETF trades above (+) or below (-) the converted futures.
pub fn deviation_pct(etf: f64, converted: f64) -> f64 {
    (etf - converted) / converted * 100.0
}

fn zip_cells(
    a: &[Option<f64>],
    b: &[Option<f64>],
    f: impl Fn(f64, f64) -> f64,
) -> Vec<Option<f64>> {
    a.iter()
        .zip(b)
        .map(|(x, y)| match (x, y) {
            (Some(x), Some(y)) => Some(f(*x, *y)),
            _ => None,
        })
        .collect()
}

/// Derive the converted and deviation columns for every commodity.
///
/// A commodity whose inputs are absent from the table is skipped for that
/// field; nothing is created for it and no error is raised. Returns the
/// names of the columns added.
pub fn derive_deviations(
    table: &mut PriceTable,
    fx: &str,
    commodities: &[Commodity],
) -> Result<Vec<String>, TableError> {
    let mut added = Vec::new();

    for commodity in commodities {
        for field in Field::ALL {
            let converted_name = field.column(&commodity.converted());
            let converted = match (
                table.column(&field.column(&commodity.futures())),
                table.column(&field.column(fx)),
            ) {
                (Some(futures), Some(rate)) => {
                    zip_cells(futures, rate, |f, r| converted_price(f, r, commodity.factor))
                }
                _ => {
                    tracing::warn!(
                        commodity = %commodity.name,
                        field = field.suffix(),
                        "futures or FX column absent; skipping conversion"
                    );
                    continue;
                }
            };

            let deviation = table
                .column(&field.column(&commodity.etf()))
                .map(|etf| zip_cells(etf, &converted, deviation_pct));

            table.insert_column(converted_name.clone(), converted)?;
            added.push(converted_name);

            match deviation {
                Some(values) => {
                    let name = field.column(&commodity.deviation());
                    table.insert_column(name.clone(), values)?;
                    added.push(name);
                }
                None => tracing::warn!(
                    commodity = %commodity.name,
                    field = field.suffix(),
                    "ETF column absent; skipping deviation"
                ),
            }
        }
    }

    Ok(added)
}
