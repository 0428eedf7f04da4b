use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::FrontierError;
use crate::FrontierResult;

/// Default name of the date column in a price table.
pub const DEFAULT_DATE_COLUMN: &str = "Date";

const DATE_FORMATS: [&str; 5] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y", "%Y%m%d"];

const DATETIME_FORMATS: [&str; 3] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A rectangular table of untyped cells, as read from a CSV file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPriceTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Concrete type inferred for a column from its values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    Date,
    Numeric,
    Text,
}

/// Daily (or any frequency) prices keyed by date.
///
/// Rows keep the order of the source table; nothing here sorts them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceTable {
    pub tickers: Vec<String>,
    pub dates: Vec<NaiveDate>,
    /// One row per date, one price per ticker.
    pub prices: Vec<Vec<Decimal>>,
}

impl RawPriceTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    fn column_values(&self, col: usize) -> impl Iterator<Item = &str> {
        self.rows
            .iter()
            .map(move |row| row.get(col).map(|s| s.as_str()).unwrap_or(""))
    }
}

impl PriceTable {
    /// Build a typed price table from raw cells.
    ///
    /// The date column becomes the row key; every other column is an asset
    /// and must hold a number in every row.
    pub fn from_raw(raw: &RawPriceTable, date_column: &str) -> FrontierResult<Self> {
        let date_idx = raw
            .headers
            .iter()
            .position(|h| h.trim() == date_column)
            .ok_or_else(|| {
                FrontierError::DataFormat(format!("Date column '{}' not found", date_column))
            })?;

        if raw.headers.len() < 2 {
            return Err(FrontierError::DataFormat(
                "At least one price column is required besides the date column".into(),
            ));
        }
        if raw.rows.is_empty() {
            return Err(FrontierError::DataFormat("Price table has no rows".into()));
        }

        for (i, row) in raw.rows.iter().enumerate() {
            if row.len() != raw.headers.len() {
                return Err(FrontierError::DataFormat(format!(
                    "Row {} has {} cells, expected {}",
                    i,
                    row.len(),
                    raw.headers.len()
                )));
            }
        }

        let column_types = infer_column_types(raw);
        let mut tickers = Vec::with_capacity(raw.headers.len() - 1);
        let mut price_cols = Vec::with_capacity(raw.headers.len() - 1);
        for (col, header) in raw.headers.iter().enumerate() {
            if col == date_idx {
                continue;
            }
            if column_types[col] != ColumnType::Numeric {
                let bad = raw
                    .column_values(col)
                    .find(|v| parse_decimal(v).is_none())
                    .unwrap_or("");
                return Err(FrontierError::DataFormat(format!(
                    "Column '{}' is not numeric (offending value '{}')",
                    header.trim(),
                    bad
                )));
            }
            tickers.push(header.trim().to_string());
            price_cols.push(col);
        }

        let mut dates = Vec::with_capacity(raw.rows.len());
        let mut prices = Vec::with_capacity(raw.rows.len());
        for row in &raw.rows {
            dates.push(parse_date(&row[date_idx])?);
            let values = price_cols
                .iter()
                .map(|&c| {
                    parse_decimal(&row[c]).ok_or_else(|| {
                        FrontierError::DataFormat(format!("Invalid price '{}'", row[c]))
                    })
                })
                .collect::<FrontierResult<Vec<Decimal>>>()?;
            prices.push(values);
        }

        Ok(PriceTable {
            tickers,
            dates,
            prices,
        })
    }

    pub fn num_rows(&self) -> usize {
        self.dates.len()
    }
}

// ---------------------------------------------------------------------------
// Parsing helpers
// ---------------------------------------------------------------------------

/// Infer the type of every column from its values.
///
/// A column is numeric when every cell parses as a number, a date column
/// when every cell parses as a date, text otherwise.
pub fn infer_column_types(raw: &RawPriceTable) -> Vec<ColumnType> {
    (0..raw.headers.len())
        .map(|col| {
            let mut values = raw.column_values(col).peekable();
            if values.peek().is_none() {
                return ColumnType::Text;
            }
            let values: Vec<&str> = values.collect();
            if values.iter().all(|v| parse_decimal(v).is_some()) {
                ColumnType::Numeric
            } else if values.iter().all(|v| parse_date(v).is_ok()) {
                ColumnType::Date
            } else {
                ColumnType::Text
            }
        })
        .collect()
}

/// Parse a calendar date from ISO-8601 or a common locale format.
pub fn parse_date(value: &str) -> FrontierResult<NaiveDate> {
    let s = value.trim();
    if s.is_empty() {
        return Err(FrontierError::DataFormat("Empty date value".into()));
    }

    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(d);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt.date());
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.date_naive());
    }

    Err(FrontierError::DataFormat(format!(
        "Unparseable date '{}'",
        value
    )))
}

/// Parse a decimal number, accepting scientific notation.
pub fn parse_decimal(value: &str) -> Option<Decimal> {
    let s = value.trim();
    if s.is_empty() {
        return None;
    }
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}
