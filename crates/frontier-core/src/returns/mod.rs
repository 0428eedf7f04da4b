//! Returns preprocessing: raw price table to periodic simple returns.
//!
//! Pipeline: infer column types, parse the date column into the row key,
//! resample to calendar periods keeping the first observation of each,
//! convert to simple returns, drop every undefined row.

pub mod prices;
pub mod resample;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::FrontierError;
use crate::types::{with_metadata, ComputationOutput};
use crate::FrontierResult;

pub use prices::{PriceTable, RawPriceTable, DEFAULT_DATE_COLUMN};
pub use resample::ResampleFrequency;

/// Periodic simple returns, one column per ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnTable {
    pub tickers: Vec<String>,
    /// Period start of each row. Empty when the table was built from bare
    /// return columns.
    #[serde(default)]
    pub dates: Vec<NaiveDate>,
    /// Row-major returns as decimals (0.01 = 1%).
    pub rows: Vec<Vec<Decimal>>,
}

impl ReturnTable {
    /// Build a table, checking that every row has one value per ticker.
    pub fn new(
        tickers: Vec<String>,
        dates: Vec<NaiveDate>,
        rows: Vec<Vec<Decimal>>,
    ) -> FrontierResult<Self> {
        let table = ReturnTable {
            tickers,
            dates,
            rows,
        };
        table.validate()?;
        Ok(table)
    }

    /// Build an unlabeled table from per-ticker return columns.
    pub fn from_columns(tickers: Vec<String>, columns: Vec<Vec<Decimal>>) -> FrontierResult<Self> {
        if tickers.len() != columns.len() {
            return Err(FrontierError::InvalidInput {
                field: "columns".into(),
                reason: format!(
                    "Expected {} columns but got {}",
                    tickers.len(),
                    columns.len()
                ),
            });
        }
        let n_rows = columns.first().map(|c| c.len()).unwrap_or(0);
        if let Some((i, _)) = columns.iter().enumerate().find(|(_, c)| c.len() != n_rows) {
            return Err(FrontierError::InvalidInput {
                field: format!("columns[{}]", i),
                reason: format!("Expected {} values, all columns must be aligned", n_rows),
            });
        }
        let rows = (0..n_rows)
            .map(|t| columns.iter().map(|c| c[t]).collect())
            .collect();
        Self::new(tickers, Vec::new(), rows)
    }

    /// Check the table shape.
    pub fn validate(&self) -> FrontierResult<()> {
        for (i, row) in self.rows.iter().enumerate() {
            if row.len() != self.tickers.len() {
                return Err(FrontierError::InvalidInput {
                    field: format!("rows[{}]", i),
                    reason: format!(
                        "Row has {} values, expected {}",
                        row.len(),
                        self.tickers.len()
                    ),
                });
            }
        }
        if !self.dates.is_empty() && self.dates.len() != self.rows.len() {
            return Err(FrontierError::InvalidInput {
                field: "dates".into(),
                reason: format!(
                    "{} dates for {} rows",
                    self.dates.len(),
                    self.rows.len()
                ),
            });
        }
        Ok(())
    }

    pub fn num_assets(&self) -> usize {
        self.tickers.len()
    }

    pub fn num_periods(&self) -> usize {
        self.rows.len()
    }

    /// Returns of a single ticker, in row order.
    pub fn column(&self, idx: usize) -> Vec<Decimal> {
        self.rows.iter().map(|row| row[idx]).collect()
    }

    pub fn columns(&self) -> Vec<Vec<Decimal>> {
        (0..self.num_assets()).map(|i| self.column(i)).collect()
    }
}

/// Input to returns preprocessing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnsInput {
    pub table: RawPriceTable,
    /// Name of the date column (default "Date").
    #[serde(default = "default_date_column")]
    pub date_column: String,
    #[serde(default)]
    pub frequency: ResampleFrequency,
}

fn default_date_column() -> String {
    DEFAULT_DATE_COLUMN.to_string()
}

/// Convert a raw price table into a periodic return table.
pub fn load_return_table(
    raw: &RawPriceTable,
    date_column: &str,
    frequency: ResampleFrequency,
) -> FrontierResult<ReturnTable> {
    let prices = PriceTable::from_raw(raw, date_column)?;
    let periods = resample::resample_first(&prices, frequency);
    let returns = resample::simple_returns(&periods);

    let mut dates = Vec::with_capacity(returns.len());
    let mut rows = Vec::with_capacity(returns.len());
    for (period, ret) in periods.iter().zip(returns) {
        if let Some(row) = ret {
            dates.push(period.period_start);
            rows.push(row);
        }
    }

    tracing::debug!(
        observations = prices.num_rows(),
        periods = periods.len(),
        rows = rows.len(),
        "resampled price table"
    );

    ReturnTable::new(prices.tickers, dates, rows)
}

/// Preprocess prices into returns, wrapped in the standard output envelope.
pub fn prepare_returns(input: &ReturnsInput) -> FrontierResult<ComputationOutput<ReturnTable>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let table = load_return_table(&input.table, &input.date_column, input.frequency)?;

    let dropped = input.table.rows.len().saturating_sub(table.num_periods());
    if table.num_periods() < 2 {
        warnings.push(format!(
            "Only {} return period(s) available; at least 2 are needed for covariance",
            table.num_periods()
        ));
    }
    if let (Some(first), Some(last)) = (table.dates.first(), table.dates.last()) {
        let expected = periods_between(*first, *last, input.frequency);
        if expected > table.num_periods() {
            warnings.push(format!(
                "{} period(s) between {} and {} had no usable observation",
                expected - table.num_periods(),
                first,
                last
            ));
        }
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "First-of-period resampling with simple returns",
        &serde_json::json!({
            "date_column": input.date_column,
            "frequency": input.frequency,
            "periods_per_year": input.frequency.periods_per_year(),
            "source_rows": input.table.rows.len(),
            "rows_collapsed_or_dropped": dropped,
        }),
        warnings,
        elapsed,
        table,
    ))
}

fn periods_between(first: NaiveDate, last: NaiveDate, frequency: ResampleFrequency) -> usize {
    let mut count = 0;
    let mut cur = first;
    while cur <= last {
        count += 1;
        cur = frequency.next_period_start(cur);
    }
    count
}
