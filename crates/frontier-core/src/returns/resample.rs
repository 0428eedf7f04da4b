use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::FrontierError;

use super::prices::PriceTable;

/// Calendar period used to resample prices before computing returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResampleFrequency {
    #[default]
    Monthly,
    Quarterly,
    Annual,
}

impl ResampleFrequency {
    /// Number of periods in a year for annualisation
    pub fn periods_per_year(&self) -> u32 {
        match self {
            ResampleFrequency::Monthly => 12,
            ResampleFrequency::Quarterly => 4,
            ResampleFrequency::Annual => 1,
        }
    }

    /// First day of the period containing `date`.
    pub fn period_start(&self, date: NaiveDate) -> NaiveDate {
        let month = match self {
            ResampleFrequency::Monthly => date.month(),
            ResampleFrequency::Quarterly => (date.month0() / 3) * 3 + 1,
            ResampleFrequency::Annual => 1,
        };
        first_of_month(date.year(), month)
    }

    /// First day of the period following the one starting at `start`.
    pub fn next_period_start(&self, start: NaiveDate) -> NaiveDate {
        let step = match self {
            ResampleFrequency::Monthly => 1,
            ResampleFrequency::Quarterly => 3,
            ResampleFrequency::Annual => 12,
        };
        let months = start.year() * 12 + start.month0() as i32 + step;
        first_of_month(months.div_euclid(12), months.rem_euclid(12) as u32 + 1)
    }
}

impl std::str::FromStr for ResampleFrequency {
    type Err = FrontierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "monthly" | "month" | "m" => Ok(ResampleFrequency::Monthly),
            "quarterly" | "quarter" | "q" => Ok(ResampleFrequency::Quarterly),
            "annual" | "annually" | "yearly" | "a" | "y" => Ok(ResampleFrequency::Annual),
            _ => Err(FrontierError::InvalidInput {
                field: "frequency".into(),
                reason: format!("Unknown frequency '{}'. Use: monthly, quarterly, annual", s),
            }),
        }
    }
}

/// One calendar period after resampling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResampledPeriod {
    pub period_start: NaiveDate,
    /// First observed prices in the period, `None` when nothing was observed.
    pub prices: Option<Vec<Decimal>>,
}

fn first_of_month(year: i32, month: u32) -> NaiveDate {
    // Day 1 exists for every month chrono can represent.
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(NaiveDate::MIN)
}

/// Resample to calendar periods, keeping the first observation of each.
///
/// "First" means first in table order: rows are not sorted beforehand.
/// Every period between the earliest and the latest date is emitted, empty
/// ones with `prices = None`.
pub fn resample_first(table: &PriceTable, frequency: ResampleFrequency) -> Vec<ResampledPeriod> {
    let (Some(min_date), Some(max_date)) = (table.dates.iter().min(), table.dates.iter().max())
    else {
        return Vec::new();
    };

    let mut first_in_period: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for (idx, date) in table.dates.iter().enumerate() {
        first_in_period
            .entry(frequency.period_start(*date))
            .or_insert(idx);
    }

    let last = frequency.period_start(*max_date);
    let mut periods = Vec::new();
    let mut start = frequency.period_start(*min_date);
    while start <= last {
        periods.push(ResampledPeriod {
            period_start: start,
            prices: first_in_period
                .get(&start)
                .map(|&idx| table.prices[idx].clone()),
        });
        start = frequency.next_period_start(start);
    }
    periods
}

/// Simple returns between consecutive periods.
///
/// Entry `t` is `(p[t] - p[t-1]) / p[t-1]`, or `None` for the first period,
/// whenever either side is missing, and when any prior price is zero.
pub fn simple_returns(periods: &[ResampledPeriod]) -> Vec<Option<Vec<Decimal>>> {
    let mut out = Vec::with_capacity(periods.len());
    for (t, period) in periods.iter().enumerate() {
        if t == 0 {
            out.push(None);
            continue;
        }
        let (Some(prev), Some(cur)) = (&periods[t - 1].prices, &period.prices) else {
            out.push(None);
            continue;
        };

        if prev.iter().any(|p| p.is_zero()) {
            tracing::warn!(
                period = %period.period_start,
                "zero prior price, return undefined"
            );
            out.push(None);
            continue;
        }
        let row = prev
            .iter()
            .zip(cur.iter())
            .map(|(p0, p1)| (*p1 - *p0) / *p0)
            .collect();
        out.push(Some(row));
    }
    out
}
