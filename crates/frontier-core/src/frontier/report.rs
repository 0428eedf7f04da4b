//! Read-only reporting view over an [`OptimizationReport`].
//!
//! Everything a plot of the frontier needs: the (std, return) curve, the
//! highest-Sharpe portfolio and the individual assets' (std, mean) points.
//! Nothing here runs the optimizer or mutates the report.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::Percent;

use super::optimizer::{FrontierPoint, OptimizationReport};

/// One asset plotted on the risk/return plane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetPoint {
    pub ticker: String,
    /// Annualized standard deviation, percent.
    pub std: Percent,
    /// Annualized mean return, percent.
    pub mean: Percent,
}

/// Weight held in a single ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerWeight {
    pub ticker: String,
    pub weight: Decimal,
}

/// Serializable bundle of the reporting view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrontierSummary {
    /// `(std, return)` pairs in grid order.
    pub frontier_curve: Vec<(Percent, Percent)>,
    pub max_sharpe_index: Option<usize>,
    pub max_sharpe_point: Option<FrontierPoint>,
    /// Allocation behind the max-Sharpe point.
    pub max_sharpe_weights: Vec<TickerWeight>,
    pub asset_points: Vec<AssetPoint>,
    pub targets_attempted: usize,
    pub targets_solved: usize,
}

impl OptimizationReport {
    /// The efficient frontier as `(std, return)` pairs.
    pub fn frontier_curve(&self) -> Vec<(Percent, Percent)> {
        self.variance_array
            .iter()
            .copied()
            .zip(self.return_array.iter().copied())
            .collect()
    }

    /// Position of the highest Sharpe ratio; the first one wins ties.
    /// `None` when no target was solved.
    ///
    /// A riskless point (zero std) whose return beats the risk-free rate has
    /// an unbounded ratio, so the first such point outranks every finite one
    /// even though its stored `sharpe_ratio` is 0.
    pub fn max_sharpe_index(&self) -> Option<usize> {
        let riskless = self
            .variance_array
            .iter()
            .zip(self.return_array.iter())
            .take(self.sharpe_array.len())
            .position(|(std, ret)| std.is_zero() && *ret > self.risk_free_rate);
        if riskless.is_some() {
            return riskless;
        }

        let mut best: Option<(usize, Decimal)> = None;
        for (i, s) in self.sharpe_array.iter().enumerate() {
            if best.map_or(true, |(_, b)| *s > b) {
                best = Some((i, *s));
            }
        }
        best.map(|(i, _)| i)
    }

    /// `None` when nothing was solved or the arrays disagree in length.
    pub fn max_sharpe_point(&self) -> Option<FrontierPoint> {
        let i = self.max_sharpe_index()?;
        Some(FrontierPoint {
            target_return: *self.return_array.get(i)?,
            variance: *self.variance_array.get(i)?,
            sharpe_ratio: *self.sharpe_array.get(i)?,
        })
    }

    pub fn max_sharpe_weights(&self) -> Vec<TickerWeight> {
        let Some(weights) = self
            .max_sharpe_index()
            .and_then(|i| self.weights_array.get(i))
        else {
            return Vec::new();
        };
        self.statistics
            .tickers
            .iter()
            .zip(weights.iter())
            .map(|(t, w)| TickerWeight {
                ticker: t.clone(),
                weight: *w,
            })
            .collect()
    }

    pub fn asset_points(&self) -> Vec<AssetPoint> {
        let stats = &self.statistics;
        stats
            .tickers
            .iter()
            .zip(stats.stds.iter())
            .zip(stats.means.iter())
            .map(|((ticker, std), mean)| AssetPoint {
                ticker: ticker.clone(),
                std: *std,
                mean: *mean,
            })
            .collect()
    }

    pub fn summary(&self) -> FrontierSummary {
        FrontierSummary {
            frontier_curve: self.frontier_curve(),
            max_sharpe_index: self.max_sharpe_index(),
            max_sharpe_point: self.max_sharpe_point(),
            max_sharpe_weights: self.max_sharpe_weights(),
            asset_points: self.asset_points(),
            targets_attempted: self.grid.len(),
            targets_solved: self.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontier::statistics::AssetStatistics;
    use rust_decimal_macros::dec;

    fn report(sharpes: Vec<Decimal>) -> OptimizationReport {
        let n = sharpes.len();
        OptimizationReport {
            statistics: AssetStatistics {
                tickers: vec!["A".into(), "B".into()],
                means: vec![dec!(21), dec!(6)],
                stds: vec![dec!(3.3), dec!(4.5)],
            },
            covariance: vec![vec![dec!(1), dec!(0)], vec![dec!(0), dec!(1)]],
            return_array: (0..n).map(|i| Decimal::from(i as i64 + 10)).collect(),
            variance_array: (0..n).map(|i| Decimal::from(i as i64 + 1)).collect(),
            sharpe_array: sharpes,
            weights_array: (0..n)
                .map(|i| vec![Decimal::from(i as i64) / dec!(10), dec!(1)])
                .collect(),
            grid: (0..n + 2).map(|i| Decimal::from(i as i64)).collect(),
            last_result: None,
            risk_free_rate: dec!(0.01),
        }
    }

    #[test]
    fn test_max_sharpe_first_on_ties() {
        let r = report(vec![dec!(1), dec!(3), dec!(3), dec!(2)]);
        assert_eq!(r.max_sharpe_index(), Some(1));
        let p = r.max_sharpe_point().unwrap();
        assert_eq!(p.target_return, dec!(11));
        assert_eq!(p.variance, dec!(2));
        assert_eq!(p.sharpe_ratio, dec!(3));
    }

    #[test]
    fn test_empty_frontier() {
        let r = report(vec![]);
        assert_eq!(r.max_sharpe_index(), None);
        assert!(r.max_sharpe_point().is_none());
        assert!(r.max_sharpe_weights().is_empty());
        assert!(r.frontier_curve().is_empty());
        let s = r.summary();
        assert_eq!(s.targets_attempted, 2);
        assert_eq!(s.targets_solved, 0);
    }

    #[test]
    fn test_frontier_curve_pairs_std_with_return() {
        let r = report(vec![dec!(1), dec!(2)]);
        assert_eq!(
            r.frontier_curve(),
            vec![(dec!(1), dec!(10)), (dec!(2), dec!(11))]
        );
    }

    #[test]
    fn test_asset_points() {
        let r = report(vec![dec!(1)]);
        let pts = r.asset_points();
        assert_eq!(pts.len(), 2);
        assert_eq!(pts[1].ticker, "B");
        assert_eq!(pts[1].std, dec!(4.5));
        assert_eq!(pts[1].mean, dec!(6));
    }

    #[test]
    fn test_max_sharpe_weights() {
        let r = report(vec![dec!(1), dec!(5)]);
        let w = r.max_sharpe_weights();
        assert_eq!(w[0].ticker, "A");
        assert_eq!(w[0].weight, dec!(0.1));
    }

    #[test]
    fn test_negative_sharpes() {
        let r = report(vec![dec!(-3), dec!(-1), dec!(-2)]);
        assert_eq!(r.max_sharpe_index(), Some(1));
    }

    #[test]
    fn test_riskless_excess_return_outranks_finite_sharpe() {
        let mut r = report(vec![dec!(4), dec!(0), dec!(2)]);
        r.variance_array[1] = Decimal::ZERO;
        assert_eq!(r.max_sharpe_index(), Some(1));
        let p = r.max_sharpe_point().unwrap();
        assert_eq!(p.target_return, dec!(11));
        assert_eq!(p.variance, Decimal::ZERO);
    }

    #[test]
    fn test_riskless_point_below_risk_free_rate_is_not_preferred() {
        let mut r = report(vec![dec!(4), dec!(0)]);
        r.variance_array[1] = Decimal::ZERO;
        r.return_array[1] = dec!(0.005);
        assert_eq!(r.max_sharpe_index(), Some(0));
    }

    #[test]
    fn test_inconsistent_arrays_do_not_panic() {
        // Shape a hand-edited or deserialized report could have.
        let mut r = report(vec![dec!(1), dec!(5)]);
        r.return_array.truncate(1);
        r.grid.clear();
        assert_eq!(r.max_sharpe_index(), Some(1));
        assert!(r.max_sharpe_point().is_none());
        assert_eq!(r.failed_targets(), 0);
    }
}
