use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::error::FrontierError;
use crate::returns::ReturnTable;
use crate::types::{with_metadata, ComputationOutput, CovarianceMatrix, Percent, Rate, WeightVector};
use crate::FrontierResult;

use super::constraints::{calculate_sharpe, frontier_problem};
use super::linalg::sqrt_decimal;
use super::solver::{ActiveSetSolver, ConstrainedMinimizer, SolverResult, SolverSettings};
use super::statistics::{asset_statistics, covariance_matrix, AssetStatistics};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Frontier construction parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrontierConfig {
    /// Return periods per year used for annualization (12 for monthly).
    pub periods_per_year: u32,
    /// Number of target returns between 0 and the largest asset mean.
    pub return_grid_size: usize,
    /// Minimum weight per asset.
    pub lower_bound: Decimal,
    /// Maximum weight per asset.
    pub upper_bound: Decimal,
    pub solver: SolverSettings,
}

impl Default for FrontierConfig {
    fn default() -> Self {
        FrontierConfig {
            periods_per_year: 12,
            return_grid_size: 40,
            lower_bound: Decimal::ZERO,
            upper_bound: dec!(0.3),
            solver: SolverSettings::default(),
        }
    }
}

impl FrontierConfig {
    pub fn validate(&self) -> FrontierResult<()> {
        if self.periods_per_year < 1 {
            return Err(FrontierError::InvalidInput {
                field: "periods_per_year".into(),
                reason: "Must be at least 1".into(),
            });
        }
        if self.return_grid_size < 1 {
            return Err(FrontierError::InvalidInput {
                field: "return_grid_size".into(),
                reason: "Must be at least 1".into(),
            });
        }
        if self.lower_bound < Decimal::ZERO {
            return Err(FrontierError::InvalidInput {
                field: "lower_bound".into(),
                reason: "Short positions are not supported; must be >= 0".into(),
            });
        }
        if self.upper_bound > Decimal::ONE {
            return Err(FrontierError::InvalidInput {
                field: "upper_bound".into(),
                reason: "Must be <= 1".into(),
            });
        }
        if self.lower_bound > self.upper_bound {
            return Err(FrontierError::InvalidInput {
                field: "lower_bound".into(),
                reason: format!(
                    "Lower bound {} exceeds upper bound {}",
                    self.lower_bound, self.upper_bound
                ),
            });
        }
        Ok(())
    }

    /// Whether `n` weights inside the bounds can sum to one at all.
    pub fn budget_reachable(&self, n: usize) -> bool {
        let n = Decimal::from(n as i64);
        n * self.lower_bound <= Decimal::ONE && n * self.upper_bound >= Decimal::ONE
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// One efficient portfolio: target return, annualized std and Sharpe ratio.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrontierPoint {
    pub target_return: Percent,
    /// Annualized standard deviation in percent.
    pub variance: Percent,
    pub sharpe_ratio: Decimal,
}

/// Result of a frontier sweep.
///
/// `return_array`, `variance_array`, `sharpe_array` and `weights_array` are
/// parallel: entry `k` of each describes the same successful target, in grid
/// order. Despite its name `variance_array` holds annualized standard
/// deviations in percent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationReport {
    pub statistics: AssetStatistics,
    pub covariance: CovarianceMatrix,
    pub return_array: Vec<Percent>,
    pub variance_array: Vec<Percent>,
    pub sharpe_array: Vec<Decimal>,
    pub weights_array: Vec<WeightVector>,
    /// Every target return attempted, including the failed ones.
    pub grid: Vec<Percent>,
    /// Raw solver result of the last grid target.
    pub last_result: Option<SolverResult>,
    /// Risk-free rate the Sharpe ratios were computed against.
    #[serde(default)]
    pub risk_free_rate: Rate,
}

impl OptimizationReport {
    pub fn len(&self) -> usize {
        self.return_array.len()
    }

    pub fn is_empty(&self) -> bool {
        self.return_array.is_empty()
    }

    pub fn points(&self) -> Vec<FrontierPoint> {
        self.return_array
            .iter()
            .zip(self.variance_array.iter())
            .zip(self.sharpe_array.iter())
            .map(|((r, v), s)| FrontierPoint {
                target_return: *r,
                variance: *v,
                sharpe_ratio: *s,
            })
            .collect()
    }

    /// Number of grid targets the solver could not satisfy.
    pub fn failed_targets(&self) -> usize {
        self.grid.len().saturating_sub(self.return_array.len())
    }
}

/// Solver outcome for one grid position.
#[derive(Debug, Clone)]
pub struct GridOutcome {
    pub index: usize,
    pub target: Percent,
    pub result: SolverResult,
}

impl GridOutcome {
    /// The frontier point, if the solve succeeded.
    pub fn point(&self, sqrt_periods: Decimal, risk_free_rate: Rate) -> Option<FrontierPoint> {
        if !self.result.success {
            return None;
        }
        let std = sqrt_decimal(self.result.fun) * sqrt_periods * dec!(100);
        Some(FrontierPoint {
            target_return: self.target,
            variance: std,
            sharpe_ratio: calculate_sharpe(self.target, std, risk_free_rate),
        })
    }
}

// ---------------------------------------------------------------------------
// Sweep
// ---------------------------------------------------------------------------

/// `size` evenly spaced targets from 0 to `max_mean`, both ends included.
pub fn return_grid(max_mean: Decimal, size: usize) -> Vec<Decimal> {
    match size {
        0 => Vec::new(),
        1 => vec![Decimal::ZERO],
        _ => {
            let step = max_mean / Decimal::from((size - 1) as i64);
            let mut grid: Vec<Decimal> = (0..size - 1)
                .map(|i| step * Decimal::from(i as i64))
                .collect();
            grid.push(max_mean);
            grid
        }
    }
}

/// Build the efficient frontier with the default active-set solver.
pub fn build_efficient_frontier(
    returns: &ReturnTable,
    risk_free_rate: Rate,
    config: &FrontierConfig,
) -> FrontierResult<OptimizationReport> {
    let solver = ActiveSetSolver::new(config.solver.clone());
    build_efficient_frontier_with(&solver, returns, risk_free_rate, config)
}

/// Build the efficient frontier with a caller-supplied minimizer.
///
/// Every grid target is solved from the same uniform seed. Targets the
/// solver cannot satisfy are dropped; they never fail the whole run.
pub fn build_efficient_frontier_with<S: ConstrainedMinimizer + ?Sized>(
    solver: &S,
    returns: &ReturnTable,
    risk_free_rate: Rate,
    config: &FrontierConfig,
) -> FrontierResult<OptimizationReport> {
    config.validate()?;
    returns.validate()?;

    let statistics = asset_statistics(returns, config.periods_per_year)?;
    let covariance = covariance_matrix(returns)?;
    let grid = return_grid(statistics.max_mean(), config.return_grid_size);

    let n = returns.num_assets();
    let initial = vec![Decimal::ONE / Decimal::from(n as i64); n];
    let outcomes = sweep(solver, &covariance, &statistics.means, &grid, &initial, config);

    let sqrt_periods = sqrt_decimal(Decimal::from(config.periods_per_year));
    let mut report = OptimizationReport {
        statistics,
        covariance,
        return_array: Vec::new(),
        variance_array: Vec::new(),
        sharpe_array: Vec::new(),
        weights_array: Vec::new(),
        grid,
        last_result: outcomes.last().map(|o| o.result.clone()),
        risk_free_rate,
    };

    for outcome in outcomes {
        match outcome.point(sqrt_periods, risk_free_rate) {
            Some(point) => {
                tracing::debug!(
                    index = outcome.index,
                    target = %outcome.target,
                    std = %point.variance,
                    iterations = outcome.result.iterations,
                    "frontier target solved"
                );
                report.return_array.push(point.target_return);
                report.variance_array.push(point.variance);
                report.sharpe_array.push(point.sharpe_ratio);
                report.weights_array.push(outcome.result.x);
            }
            None => {
                tracing::warn!(
                    index = outcome.index,
                    target = %outcome.target,
                    status = ?outcome.result.status,
                    "frontier target dropped: {}",
                    outcome.result.message
                );
            }
        }
    }

    if report.is_empty() {
        tracing::warn!(targets = report.grid.len(), "every frontier target failed");
    }
    tracing::info!(
        assets = n,
        targets = report.grid.len(),
        solved = report.len(),
        "efficient frontier built"
    );

    Ok(report)
}

fn solve_target<S: ConstrainedMinimizer + ?Sized>(
    solver: &S,
    covariance: &CovarianceMatrix,
    means: &[Percent],
    index: usize,
    target: Percent,
    initial: &[Decimal],
    config: &FrontierConfig,
) -> GridOutcome {
    let problem = frontier_problem(
        covariance,
        means,
        target,
        (config.lower_bound, config.upper_bound),
    );
    GridOutcome {
        index,
        target,
        result: solver.minimize(&problem, initial),
    }
}

#[cfg(not(feature = "parallel"))]
fn sweep<S: ConstrainedMinimizer + ?Sized>(
    solver: &S,
    covariance: &CovarianceMatrix,
    means: &[Percent],
    grid: &[Percent],
    initial: &[Decimal],
    config: &FrontierConfig,
) -> Vec<GridOutcome> {
    grid.iter()
        .enumerate()
        .map(|(i, r)| solve_target(solver, covariance, means, i, *r, initial, config))
        .collect()
}

#[cfg(feature = "parallel")]
fn sweep<S: ConstrainedMinimizer + ?Sized>(
    solver: &S,
    covariance: &CovarianceMatrix,
    means: &[Percent],
    grid: &[Percent],
    initial: &[Decimal],
    config: &FrontierConfig,
) -> Vec<GridOutcome> {
    // Indexed collect keeps grid order.
    grid.par_iter()
        .enumerate()
        .map(|(i, r)| solve_target(solver, covariance, means, i, *r, initial, config))
        .collect()
}

// ---------------------------------------------------------------------------
// Enveloped entry point
// ---------------------------------------------------------------------------

/// Input for [`optimize_frontier`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrontierInput {
    pub returns: ReturnTable,
    /// Decimal rate, subtracted from percent returns as given.
    pub risk_free_rate: Rate,
    #[serde(default)]
    pub config: FrontierConfig,
}

/// Build the frontier and wrap it in the standard output envelope.
pub fn optimize_frontier(
    input: &FrontierInput,
) -> FrontierResult<ComputationOutput<OptimizationReport>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let n = input.returns.num_assets();
    if n > 0 && !input.config.budget_reachable(n) {
        warnings.push(format!(
            "Weights of {} assets within [{}, {}] cannot sum to 1; every target will fail",
            n, input.config.lower_bound, input.config.upper_bound
        ));
    }

    let report = build_efficient_frontier(&input.returns, input.risk_free_rate, &input.config)?;

    let failed = report.failed_targets();
    if report.is_empty() {
        warnings.push(format!(
            "No target return could be solved ({} attempted); the frontier is empty",
            report.grid.len()
        ));
    } else if failed > 0 {
        warnings.push(format!(
            "{} of {} target returns were infeasible and dropped",
            failed,
            report.grid.len()
        ));
    }
    if let Some(last) = report.last_result.as_ref().filter(|r| !r.success) {
        warnings.push(format!(
            "Last grid target failed: {} ({:?})",
            last.message, last.status
        ));
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Markowitz mean-variance frontier: minimum-variance long-only portfolio per target return",
        &serde_json::json!({
            "risk_free_rate": input.risk_free_rate.to_string(),
            "periods_per_year": input.config.periods_per_year,
            "return_grid_size": input.config.return_grid_size,
            "weight_bounds": [
                input.config.lower_bound.to_string(),
                input.config.upper_bound.to_string()
            ],
            "covariance": "sample (n-1), periodic scale",
            "seed": "uniform 1/n for every target",
        }),
        warnings,
        elapsed,
        report,
    ))
}
