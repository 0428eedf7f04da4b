//! Markowitz efficient frontier.
//!
//! For each target return on a linear grid from 0 to the largest annualized
//! asset mean, find the long-only portfolio of minimum variance whose
//! weights sum to one and whose annualized mean equals the target.

pub mod constraints;
mod linalg;
pub mod optimizer;
pub mod report;
pub mod solver;
pub mod statistics;

pub use constraints::{
    calculate_sharpe, frontier_problem, portfolio_variance, return_constraint, weight_constraint,
};
pub use optimizer::{
    build_efficient_frontier, build_efficient_frontier_with, optimize_frontier, return_grid,
    FrontierConfig, FrontierInput, FrontierPoint, GridOutcome, OptimizationReport,
};
pub use report::{AssetPoint, FrontierSummary, TickerWeight};
pub use solver::{
    ActiveSetSolver, ConstrainedMinimizer, LinearEquality, QuadraticProgram, SolverResult,
    SolverSettings, SolverStatus,
};
pub use statistics::{asset_statistics, covariance_matrix, AssetStatistics};
