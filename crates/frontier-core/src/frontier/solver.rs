//! Constrained minimization capability.
//!
//! The frontier sweep only talks to [`ConstrainedMinimizer`]; the default
//! [`ActiveSetSolver`] is an exact primal active-set method for convex
//! quadratic programs with linear equalities and box bounds:
//!
//! ```text
//! minimize    x' Q x
//! subject to  a_k' x = b_k      for every equality k
//!             l_i <= x_i <= u_i for every variable i
//! ```

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::linalg::{mat_vec_multiply, max_abs, quadratic_form, solve_linear_system, vec_dot};

/// Minimum model decrease for releasing a bound to count as progress.
const DESCENT_TOLERANCE: Decimal = dec!(0.00000000000000000001);

// ---------------------------------------------------------------------------
// Problem and result types
// ---------------------------------------------------------------------------

/// A linear equality `coefficients' x = target`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearEquality {
    pub coefficients: Vec<Decimal>,
    pub target: Decimal,
}

impl LinearEquality {
    /// Signed violation `coefficients' x - target`.
    pub fn residual(&self, x: &[Decimal]) -> Decimal {
        vec_dot(&self.coefficients, x) - self.target
    }
}

/// Quadratic objective with linear equalities and box bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuadraticProgram {
    /// Objective matrix `Q` of `x' Q x`; symmetric positive semidefinite.
    pub quadratic: Vec<Vec<Decimal>>,
    pub equalities: Vec<LinearEquality>,
    /// `(lower, upper)` per variable.
    pub bounds: Vec<(Decimal, Decimal)>,
}

impl QuadraticProgram {
    pub fn num_variables(&self) -> usize {
        self.quadratic.len()
    }

    /// Objective value `x' Q x`.
    pub fn objective(&self, x: &[Decimal]) -> Decimal {
        quadratic_form(&self.quadratic, x)
    }

    /// Gradient `2 Q x`.
    pub fn gradient(&self, x: &[Decimal]) -> Vec<Decimal> {
        mat_vec_multiply(&self.quadratic, x)
            .into_iter()
            .map(|v| dec!(2) * v)
            .collect()
    }

    /// Largest absolute equality residual.
    pub fn max_equality_violation(&self, x: &[Decimal]) -> Decimal {
        self.equalities
            .iter()
            .map(|eq| eq.residual(x).abs())
            .max()
            .unwrap_or(Decimal::ZERO)
    }

    /// Largest distance outside the box.
    pub fn max_bound_violation(&self, x: &[Decimal]) -> Decimal {
        x.iter()
            .zip(self.bounds.iter())
            .map(|(xi, (lo, hi))| (*lo - *xi).max(*xi - *hi).max(Decimal::ZERO))
            .max()
            .unwrap_or(Decimal::ZERO)
    }

    fn dimension_error(&self, initial: &[Decimal]) -> Option<String> {
        let n = self.num_variables();
        if n == 0 {
            return Some("Problem has no variables".into());
        }
        if let Some(i) = self.quadratic.iter().position(|row| row.len() != n) {
            return Some(format!("Objective row {} does not have {} columns", i, n));
        }
        if let Some(k) = self
            .equalities
            .iter()
            .position(|eq| eq.coefficients.len() != n)
        {
            return Some(format!("Equality {} does not have {} coefficients", k, n));
        }
        if self.bounds.len() != n {
            return Some(format!("Expected {} bounds, got {}", n, self.bounds.len()));
        }
        if let Some(i) = self.bounds.iter().position(|(lo, hi)| lo > hi) {
            return Some(format!("Lower bound exceeds upper bound for variable {}", i));
        }
        if initial.len() != n {
            return Some(format!(
                "Initial point has {} entries, expected {}",
                initial.len(),
                n
            ));
        }
        None
    }
}

/// Why a minimization stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverStatus {
    Optimal,
    Infeasible,
    IterationLimit,
    Singular,
    InvalidProblem,
}

impl SolverStatus {
    pub fn message(&self) -> &'static str {
        match self {
            SolverStatus::Optimal => "Optimization terminated successfully",
            SolverStatus::Infeasible => "Equality constraints cannot be met within bounds",
            SolverStatus::IterationLimit => "Iteration limit reached",
            SolverStatus::Singular => "Singular subproblem: objective unbounded on working set",
            SolverStatus::InvalidProblem => "Problem dimensions are inconsistent",
        }
    }
}

/// Raw outcome of one minimization call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverResult {
    pub success: bool,
    pub status: SolverStatus,
    pub message: String,
    /// Final iterate (the minimizer when `success`).
    pub x: Vec<Decimal>,
    /// Objective value at `x`.
    pub fun: Decimal,
    pub iterations: u32,
}

impl SolverResult {
    pub fn new(status: SolverStatus, x: Vec<Decimal>, fun: Decimal, iterations: u32) -> Self {
        SolverResult {
            success: status == SolverStatus::Optimal,
            status,
            message: status.message().to_string(),
            x,
            fun,
            iterations,
        }
    }
}

/// Anything able to minimize a [`QuadraticProgram`] from a starting point.
pub trait ConstrainedMinimizer: Send + Sync {
    fn minimize(&self, problem: &QuadraticProgram, initial: &[Decimal]) -> SolverResult;
}

/// Tuning knobs of [`ActiveSetSolver`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverSettings {
    /// Cap on active-set iterations across both phases.
    pub max_iterations: u32,
    /// Accepted equality and bound violation of a solution.
    pub feasibility_tolerance: Decimal,
    /// Steps with every component below this are treated as zero.
    pub step_tolerance: Decimal,
}

impl Default for SolverSettings {
    fn default() -> Self {
        SolverSettings {
            max_iterations: 200,
            feasibility_tolerance: dec!(0.000000001),
            step_tolerance: dec!(0.000000000001),
        }
    }
}

// ---------------------------------------------------------------------------
// Active-set solver
// ---------------------------------------------------------------------------

/// Two-phase primal active-set method.
///
/// Phase 1 clips the seed into the box and minimizes `||Ax - b||^2` over the
/// box; a positive optimum means the equalities cannot be met. Phase 2 keeps
/// the equalities satisfied and minimizes `x' Q x`.
#[derive(Debug, Clone, Default)]
pub struct ActiveSetSolver {
    pub settings: SolverSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BoundState {
    Free,
    AtLower,
    AtUpper,
}

/// `min 1/2 x' H x + c' x` s.t. `E x = const`, box bounds.
struct Subproblem<'a> {
    hessian: Vec<Vec<Decimal>>,
    linear: Vec<Decimal>,
    equalities: &'a [LinearEquality],
    bounds: &'a [(Decimal, Decimal)],
}

impl Subproblem<'_> {
    fn gradient(&self, x: &[Decimal]) -> Vec<Decimal> {
        mat_vec_multiply(&self.hessian, x)
            .into_iter()
            .zip(self.linear.iter())
            .map(|(hx, c)| hx + *c)
            .collect()
    }

    /// Minimizer of the quadratic model over the free variables, keeping the
    /// equalities satisfied. `None` if the model is unbounded there.
    fn step(&self, g: &[Decimal], state: &[BoundState]) -> Option<Vec<Decimal>> {
        let n = g.len();
        let free: Vec<usize> = (0..n).filter(|&i| state[i] == BoundState::Free).collect();
        if free.is_empty() {
            return Some(vec![Decimal::ZERO; n]);
        }

        let k = free.len();
        let m = self.equalities.len();
        let mut kkt = vec![vec![Decimal::ZERO; k + m]; k + m];
        let mut rhs = vec![Decimal::ZERO; k + m];
        for (a, &i) in free.iter().enumerate() {
            for (b, &j) in free.iter().enumerate() {
                kkt[a][b] = self.hessian[i][j];
            }
            for (e, eq) in self.equalities.iter().enumerate() {
                kkt[a][k + e] = eq.coefficients[i];
                kkt[k + e][a] = eq.coefficients[i];
            }
            rhs[a] = -g[i];
        }

        let solution = solve_linear_system(&kkt, &rhs)?;
        let mut p = vec![Decimal::ZERO; n];
        for (a, &i) in free.iter().enumerate() {
            p[i] = solution[a];
        }
        Some(p)
    }

    fn model_change(&self, g: &[Decimal], p: &[Decimal]) -> Decimal {
        vec_dot(g, p) + quadratic_form(&self.hessian, p) / dec!(2)
    }
}

impl ActiveSetSolver {
    pub fn new(settings: SolverSettings) -> Self {
        ActiveSetSolver { settings }
    }

    fn run(
        &self,
        sub: &Subproblem<'_>,
        x: &mut [Decimal],
        state: &mut [BoundState],
        iterations: &mut u32,
    ) -> Result<(), SolverStatus> {
        let tol = self.settings.step_tolerance;
        loop {
            if *iterations >= self.settings.max_iterations {
                return Err(SolverStatus::IterationLimit);
            }
            *iterations += 1;

            let g = sub.gradient(x);
            let p = sub.step(&g, state).ok_or(SolverStatus::Singular)?;

            if max_abs(&p) > tol {
                // Ratio test against the bounds of the free variables.
                let mut alpha = Decimal::ONE;
                let mut blocking: Option<(usize, BoundState)> = None;
                for (i, pi) in p.iter().enumerate() {
                    if state[i] != BoundState::Free || pi.is_zero() {
                        continue;
                    }
                    let (lo, hi) = sub.bounds[i];
                    let (limit, side) = if *pi < Decimal::ZERO {
                        ((lo - x[i]) / *pi, BoundState::AtLower)
                    } else {
                        ((hi - x[i]) / *pi, BoundState::AtUpper)
                    };
                    if limit < alpha {
                        alpha = limit.max(Decimal::ZERO);
                        blocking = Some((i, side));
                    }
                }

                for (i, pi) in p.iter().enumerate() {
                    if state[i] == BoundState::Free {
                        let (lo, hi) = sub.bounds[i];
                        x[i] = (x[i] + alpha * *pi).max(lo).min(hi);
                    }
                }
                if let Some((i, side)) = blocking {
                    let (lo, hi) = sub.bounds[i];
                    x[i] = if side == BoundState::AtLower { lo } else { hi };
                    state[i] = side;
                }
                continue;
            }

            // Stationary on the working set: release the bound whose removal
            // gives the steepest feasible descent, if any.
            let mut best: Option<(usize, Decimal)> = None;
            for i in 0..x.len() {
                let (lo, hi) = sub.bounds[i];
                if state[i] == BoundState::Free || lo == hi {
                    continue;
                }
                let mut trial = state.to_vec();
                trial[i] = BoundState::Free;
                let Some(q) = sub.step(&g, &trial) else {
                    continue;
                };
                let moves_inward = match state[i] {
                    BoundState::AtLower => q[i] > tol,
                    BoundState::AtUpper => q[i] < -tol,
                    BoundState::Free => false,
                };
                if !moves_inward {
                    continue;
                }
                let change = sub.model_change(&g, &q);
                if change < -DESCENT_TOLERANCE && best.map_or(true, |(_, c)| change < c) {
                    best = Some((i, change));
                }
            }

            match best {
                Some((i, _)) => state[i] = BoundState::Free,
                None => return Ok(()),
            }
        }
    }
}

impl ConstrainedMinimizer for ActiveSetSolver {
    fn minimize(&self, problem: &QuadraticProgram, initial: &[Decimal]) -> SolverResult {
        if let Some(reason) = problem.dimension_error(initial) {
            tracing::debug!(%reason, "rejected quadratic program");
            let x = initial.to_vec();
            let fun = if x.len() == problem.num_variables() {
                problem.objective(&x)
            } else {
                Decimal::ZERO
            };
            return SolverResult::new(SolverStatus::InvalidProblem, x, fun, 0);
        }

        let n = problem.num_variables();
        let feas_tol = self.settings.feasibility_tolerance;
        let mut iterations = 0u32;

        let mut x: Vec<Decimal> = initial
            .iter()
            .zip(problem.bounds.iter())
            .map(|(xi, (lo, hi))| (*xi).max(*lo).min(*hi))
            .collect();
        let mut state: Vec<BoundState> = x
            .iter()
            .zip(problem.bounds.iter())
            .map(|(xi, (lo, hi))| {
                if xi <= lo {
                    BoundState::AtLower
                } else if xi >= hi {
                    BoundState::AtUpper
                } else {
                    BoundState::Free
                }
            })
            .collect();

        // Phase 1: least-squares distance to the equality constraints.
        if problem.max_equality_violation(&x) > feas_tol {
            let mut hessian = vec![vec![Decimal::ZERO; n]; n];
            let mut linear = vec![Decimal::ZERO; n];
            for eq in &problem.equalities {
                let a = &eq.coefficients;
                for i in 0..n {
                    linear[i] -= dec!(2) * a[i] * eq.target;
                    for j in 0..n {
                        hessian[i][j] += dec!(2) * a[i] * a[j];
                    }
                }
            }
            let phase_one = Subproblem {
                hessian,
                linear,
                equalities: &[],
                bounds: &problem.bounds,
            };
            if let Err(status) = self.run(&phase_one, &mut x, &mut state, &mut iterations) {
                let fun = problem.objective(&x);
                return SolverResult::new(status, x, fun, iterations);
            }
            if problem.max_equality_violation(&x) > feas_tol {
                let fun = problem.objective(&x);
                return SolverResult::new(SolverStatus::Infeasible, x, fun, iterations);
            }
        }

        // Phase 2: minimize x' Q x from the feasible point.
        let phase_two = Subproblem {
            hessian: problem
                .quadratic
                .iter()
                .map(|row| row.iter().map(|v| dec!(2) * *v).collect())
                .collect(),
            linear: vec![Decimal::ZERO; n],
            equalities: &problem.equalities,
            bounds: &problem.bounds,
        };
        let outcome = self.run(&phase_two, &mut x, &mut state, &mut iterations);
        let fun = problem.objective(&x);

        let status = match outcome {
            Err(status) => status,
            Ok(()) if problem.max_equality_violation(&x) > feas_tol
                || problem.max_bound_violation(&x) > feas_tol =>
            {
                SolverStatus::Infeasible
            }
            Ok(()) => SolverStatus::Optimal,
        };
        SolverResult::new(status, x, fun, iterations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Decimal, b: Decimal) -> bool {
        (a - b).abs() < dec!(0.000001)
    }

    fn budget(n: usize) -> LinearEquality {
        LinearEquality {
            coefficients: vec![Decimal::ONE; n],
            target: Decimal::ONE,
        }
    }

    fn diagonal(values: &[Decimal]) -> Vec<Vec<Decimal>> {
        let n = values.len();
        (0..n)
            .map(|i| {
                (0..n)
                    .map(|j| if i == j { values[i] } else { Decimal::ZERO })
                    .collect()
            })
            .collect()
    }

    #[test]
    fn test_min_variance_budget_only() {
        // Inverse-variance weights: 1/1 : 1/4 -> 0.8, 0.2
        let problem = QuadraticProgram {
            quadratic: diagonal(&[dec!(1), dec!(4)]),
            equalities: vec![budget(2)],
            bounds: vec![(dec!(0), dec!(1)); 2],
        };
        let res = ActiveSetSolver::default().minimize(&problem, &[dec!(0.5), dec!(0.5)]);
        assert!(res.success, "{:?}", res);
        assert!(close(res.x[0], dec!(0.8)));
        assert!(close(res.x[1], dec!(0.2)));
        assert!(close(res.fun, dec!(0.8)));
    }

    #[test]
    fn test_upper_bound_binds() {
        let problem = QuadraticProgram {
            quadratic: diagonal(&[dec!(1), dec!(4)]),
            equalities: vec![budget(2)],
            bounds: vec![(dec!(0), dec!(0.6)); 2],
        };
        let res = ActiveSetSolver::default().minimize(&problem, &[dec!(0.5), dec!(0.5)]);
        assert!(res.success);
        assert!(close(res.x[0], dec!(0.6)));
        assert!(close(res.x[1], dec!(0.4)));
    }

    #[test]
    fn test_release_bound_from_infeasible_seed() {
        // Seed starts at the upper bound of both variables (clipped).
        let problem = QuadraticProgram {
            quadratic: diagonal(&[dec!(1), dec!(1), dec!(1)]),
            equalities: vec![budget(3)],
            bounds: vec![(dec!(0), dec!(0.5)); 3],
        };
        let res = ActiveSetSolver::default().minimize(&problem, &[dec!(1), dec!(1), dec!(1)]);
        assert!(res.success, "{:?}", res);
        for w in &res.x {
            assert!(close(*w, dec!(1) / dec!(3)));
        }
    }

    #[test]
    fn test_return_target() {
        // Two uncorrelated assets, returns 10 and 2: target 6 forces 50/50.
        let problem = QuadraticProgram {
            quadratic: diagonal(&[dec!(1), dec!(1)]),
            equalities: vec![
                budget(2),
                LinearEquality {
                    coefficients: vec![dec!(10), dec!(2)],
                    target: dec!(6),
                },
            ],
            bounds: vec![(dec!(0), dec!(1)); 2],
        };
        let res = ActiveSetSolver::default().minimize(&problem, &[dec!(0.9), dec!(0.1)]);
        assert!(res.success);
        assert!(close(res.x[0], dec!(0.5)));
        assert!(close(res.fun, dec!(0.5)));
    }

    #[test]
    fn test_infeasible_target() {
        let problem = QuadraticProgram {
            quadratic: diagonal(&[dec!(1), dec!(1)]),
            equalities: vec![
                budget(2),
                LinearEquality {
                    coefficients: vec![dec!(10), dec!(2)],
                    target: dec!(12),
                },
            ],
            bounds: vec![(dec!(0), dec!(1)); 2],
        };
        let res = ActiveSetSolver::default().minimize(&problem, &[dec!(0.5), dec!(0.5)]);
        assert!(!res.success);
        assert_eq!(res.status, SolverStatus::Infeasible);
    }

    #[test]
    fn test_budget_unreachable_under_caps() {
        let problem = QuadraticProgram {
            quadratic: diagonal(&[dec!(1), dec!(1)]),
            equalities: vec![budget(2)],
            bounds: vec![(dec!(0), dec!(0.3)); 2],
        };
        let res = ActiveSetSolver::default().minimize(&problem, &[dec!(0.5), dec!(0.5)]);
        assert_eq!(res.status, SolverStatus::Infeasible);
    }

    #[test]
    fn test_single_variable_vertex() {
        let eqs = |target| {
            vec![
                budget(1),
                LinearEquality {
                    coefficients: vec![dec!(12)],
                    target,
                },
            ]
        };
        let feasible = QuadraticProgram {
            quadratic: vec![vec![dec!(0.01)]],
            equalities: eqs(dec!(12)),
            bounds: vec![(dec!(0), dec!(1))],
        };
        let res = ActiveSetSolver::default().minimize(&feasible, &[dec!(1)]);
        assert!(res.success);
        assert_eq!(res.x, vec![dec!(1)]);
        assert_eq!(res.fun, dec!(0.01));

        let infeasible = QuadraticProgram {
            equalities: eqs(dec!(6)),
            ..feasible
        };
        let res = ActiveSetSolver::default().minimize(&infeasible, &[dec!(1)]);
        assert!(!res.success);
    }

    #[test]
    fn test_iteration_limit() {
        let problem = QuadraticProgram {
            quadratic: diagonal(&[dec!(1), dec!(4)]),
            equalities: vec![budget(2)],
            bounds: vec![(dec!(0), dec!(1)); 2],
        };
        let solver = ActiveSetSolver::new(SolverSettings {
            max_iterations: 0,
            ..SolverSettings::default()
        });
        let res = solver.minimize(&problem, &[dec!(0.5), dec!(0.5)]);
        assert_eq!(res.status, SolverStatus::IterationLimit);
        assert!(!res.success);
    }

    #[test]
    fn test_invalid_dimensions() {
        let problem = QuadraticProgram {
            quadratic: diagonal(&[dec!(1), dec!(1)]),
            equalities: vec![budget(3)],
            bounds: vec![(dec!(0), dec!(1)); 2],
        };
        let res = ActiveSetSolver::default().minimize(&problem, &[dec!(0.5), dec!(0.5)]);
        assert_eq!(res.status, SolverStatus::InvalidProblem);
    }

    #[test]
    fn test_violation_helpers() {
        let problem = QuadraticProgram {
            quadratic: diagonal(&[dec!(1), dec!(1)]),
            equalities: vec![budget(2)],
            bounds: vec![(dec!(0), dec!(0.6)); 2],
        };
        let x = [dec!(0.7), dec!(-0.1)];
        assert_eq!(problem.max_equality_violation(&x), dec!(0.4));
        assert_eq!(problem.max_bound_violation(&x), dec!(0.1));
        assert_eq!(problem.gradient(&x), vec![dec!(1.4), dec!(-0.2)]);
    }
}
