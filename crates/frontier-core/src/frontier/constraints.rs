use rust_decimal::Decimal;

use crate::types::{CovarianceMatrix, Percent, Rate};

use super::linalg::{quadratic_form, vec_dot};
use super::solver::{LinearEquality, QuadraticProgram};

/// Periodic portfolio variance `w' Σ w`.
pub fn portfolio_variance(weights: &[Decimal], covariance: &CovarianceMatrix) -> Decimal {
    quadratic_form(covariance, weights)
}

/// Budget residual: zero when the weights sum to one.
pub fn weight_constraint(weights: &[Decimal]) -> Decimal {
    weights.iter().copied().sum::<Decimal>() - Decimal::ONE
}

/// Return residual: zero when the portfolio's annualized mean hits `target`.
pub fn return_constraint(weights: &[Decimal], means: &[Percent], target: Percent) -> Decimal {
    vec_dot(weights, means) - target
}

/// `(ret - rf) / std`, zero when `std` is zero.
///
/// A zero return here does not rank a riskless point; see
/// [`OptimizationReport::max_sharpe_index`](super::OptimizationReport::max_sharpe_index).
pub fn calculate_sharpe(ret: Percent, std: Percent, risk_free_rate: Rate) -> Decimal {
    if std.is_zero() {
        return Decimal::ZERO;
    }
    (ret - risk_free_rate) / std
}

/// Minimum-variance problem for one point of the frontier.
pub fn frontier_problem(
    covariance: &CovarianceMatrix,
    means: &[Percent],
    target: Percent,
    bounds: (Decimal, Decimal),
) -> QuadraticProgram {
    let n = means.len();
    QuadraticProgram {
        quadratic: covariance.clone(),
        equalities: vec![
            LinearEquality {
                coefficients: vec![Decimal::ONE; n],
                target: Decimal::ONE,
            },
            LinearEquality {
                coefficients: means.to_vec(),
                target,
            },
        ],
        bounds: vec![bounds; n],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_portfolio_variance() {
        let cov = vec![
            vec![dec!(0.04), dec!(0.01)],
            vec![dec!(0.01), dec!(0.09)],
        ];
        // 0.25*0.04 + 2*0.25*0.01 + 0.25*0.09
        assert_eq!(
            portfolio_variance(&[dec!(0.5), dec!(0.5)], &cov),
            dec!(0.0375)
        );
    }

    #[test]
    fn test_weight_constraint() {
        assert_eq!(weight_constraint(&[dec!(0.3), dec!(0.7)]), Decimal::ZERO);
        assert_eq!(weight_constraint(&[dec!(0.3), dec!(0.3)]), dec!(-0.4));
    }

    #[test]
    fn test_return_constraint() {
        let means = [dec!(21), dec!(6)];
        assert_eq!(
            return_constraint(&[dec!(0.3), dec!(0.7)], &means, dec!(10.5)),
            Decimal::ZERO
        );
        assert_eq!(
            return_constraint(&[dec!(1), dec!(0)], &means, dec!(20)),
            dec!(1)
        );
    }

    #[test]
    fn test_calculate_sharpe() {
        assert_eq!(calculate_sharpe(dec!(10.01), dec!(2), dec!(0.01)), dec!(5));
        assert_eq!(calculate_sharpe(dec!(10), Decimal::ZERO, dec!(0.01)), Decimal::ZERO);
    }

    #[test]
    fn test_frontier_problem_shape() {
        let cov = vec![vec![dec!(1), dec!(0)], vec![dec!(0), dec!(1)]];
        let qp = frontier_problem(&cov, &[dec!(21), dec!(6)], dec!(12), (dec!(0), dec!(0.3)));
        assert_eq!(qp.num_variables(), 2);
        assert_eq!(qp.equalities.len(), 2);
        assert_eq!(qp.equalities[1].target, dec!(12));
        assert_eq!(qp.bounds, vec![(dec!(0), dec!(0.3)); 2]);
    }
}
