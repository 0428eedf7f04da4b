use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;

/// Pivots smaller than this are treated as zero.
const PIVOT_TOLERANCE: Decimal = dec!(0.0000000000000001);

/// Residual above which a rank-deficient system is inconsistent.
const CONSISTENCY_TOLERANCE: Decimal = dec!(0.000000000001);

/// Dot product.
pub(crate) fn vec_dot(a: &[Decimal], b: &[Decimal]) -> Decimal {
    a.iter().zip(b.iter()).map(|(x, y)| *x * *y).sum()
}

/// Matrix-vector multiplication.
pub(crate) fn mat_vec_multiply(mat: &[Vec<Decimal>], v: &[Decimal]) -> Vec<Decimal> {
    mat.iter().map(|row| vec_dot(row, v)).collect()
}

/// Quadratic form x' * M * x.
pub(crate) fn quadratic_form(mat: &[Vec<Decimal>], x: &[Decimal]) -> Decimal {
    vec_dot(x, &mat_vec_multiply(mat, x))
}

/// Largest absolute entry, zero for an empty slice.
pub(crate) fn max_abs(v: &[Decimal]) -> Decimal {
    v.iter().map(|x| x.abs()).max().unwrap_or(Decimal::ZERO)
}

/// Square root, zero for non-positive input.
pub(crate) fn sqrt_decimal(val: Decimal) -> Decimal {
    if val <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    val.sqrt().unwrap_or(Decimal::ZERO)
}

/// Solve `mat * x = rhs` by Gauss-Jordan elimination with partial pivoting.
///
/// Rank-deficient systems are accepted when consistent: columns without a
/// pivot are free and set to zero. Returns `None` when the system has no
/// solution.
#[allow(clippy::needless_range_loop)]
pub(crate) fn solve_linear_system(mat: &[Vec<Decimal>], rhs: &[Decimal]) -> Option<Vec<Decimal>> {
    let rows = mat.len();
    let cols = mat.first().map(|r| r.len()).unwrap_or(0);
    if rhs.len() != rows {
        return None;
    }

    let mut aug: Vec<Vec<Decimal>> = mat
        .iter()
        .zip(rhs.iter())
        .map(|(row, b)| {
            let mut r = row.clone();
            r.push(*b);
            r
        })
        .collect();

    let mut pivots: Vec<(usize, usize)> = Vec::with_capacity(cols.min(rows));
    let mut pivot_row = 0;
    for col in 0..cols {
        if pivot_row == rows {
            break;
        }

        let mut max_row = pivot_row;
        let mut max_val = aug[pivot_row][col].abs();
        for row in (pivot_row + 1)..rows {
            let val = aug[row][col].abs();
            if val > max_val {
                max_val = val;
                max_row = row;
            }
        }
        if max_val < PIVOT_TOLERANCE {
            continue;
        }
        if max_row != pivot_row {
            aug.swap(pivot_row, max_row);
        }

        let pivot = aug[pivot_row][col];
        for cell in aug[pivot_row].iter_mut() {
            *cell /= pivot;
        }

        let reference = aug[pivot_row].clone();
        for row in 0..rows {
            if row == pivot_row {
                continue;
            }
            let factor = aug[row][col];
            if factor.is_zero() {
                continue;
            }
            for (cell, &pv) in aug[row].iter_mut().zip(reference.iter()) {
                *cell -= factor * pv;
            }
        }

        pivots.push((pivot_row, col));
        pivot_row += 1;
    }

    for row in pivot_row..rows {
        if aug[row][cols].abs() > CONSISTENCY_TOLERANCE {
            return None;
        }
    }

    let mut x = vec![Decimal::ZERO; cols];
    for (row, col) in pivots {
        x[col] = aug[row][cols];
    }
    Some(x)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Decimal, b: Decimal) -> bool {
        (a - b).abs() < dec!(0.0000000001)
    }

    #[test]
    fn test_vec_dot() {
        assert_eq!(vec_dot(&[dec!(1), dec!(2)], &[dec!(3), dec!(4)]), dec!(11));
    }

    #[test]
    fn test_quadratic_form() {
        let m = vec![vec![dec!(2), dec!(1)], vec![dec!(1), dec!(3)]];
        // [1,1] M [1,1]' = 2 + 1 + 1 + 3
        assert_eq!(quadratic_form(&m, &[dec!(1), dec!(1)]), dec!(7));
    }

    #[test]
    fn test_sqrt_decimal() {
        assert!(close(sqrt_decimal(dec!(4)), dec!(2)));
        assert!(close(sqrt_decimal(dec!(0.0001)), dec!(0.01)));
        assert_eq!(sqrt_decimal(dec!(-1)), Decimal::ZERO);
    }

    #[test]
    fn test_solve_regular_system() {
        let m = vec![vec![dec!(2), dec!(1)], vec![dec!(1), dec!(3)]];
        let x = solve_linear_system(&m, &[dec!(3), dec!(5)]).unwrap();
        // 2x + y = 3, x + 3y = 5 -> x = 0.8, y = 1.4
        assert!(close(x[0], dec!(0.8)));
        assert!(close(x[1], dec!(1.4)));
    }

    #[test]
    fn test_solve_needs_pivoting() {
        let m = vec![vec![dec!(0), dec!(1)], vec![dec!(1), dec!(0)]];
        let x = solve_linear_system(&m, &[dec!(2), dec!(3)]).unwrap();
        assert_eq!(x, vec![dec!(3), dec!(2)]);
    }

    #[test]
    fn test_solve_consistent_rank_deficient() {
        // x + y = 2 stated twice: free column set to zero
        let m = vec![vec![dec!(1), dec!(1)], vec![dec!(2), dec!(2)]];
        let x = solve_linear_system(&m, &[dec!(2), dec!(4)]).unwrap();
        assert!(close(x[0] + x[1], dec!(2)));
    }

    #[test]
    fn test_solve_inconsistent() {
        let m = vec![vec![dec!(1)], vec![dec!(2)]];
        assert!(solve_linear_system(&m, &[dec!(1), dec!(3)]).is_none());
        assert!(solve_linear_system(&m, &[dec!(1), dec!(2)]).is_some());
    }
}
