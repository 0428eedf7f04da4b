use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::FrontierError;
use crate::returns::ReturnTable;
use crate::types::{CovarianceMatrix, Percent};
use crate::FrontierResult;

use super::linalg::sqrt_decimal;

/// Annualized per-asset statistics, in percent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetStatistics {
    pub tickers: Vec<String>,
    /// mean(periodic return) * periods_per_year * 100
    pub means: Vec<Percent>,
    /// std(periodic return) * sqrt(periods_per_year) * 100
    pub stds: Vec<Percent>,
}

impl AssetStatistics {
    /// Largest annualized mean across assets.
    pub fn max_mean(&self) -> Decimal {
        self.means.iter().copied().max().unwrap_or(Decimal::ZERO)
    }
}

/// Sample covariance (n-1) of the return columns, at periodic scale.
pub fn covariance_matrix(returns: &ReturnTable) -> FrontierResult<CovarianceMatrix> {
    require_history(returns)?;
    let columns = returns.columns();
    let means: Vec<Decimal> = columns.iter().map(|c| mean(c)).collect();
    let n = columns.len();

    let mut cov = vec![vec![Decimal::ZERO; n]; n];
    for i in 0..n {
        for j in i..n {
            let c = covariance(&columns[i], &columns[j], means[i], means[j]);
            cov[i][j] = c;
            cov[j][i] = c;
        }
    }
    Ok(cov)
}

/// Annualized means and standard deviations of every return column.
pub fn asset_statistics(
    returns: &ReturnTable,
    periods_per_year: u32,
) -> FrontierResult<AssetStatistics> {
    require_history(returns)?;
    let periods = Decimal::from(periods_per_year);
    let sqrt_periods = sqrt_decimal(periods);

    let mut means = Vec::with_capacity(returns.num_assets());
    let mut stds = Vec::with_capacity(returns.num_assets());
    for column in returns.columns() {
        let m = mean(&column);
        let sd = sqrt_decimal(covariance(&column, &column, m, m));
        means.push(m * periods * dec!(100));
        stds.push(sd * sqrt_periods * dec!(100));
    }

    Ok(AssetStatistics {
        tickers: returns.tickers.clone(),
        means,
        stds,
    })
}

fn require_history(returns: &ReturnTable) -> FrontierResult<()> {
    if returns.num_assets() == 0 {
        return Err(FrontierError::InsufficientData(
            "At least one asset required".into(),
        ));
    }
    if returns.num_periods() < 2 {
        return Err(FrontierError::InsufficientData(format!(
            "At least 2 return periods required, got {}",
            returns.num_periods()
        )));
    }
    Ok(())
}

fn mean(data: &[Decimal]) -> Decimal {
    if data.is_empty() {
        return Decimal::ZERO;
    }
    data.iter().sum::<Decimal>() / Decimal::from(data.len() as i64)
}

/// Covariance between two series (sample, n-1)
fn covariance(x: &[Decimal], y: &[Decimal], x_mean: Decimal, y_mean: Decimal) -> Decimal {
    let n = x.len();
    if n < 2 {
        return Decimal::ZERO;
    }
    let sum: Decimal = x
        .iter()
        .zip(y.iter())
        .map(|(xi, yi)| (xi - x_mean) * (yi - y_mean))
        .sum();
    sum / Decimal::from((n - 1) as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Decimal, b: Decimal, tol: Decimal) -> bool {
        (a - b).abs() < tol
    }

    fn two_assets() -> ReturnTable {
        ReturnTable::from_columns(
            vec!["A".into(), "B".into()],
            vec![
                vec![dec!(0.01), dec!(0.02), dec!(0.03), dec!(0.01)],
                vec![dec!(0.00), dec!(0.01), dec!(-0.01), dec!(0.02)],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_annualized_means() {
        let stats = asset_statistics(&two_assets(), 12).unwrap();
        // 0.0175 * 12 * 100
        assert_eq!(stats.means[0], dec!(21.0));
        // 0.005 * 12 * 100
        assert_eq!(stats.means[1], dec!(6.0));
        assert_eq!(stats.max_mean(), dec!(21.0));
    }

    #[test]
    fn test_annualized_stds() {
        let stats = asset_statistics(&two_assets(), 12).unwrap();
        // var(A) = 0.000275 / 3, std * sqrt(12) * 100 = sqrt(0.0011) * 100
        assert!(close(stats.stds[0], dec!(3.3166247903554), dec!(0.000001)));
        // var(B) = 0.0005 / 3 -> sqrt(0.002) * 100
        assert!(close(stats.stds[1], dec!(4.4721359549996), dec!(0.000001)));
    }

    #[test]
    fn test_covariance_matrix_symmetric() {
        let cov = covariance_matrix(&two_assets()).unwrap();
        assert_eq!(cov[0][1], cov[1][0]);
        // sum((a - 0.0175)(b - 0.005)) = -0.00025, / 3
        assert!(close(cov[0][1], dec!(-0.00025) / dec!(3), dec!(0.0000000001)));
        assert!(close(cov[0][0], dec!(0.000275) / dec!(3), dec!(0.0000000001)));
    }

    #[test]
    fn test_insufficient_history() {
        let t = ReturnTable::from_columns(vec!["A".into()], vec![vec![dec!(0.01)]]).unwrap();
        assert!(matches!(
            covariance_matrix(&t),
            Err(FrontierError::InsufficientData(_))
        ));
        assert!(asset_statistics(&t, 12).is_err());
    }

    #[test]
    fn test_no_assets() {
        let t = ReturnTable::from_columns(vec![], vec![]).unwrap();
        assert!(matches!(
            asset_statistics(&t, 12),
            Err(FrontierError::InsufficientData(_))
        ));
    }
}
