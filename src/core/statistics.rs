//! Sample moments of a return matrix, computed once and shared read-only.

use nalgebra::{DMatrix, DVector};

use super::error::{FrontierError, Result};
use super::returns::ReturnMatrix;
use super::types::Annualization;

const SYMMETRY_TOLERANCE: f64 = 1e-12;

/// Mean vector and covariance matrix of per-period returns.
///
/// The scaled (annualized) moments are cached next to the raw ones so that
/// performance evaluation never touches the return matrix again.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnStatistics {
    mean: DVector<f64>,
    covariance: DMatrix<f64>,
    observations: usize,
    scale: f64,
    scaled_mean: DVector<f64>,
    scaled_covariance: DMatrix<f64>,
}

impl ReturnStatistics {
    /// Compute sample mean and unbiased covariance (divisor T - 1), scaled by
    /// the sample size.
    pub fn from_returns(matrix: &ReturnMatrix) -> Result<Self> {
        Self::from_returns_with(matrix, Annualization::SampleSize)
    }

    /// Compute sample moments with an explicit annualization.
    pub fn from_returns_with(matrix: &ReturnMatrix, annualization: Annualization) -> Result<Self> {
        let t = matrix.n_periods();
        let n = matrix.n_assets();
        if t < 2 {
            return Err(FrontierError::insufficient_data("return periods", 2, t));
        }

        let mut mean = DVector::<f64>::zeros(n);
        for row in matrix.rows() {
            for (j, &r) in row.iter().enumerate() {
                mean[j] += r;
            }
        }
        mean /= t as f64;

        let mut covariance = DMatrix::<f64>::zeros(n, n);
        for row in matrix.rows() {
            for i in 0..n {
                let di = row[i] - mean[i];
                for j in i..n {
                    covariance[(i, j)] += di * (row[j] - mean[j]);
                }
            }
        }
        for i in 0..n {
            for j in i..n {
                let c = covariance[(i, j)] / (t - 1) as f64;
                covariance[(i, j)] = c;
                covariance[(j, i)] = c;
            }
        }

        Self::build(mean, covariance, t, annualization)
    }

    /// Build from known per-period moments.
    ///
    /// Accepts a single asset, unlike the return-matrix boundary.
    pub fn from_moments(
        mean: Vec<f64>,
        covariance: Vec<Vec<f64>>,
        observations: usize,
    ) -> Result<Self> {
        let n = mean.len();
        if n == 0 {
            return Err(FrontierError::insufficient_data("mean vector", 1, 0));
        }
        if observations < 2 {
            return Err(FrontierError::insufficient_data("observations", 2, observations));
        }
        if covariance.len() != n {
            return Err(FrontierError::length_mismatch("covariance rows", n, covariance.len()));
        }
        if let Some(row) = covariance.iter().find(|row| row.len() != n) {
            return Err(FrontierError::length_mismatch("covariance row", n, row.len()));
        }

        let mean = DVector::from_vec(mean);
        let covariance = DMatrix::from_fn(n, n, |i, j| covariance[i][j]);
        Self::build(mean, covariance, observations, Annualization::SampleSize)
    }

    /// Rescale the cached moments with a different annualization.
    pub fn annualized(self, annualization: Annualization) -> Result<Self> {
        Self::build(self.mean, self.covariance, self.observations, annualization)
    }

    fn build(
        mean: DVector<f64>,
        covariance: DMatrix<f64>,
        observations: usize,
        annualization: Annualization,
    ) -> Result<Self> {
        let n = mean.len();
        if mean.iter().chain(covariance.iter()).any(|v| !v.is_finite()) {
            return Err(FrontierError::invalid_input("statistics contain non-finite values"));
        }
        for i in 0..n {
            if covariance[(i, i)] < 0.0 {
                return Err(FrontierError::invalid_input(format!(
                    "negative variance for asset {i}"
                )));
            }
            for j in (i + 1)..n {
                let (a, b) = (covariance[(i, j)], covariance[(j, i)]);
                if (a - b).abs() > SYMMETRY_TOLERANCE * a.abs().max(b.abs()).max(1.0) {
                    return Err(FrontierError::invalid_input("covariance matrix is not symmetric"));
                }
            }
        }

        let scale = match annualization {
            Annualization::SampleSize => observations as f64,
            Annualization::PeriodsPerYear(p) if p.is_finite() && p > 0.0 => p,
            Annualization::PeriodsPerYear(p) => {
                return Err(FrontierError::invalid_input(format!(
                    "periods per year must be positive, got {p}"
                )))
            }
        };

        let scaled_mean = &mean * scale;
        let scaled_covariance = &covariance * scale;
        Ok(Self {
            mean,
            covariance,
            observations,
            scale,
            scaled_mean,
            scaled_covariance,
        })
    }

    /// Number of assets (N).
    #[inline]
    pub fn n_assets(&self) -> usize {
        self.mean.len()
    }

    /// Observations the moments were estimated from (T).
    #[inline]
    pub fn observations(&self) -> usize {
        self.observations
    }

    /// Factor applied to per-period moments.
    #[inline]
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Per-period mean returns.
    pub fn mean(&self) -> &DVector<f64> {
        &self.mean
    }

    /// Per-period covariance.
    pub fn covariance(&self) -> &DMatrix<f64> {
        &self.covariance
    }

    /// Annualized mean returns.
    pub fn scaled_mean(&self) -> &DVector<f64> {
        &self.scaled_mean
    }

    /// Annualized covariance.
    pub fn scaled_covariance(&self) -> &DMatrix<f64> {
        &self.scaled_covariance
    }

    /// Annualized return of each single-asset portfolio.
    pub fn asset_returns(&self) -> Vec<f64> {
        self.scaled_mean.iter().copied().collect()
    }

    /// Annualized volatility of each single-asset portfolio.
    pub fn asset_volatilities(&self) -> Vec<f64> {
        self.scaled_covariance
            .diagonal()
            .iter()
            .map(|v| v.max(0.0).sqrt())
            .collect()
    }

    /// Lowest and highest annualized return reachable by a long-only,
    /// fully invested portfolio.
    pub fn return_range(&self) -> (f64, f64) {
        (self.scaled_mean.min(), self.scaled_mean.max())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_matrix() -> ReturnMatrix {
        ReturnMatrix::from_rows(vec![
            vec![0.01, 0.03],
            vec![0.02, 0.01],
            vec![0.03, 0.02],
            vec![0.02, 0.02],
        ])
        .unwrap()
    }

    #[test]
    fn test_sample_moments() {
        let stats = ReturnStatistics::from_returns(&sample_matrix()).unwrap();
        assert_eq!(stats.n_assets(), 2);
        assert_eq!(stats.observations(), 4);
        assert!((stats.mean()[0] - 0.02).abs() < 1e-12);
        assert!((stats.mean()[1] - 0.02).abs() < 1e-12);

        // var(a) = (1e-4 + 0 + 1e-4 + 0) / 3
        assert!((stats.covariance()[(0, 0)] - 2e-4 / 3.0).abs() < 1e-15);
        // cov(a, b) = (-1e-4 + 0 + 0 + 0) / 3
        assert!((stats.covariance()[(0, 1)] + 1e-4 / 3.0).abs() < 1e-15);
        assert_eq!(stats.covariance()[(0, 1)], stats.covariance()[(1, 0)]);

        // Scaled by the sample size.
        assert!((stats.scaled_mean()[0] - 0.08).abs() < 1e-12);
        assert!((stats.scaled_covariance()[(0, 0)] - 8e-4 / 3.0).abs() < 1e-15);
    }

    #[test]
    fn test_calendar_annualization() {
        let stats = ReturnStatistics::from_returns_with(
            &sample_matrix(),
            Annualization::PeriodsPerYear(252.0),
        )
        .unwrap();
        assert_eq!(stats.scale(), 252.0);
        assert!((stats.scaled_mean()[1] - 0.02 * 252.0).abs() < 1e-12);

        let bad = ReturnStatistics::from_returns_with(
            &sample_matrix(),
            Annualization::PeriodsPerYear(0.0),
        );
        assert!(bad.is_err());
    }

    #[test]
    fn test_from_moments_validation() {
        let ok = ReturnStatistics::from_moments(vec![0.001], vec![vec![0.0004]], 60).unwrap();
        assert_eq!(ok.n_assets(), 1);
        assert!((ok.asset_volatilities()[0] - (0.0004_f64 * 60.0).sqrt()).abs() < 1e-12);

        assert!(ReturnStatistics::from_moments(vec![], vec![], 60).is_err());
        assert!(ReturnStatistics::from_moments(vec![0.001], vec![vec![0.0004]], 1).is_err());
        assert!(ReturnStatistics::from_moments(
            vec![0.001, 0.002],
            vec![vec![0.0004, 0.0001], vec![0.0002, 0.0009]],
            60
        )
        .is_err());
        assert!(ReturnStatistics::from_moments(vec![0.001], vec![vec![-0.1]], 60).is_err());
        assert!(ReturnStatistics::from_moments(vec![f64::NAN], vec![vec![0.1]], 60).is_err());
    }

    #[test]
    fn test_return_range() {
        let stats = ReturnStatistics::from_moments(
            vec![0.001, 0.003, 0.002],
            vec![
                vec![0.0004, 0.0, 0.0],
                vec![0.0, 0.0009, 0.0],
                vec![0.0, 0.0, 0.0001],
            ],
            100,
        )
        .unwrap();
        let (lo, hi) = stats.return_range();
        assert!((lo - 0.1).abs() < 1e-12);
        assert!((hi - 0.3).abs() < 1e-12);
    }
}
