//! Maximum-Sharpe-ratio portfolio.

use nalgebra::DVector;
use tracing::warn;

use super::solver::{Objective, SimplexSolver, SolverSettings};
use crate::core::error::Result;
use crate::core::statistics::ReturnStatistics;
use crate::core::types::{equal_weights, OptimizedPortfolio};
use crate::metrics::performance::evaluate_vector;

/// Negative Sharpe ratio `-(μ·w) / sqrt(wᵀΣw)` on annualized moments.
pub struct NegativeSharpe<'a> {
    stats: &'a ReturnStatistics,
}

impl<'a> NegativeSharpe<'a> {
    pub fn new(stats: &'a ReturnStatistics) -> Self {
        Self { stats }
    }
}

impl Objective for NegativeSharpe<'_> {
    fn value(&self, w: &DVector<f64>) -> f64 {
        let sigma_w = self.stats.scaled_covariance() * w;
        let vol = w.dot(&sigma_w).max(0.0).sqrt();
        if vol == 0.0 {
            return f64::NAN;
        }
        -self.stats.scaled_mean().dot(w) / vol
    }

    fn gradient(&self, w: &DVector<f64>) -> DVector<f64> {
        let sigma_w = self.stats.scaled_covariance() * w;
        let var = w.dot(&sigma_w).max(0.0);
        let vol = var.sqrt();
        if vol == 0.0 {
            return DVector::from_element(w.len(), f64::NAN);
        }
        let ret = self.stats.scaled_mean().dot(w);
        // -(μ / σ - r Σw / σ³)
        sigma_w * (ret / (var * vol)) - self.stats.scaled_mean() / vol
    }
}

/// Maximize the Sharpe ratio over long-only, fully invested portfolios,
/// starting from equal weights.
///
/// The ratio objective is not convex, so the result is a local optimum.
/// Fails with `DegenerateVolatility` when the equal-weight start has zero
/// volatility and with `OptimizationFailed` when the solver does not converge.
pub fn maximize_sharpe(
    stats: &ReturnStatistics,
    settings: &SolverSettings,
) -> Result<OptimizedPortfolio> {
    settings.validate()?;
    let x0 = DVector::from_vec(equal_weights(stats.n_assets()));
    evaluate_vector(&x0, stats)?;

    let report =
        SimplexSolver::new(settings.clone()).minimize(&NegativeSharpe::new(stats), &x0, &[]);
    let weights = report.checked_weights().inspect_err(|err| {
        warn!(%err, "max sharpe optimization did not converge");
    })?;
    let performance = evaluate_vector(&report.x, stats)?;

    Ok(OptimizedPortfolio {
        weights,
        performance,
        iterations: report.iterations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::FrontierError;
    use crate::core::types::{is_feasible, SOLVER_WEIGHT_TOLERANCE};
    use crate::metrics::performance::evaluate;

    fn two_asset_stats() -> ReturnStatistics {
        ReturnStatistics::from_moments(
            vec![0.001, 0.002],
            vec![vec![0.0004, 0.0001], vec![0.0001, 0.0009]],
            60,
        )
        .unwrap()
    }

    #[test]
    fn test_gradient_matches_finite_differences() {
        let stats = ReturnStatistics::from_moments(
            vec![0.0005, 0.001, 0.0015],
            vec![
                vec![0.0001, 0.00002, 0.0],
                vec![0.00002, 0.0004, 0.00005],
                vec![0.0, 0.00005, 0.0009],
            ],
            100,
        )
        .unwrap();
        let objective = NegativeSharpe::new(&stats);
        let w = DVector::from_vec(vec![0.2, 0.3, 0.5]);
        let grad = objective.gradient(&w);

        let h = 1e-6;
        for i in 0..3 {
            let mut up = w.clone();
            let mut down = w.clone();
            up[i] += h;
            down[i] -= h;
            let numeric = (objective.value(&up) - objective.value(&down)) / (2.0 * h);
            assert!((grad[i] - numeric).abs() < 1e-6, "component {i}: {} vs {numeric}", grad[i]);
        }
    }

    #[test]
    fn test_two_asset_diversifies() {
        let stats = two_asset_stats();
        let result = maximize_sharpe(&stats, &SolverSettings::default()).unwrap();

        assert!(is_feasible(&result.weights, SOLVER_WEIGHT_TOLERANCE));
        assert!(result.weights[0] > 0.0 && result.weights[0] < 1.0);
        assert!(result.weights[1] > 0.0 && result.weights[1] < 1.0);

        // Tangency portfolio of this pair is exactly 50/50.
        assert!((result.weights[0] - 0.5).abs() < 1e-6);
        assert!((result.performance.sharpe_ratio - 0.6).abs() < 1e-9);

        // Beats either pure asset.
        let a = evaluate(&[1.0, 0.0], &stats).unwrap();
        let b = evaluate(&[0.0, 1.0], &stats).unwrap();
        assert!(result.performance.sharpe_ratio > a.sharpe_ratio);
        assert!(result.performance.sharpe_ratio > b.sharpe_ratio);
    }

    #[test]
    fn test_corner_solution() {
        // Asset 0 dominates: higher return, lower risk, uncorrelated.
        let stats = ReturnStatistics::from_moments(
            vec![0.002, 0.0005],
            vec![vec![0.0001, 0.0], vec![0.0, 0.0009]],
            50,
        )
        .unwrap();
        let result = maximize_sharpe(&stats, &SolverSettings::default()).unwrap();
        assert!(is_feasible(&result.weights, SOLVER_WEIGHT_TOLERANCE));

        // Unconstrained tangency weights ∝ Σ⁻¹μ = (20, 0.556), normalized.
        let expected = 20.0 / (20.0 + 0.5 / 0.9);
        assert!((result.weights[0] - expected).abs() < 1e-5);
    }

    #[test]
    fn test_single_asset() {
        let stats = ReturnStatistics::from_moments(vec![0.001], vec![vec![0.0004]], 60).unwrap();
        let result = maximize_sharpe(&stats, &SolverSettings::default()).unwrap();
        assert_eq!(result.weights, vec![1.0]);
    }

    #[test]
    fn test_identical_assets() {
        let stats = ReturnStatistics::from_moments(
            vec![0.001; 4],
            (0..4)
                .map(|i| (0..4).map(|j| if i == j { 0.0004 } else { 0.0 }).collect())
                .collect(),
            60,
        )
        .unwrap();
        let result = maximize_sharpe(&stats, &SolverSettings::default()).unwrap();
        let equal = evaluate(&[0.25; 4], &stats).unwrap();
        assert!((result.performance.sharpe_ratio - equal.sharpe_ratio).abs() < 1e-9);
    }

    #[test]
    fn test_repeatable() {
        let stats = ReturnStatistics::from_moments(
            vec![0.0005, 0.001, 0.0015],
            vec![
                vec![0.0001, 0.00002, 0.0],
                vec![0.00002, 0.0004, 0.00005],
                vec![0.0, 0.00005, 0.0009],
            ],
            100,
        )
        .unwrap();
        let first = maximize_sharpe(&stats, &SolverSettings::default()).unwrap();
        let second = maximize_sharpe(&stats, &SolverSettings::default()).unwrap();
        assert_eq!(first.weights, second.weights);
    }

    #[test]
    fn test_degenerate_start() {
        let stats = ReturnStatistics::from_moments(
            vec![0.001, 0.002],
            vec![vec![0.0, 0.0], vec![0.0, 0.0]],
            60,
        )
        .unwrap();
        let err = maximize_sharpe(&stats, &SolverSettings::default()).unwrap_err();
        assert!(matches!(err, FrontierError::DegenerateVolatility { .. }));
    }

    #[test]
    fn test_non_convergence_is_reported() {
        let stats = ReturnStatistics::from_moments(
            vec![0.002, 0.0005, 0.001],
            vec![
                vec![0.0001, 0.0, 0.0],
                vec![0.0, 0.0009, 0.0],
                vec![0.0, 0.0, 0.0004],
            ],
            50,
        )
        .unwrap();
        let settings = SolverSettings {
            max_iterations: 1,
            tolerance: 1e-15,
            stall_tolerance: 1e-15,
            ..Default::default()
        };
        match maximize_sharpe(&stats, &settings) {
            Err(FrontierError::OptimizationFailed { weights, .. }) => {
                assert_eq!(weights.len(), 3);
            }
            other => panic!("expected OptimizationFailed, got {other:?}"),
        }
    }
}
