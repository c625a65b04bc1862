//! Annualized return, volatility and Sharpe ratio of a weight vector.

use nalgebra::DVector;

use crate::core::error::{FrontierError, Result};
use crate::core::statistics::ReturnStatistics;
use crate::core::types::PerformanceResult;

/// Annualized portfolio return: sum(mean_i * w_i) * scale.
#[inline]
pub fn portfolio_return(weights: &DVector<f64>, stats: &ReturnStatistics) -> f64 {
    stats.scaled_mean().dot(weights)
}

/// Annualized portfolio variance wᵀ (Σ * scale) w, clamped at zero.
#[inline]
pub fn portfolio_variance(weights: &DVector<f64>, stats: &ReturnStatistics) -> f64 {
    let sigma_w = stats.scaled_covariance() * weights;
    weights.dot(&sigma_w).max(0.0)
}

/// Annualized portfolio volatility. Never negative.
#[inline]
pub fn portfolio_volatility(weights: &DVector<f64>, stats: &ReturnStatistics) -> f64 {
    portfolio_variance(weights, stats).sqrt()
}

/// Sharpe ratio (no risk-free rate): return / volatility.
///
/// Zero volatility yields `DegenerateVolatility` instead of a non-finite ratio.
pub fn sharpe_ratio(annualized_return: f64, annualized_volatility: f64) -> Result<f64> {
    if annualized_volatility == 0.0 {
        return Err(FrontierError::degenerate_volatility("Sharpe ratio"));
    }
    Ok(annualized_return / annualized_volatility)
}

/// Evaluate a weight vector against the cached statistics.
pub fn evaluate(weights: &[f64], stats: &ReturnStatistics) -> Result<PerformanceResult> {
    if weights.len() != stats.n_assets() {
        return Err(FrontierError::length_mismatch(
            "weights",
            stats.n_assets(),
            weights.len(),
        ));
    }
    evaluate_vector(&DVector::from_column_slice(weights), stats)
}

/// Evaluate a weight vector already in solver form.
pub fn evaluate_vector(
    weights: &DVector<f64>,
    stats: &ReturnStatistics,
) -> Result<PerformanceResult> {
    let annualized_return = portfolio_return(weights, stats);
    let annualized_volatility = portfolio_volatility(weights, stats);
    let sharpe_ratio = sharpe_ratio(annualized_return, annualized_volatility)?;
    Ok(PerformanceResult {
        annualized_return,
        annualized_volatility,
        sharpe_ratio,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_asset_stats() -> ReturnStatistics {
        ReturnStatistics::from_moments(
            vec![0.001, 0.002],
            vec![vec![0.0004, 0.0001], vec![0.0001, 0.0009]],
            60,
        )
        .unwrap()
    }

    #[test]
    fn test_evaluate_equal_weights() {
        let stats = two_asset_stats();
        let perf = evaluate(&[0.5, 0.5], &stats).unwrap();

        // Return: (0.0005 + 0.001) * 60
        assert!((perf.annualized_return - 0.09).abs() < 1e-12);
        // Variance: 0.25 * (0.0004 + 0.0009 + 2 * 0.0001) * 60 = 0.0225
        assert!((perf.annualized_volatility - 0.15).abs() < 1e-12);
        assert!((perf.sharpe_ratio - 0.6).abs() < 1e-10);
    }

    #[test]
    fn test_single_asset_portfolio() {
        let stats = two_asset_stats();
        let perf = evaluate(&[0.0, 1.0], &stats).unwrap();
        assert!((perf.annualized_return - 0.12).abs() < 1e-12);
        assert!((perf.annualized_volatility - (0.0009_f64 * 60.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_volatility_non_negative() {
        let stats = two_asset_stats();
        for i in 0..=20 {
            let w = i as f64 / 20.0;
            let perf = evaluate(&[w, 1.0 - w], &stats).unwrap();
            assert!(perf.annualized_volatility >= 0.0);
        }
    }

    #[test]
    fn test_degenerate_volatility() {
        let stats = ReturnStatistics::from_moments(
            vec![0.001, 0.002],
            vec![vec![0.0, 0.0], vec![0.0, 0.0]],
            10,
        )
        .unwrap();
        let err = evaluate(&[0.5, 0.5], &stats).unwrap_err();
        assert!(matches!(err, FrontierError::DegenerateVolatility { .. }));
        assert!(sharpe_ratio(0.1, 0.0).is_err());
    }

    #[test]
    fn test_length_mismatch() {
        let stats = two_asset_stats();
        assert!(evaluate(&[1.0], &stats).unwrap_err().is_invalid_input());
    }

    #[test]
    fn test_clamps_rounding_noise() {
        // Perfectly anti-correlated assets hedge to zero variance at 50/50.
        let stats = ReturnStatistics::from_moments(
            vec![0.001, 0.001],
            vec![vec![0.0004, -0.0004], vec![-0.0004, 0.0004]],
            10,
        )
        .unwrap();
        let w = DVector::from_vec(vec![0.5, 0.5]);
        assert!(portfolio_variance(&w, &stats) >= 0.0);
        assert!(portfolio_volatility(&w, &stats).abs() < 1e-9);
    }
}
