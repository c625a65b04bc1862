//! Minimum-variance portfolios and the efficient frontier.
//!
//! Minimizing variance and minimizing volatility share the same argmin on
//! the simplex; the variance is smooth everywhere, so the solver works on it
//! and the reported figure is its square root.

use nalgebra::DVector;
use rayon::prelude::*;
use tracing::{debug, warn};

use super::solver::{LinearEquality, Objective, SimplexSolver, SolveStatus, SolverSettings};
use crate::core::error::{FrontierError, Result};
use crate::core::statistics::ReturnStatistics;
use crate::core::types::{
    equal_weights, FrontierPoint, OptimizedPortfolio, PerformanceResult, TargetPortfolio,
};
use crate::metrics::performance::{evaluate_vector, portfolio_return, portfolio_volatility};

/// Annualized portfolio variance wᵀΣw, divided by the largest asset variance
/// so the solver works on values of order one whatever the units of the data.
pub struct PortfolioVariance<'a> {
    stats: &'a ReturnStatistics,
    scale: f64,
}

impl<'a> PortfolioVariance<'a> {
    pub fn new(stats: &'a ReturnStatistics) -> Self {
        let largest = stats.scaled_covariance().diagonal().amax();
        Self {
            stats,
            scale: if largest > 0.0 { largest } else { 1.0 },
        }
    }
}

impl Objective for PortfolioVariance<'_> {
    fn value(&self, w: &DVector<f64>) -> f64 {
        w.dot(&(self.stats.scaled_covariance() * w)) / self.scale
    }

    fn gradient(&self, w: &DVector<f64>) -> DVector<f64> {
        (self.stats.scaled_covariance() * w) * (2.0 / self.scale)
    }
}

/// Largest absolute single-asset return, or one when every return is zero.
fn return_scale(stats: &ReturnStatistics) -> f64 {
    let largest = stats.scaled_mean().amax();
    if largest > 0.0 {
        largest
    } else {
        1.0
    }
}

/// Global minimum-variance portfolio (no return target).
///
/// When the minimum variance is exactly zero (a perfect hedge or a riskless
/// asset) the weights are still returned; the Sharpe ratio is reported as NaN.
pub fn minimize_volatility(
    stats: &ReturnStatistics,
    settings: &SolverSettings,
) -> Result<OptimizedPortfolio> {
    settings.validate()?;
    let x0 = DVector::from_vec(equal_weights(stats.n_assets()));
    let report =
        SimplexSolver::new(settings.clone()).minimize(&PortfolioVariance::new(stats), &x0, &[]);
    let weights = report.checked_weights().inspect_err(|err| {
        warn!(%err, "minimum variance optimization did not converge");
    })?;

    let performance = match evaluate_vector(&report.x, stats) {
        Ok(performance) => performance,
        Err(FrontierError::DegenerateVolatility { .. }) => {
            warn!("minimum variance portfolio has zero volatility, sharpe ratio undefined");
            PerformanceResult {
                annualized_return: portfolio_return(&report.x, stats),
                annualized_volatility: 0.0,
                sharpe_ratio: f64::NAN,
            }
        }
        Err(err) => return Err(err),
    };

    Ok(OptimizedPortfolio {
        weights,
        performance,
        iterations: report.iterations,
    })
}

/// Minimum-volatility portfolio whose annualized return equals `target_return`.
///
/// Targets outside the range of single-asset returns, or that the solver
/// cannot meet within `feasibility_tolerance`, fail with `InfeasibleTarget`.
/// Convergence is checked before the volatility is reported.
pub fn minimize_volatility_for_target(
    stats: &ReturnStatistics,
    target_return: f64,
    settings: &SolverSettings,
) -> Result<TargetPortfolio> {
    settings.validate()?;
    if !target_return.is_finite() {
        return Err(FrontierError::invalid_input(format!(
            "target return must be finite, got {target_return}"
        )));
    }

    let (min_return, max_return) = stats.return_range();
    let unit = return_scale(stats);
    let slack = settings.feasibility_tolerance * unit.max(1.0);
    if target_return < min_return - slack || target_return > max_return + slack {
        return Err(FrontierError::infeasible_target(target_return, min_return, max_return));
    }

    // Returns measured in units of the largest asset return.
    let constraint = LinearEquality::new(stats.scaled_mean() / unit, target_return / unit);
    let x0 = DVector::from_vec(equal_weights(stats.n_assets()));
    let report = SimplexSolver::new(settings.clone()).minimize(
        &PortfolioVariance::new(stats),
        &x0,
        &[constraint],
    );
    if report.status == SolveStatus::Infeasible {
        return Err(FrontierError::infeasible_target(target_return, min_return, max_return));
    }
    let weights = report.checked_weights()?;

    Ok(TargetPortfolio {
        target_return,
        volatility: portfolio_volatility(&report.x, stats),
        weights,
        iterations: report.iterations,
    })
}

/// Solve every target independently, in parallel. Output order matches
/// `targets`.
pub fn solve_frontier(
    stats: &ReturnStatistics,
    targets: &[f64],
    settings: &SolverSettings,
) -> Vec<Result<TargetPortfolio>> {
    targets
        .par_iter()
        .map(|&target| minimize_volatility_for_target(stats, target, settings))
        .collect()
}

/// Frontier points for `targets`. Targets that are infeasible or fail to
/// converge are skipped; the rest keep their input order.
pub fn compute_frontier(
    stats: &ReturnStatistics,
    targets: &[f64],
    settings: &SolverSettings,
) -> Vec<FrontierPoint> {
    let solved = solve_frontier(stats, targets, settings);
    let mut skipped = 0;
    let points: Vec<FrontierPoint> = solved
        .into_iter()
        .zip(targets)
        .filter_map(|(result, &target)| match result {
            Ok(portfolio) => Some(portfolio.point()),
            Err(err @ FrontierError::InfeasibleTarget { .. }) => {
                debug!(target_return = target, %err, "skipping infeasible frontier target");
                skipped += 1;
                None
            }
            Err(err) => {
                warn!(target_return = target, %err, "skipping frontier target");
                skipped += 1;
                None
            }
        })
        .collect();
    debug!(solved = points.len(), skipped, "frontier computed");
    points
}

/// `n` evenly spaced values from `start` to `end` inclusive.
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { end } else { start + step * i as f64 })
                .collect()
        }
    }
}

/// `n` targets from zero to the best single-asset annualized return.
pub fn default_targets(stats: &ReturnStatistics, n: usize) -> Vec<f64> {
    let (_, max_return) = stats.return_range();
    linspace(0.0, max_return, n)
}
