//! One analysis run over a fixed asset universe.
//!
//! The session owns the cleaned return matrix and the statistics derived
//! from it. Every operation borrows the statistics read-only, so results are
//! reproducible and operations can be called in any order.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::monte_carlo::{simulate, MonteCarloConfig, SimulationResult};
use crate::core::error::{FrontierError, Result};
use crate::core::returns::ReturnMatrix;
use crate::core::statistics::ReturnStatistics;
use crate::core::types::{
    AllocationReport, Annualization, AssetUniverse, FrontierPoint, OptimizedPortfolio,
    PerformanceResult, TargetPortfolio,
};
use crate::metrics::performance::evaluate;
use crate::optimize::frontier::{self, default_targets};
use crate::optimize::sharpe;
use crate::optimize::solver::SolverSettings;

/// Configuration of a frontier session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FrontierConfig {
    pub monte_carlo: MonteCarloConfig,
    pub solver: SolverSettings,
    pub annualization: Annualization,
    /// Number of targets used by `default_frontier`.
    pub frontier_points: usize,
}

impl Default for FrontierConfig {
    fn default() -> Self {
        Self {
            monte_carlo: MonteCarloConfig::default(),
            solver: SolverSettings::default(),
            annualization: Annualization::SampleSize,
            frontier_points: 100,
        }
    }
}

impl FrontierConfig {
    /// Check every nested setting.
    pub fn validate(&self) -> Result<()> {
        self.solver.validate()?;
        if self.monte_carlo.chunk_size == 0 {
            return Err(FrontierError::invalid_input("monte carlo chunk_size must be positive"));
        }
        if let Annualization::PeriodsPerYear(p) = self.annualization {
            if !(p.is_finite() && p > 0.0) {
                return Err(FrontierError::invalid_input(format!(
                    "periods per year must be positive, got {p}"
                )));
            }
        }
        if self.frontier_points < 2 {
            return Err(FrontierError::insufficient_data(
                "frontier points",
                2,
                self.frontier_points,
            ));
        }
        Ok(())
    }
}

/// Universe, returns, statistics and configuration of one run.
#[derive(Debug, Clone)]
pub struct FrontierSession {
    universe: AssetUniverse,
    matrix: ReturnMatrix,
    stats: ReturnStatistics,
    config: FrontierConfig,
}

impl FrontierSession {
    /// Validate the inputs and compute the statistics once.
    pub fn new(
        universe: AssetUniverse,
        matrix: ReturnMatrix,
        config: FrontierConfig,
    ) -> Result<Self> {
        config.validate()?;
        if matrix.n_assets() != universe.len() {
            return Err(FrontierError::length_mismatch(
                "return matrix columns",
                universe.len(),
                matrix.n_assets(),
            ));
        }
        let stats = ReturnStatistics::from_returns_with(&matrix, config.annualization)?;
        debug!(
            assets = universe.len(),
            periods = matrix.n_periods(),
            dropped = matrix.dropped_rows(),
            scale = stats.scale(),
            "frontier session ready"
        );

        Ok(Self {
            universe,
            matrix,
            stats,
            config,
        })
    }

    pub fn universe(&self) -> &AssetUniverse {
        &self.universe
    }

    pub fn returns(&self) -> &ReturnMatrix {
        &self.matrix
    }

    pub fn statistics(&self) -> &ReturnStatistics {
        &self.stats
    }

    pub fn config(&self) -> &FrontierConfig {
        &self.config
    }

    /// Performance of an arbitrary weight vector.
    pub fn evaluate(&self, weights: &[f64]) -> Result<PerformanceResult> {
        evaluate(weights, &self.stats)
    }

    /// Monte Carlo cloud with the configured number of trials.
    pub fn simulate(&self) -> SimulationResult {
        simulate(&self.stats, &self.config.monte_carlo)
    }

    /// Monte Carlo cloud with `n_simulations` trials and the configured seed.
    pub fn simulate_n(&self, n_simulations: usize) -> SimulationResult {
        let config = MonteCarloConfig {
            n_simulations,
            ..self.config.monte_carlo.clone()
        };
        simulate(&self.stats, &config)
    }

    pub fn maximize_sharpe(&self) -> Result<OptimizedPortfolio> {
        sharpe::maximize_sharpe(&self.stats, &self.config.solver)
    }

    pub fn minimize_volatility(&self) -> Result<OptimizedPortfolio> {
        frontier::minimize_volatility(&self.stats, &self.config.solver)
    }

    pub fn minimize_volatility_for_target(&self, target_return: f64) -> Result<TargetPortfolio> {
        frontier::minimize_volatility_for_target(&self.stats, target_return, &self.config.solver)
    }

    pub fn compute_frontier(&self, targets: &[f64]) -> Vec<FrontierPoint> {
        frontier::compute_frontier(&self.stats, targets, &self.config.solver)
    }

    /// Frontier over `frontier_points` targets from zero to the best
    /// single-asset return.
    pub fn default_frontier(&self) -> Vec<FrontierPoint> {
        let targets = default_targets(&self.stats, self.config.frontier_points);
        self.compute_frontier(&targets)
    }

    /// Label the weights of an optimized portfolio with the universe tickers.
    pub fn allocation_report(&self, portfolio: &OptimizedPortfolio) -> Result<AllocationReport> {
        if portfolio.weights.len() != self.universe.len() {
            return Err(FrontierError::length_mismatch(
                "weights",
                self.universe.len(),
                portfolio.weights.len(),
            ));
        }
        let allocations = self
            .universe
            .tickers()
            .iter()
            .cloned()
            .zip(portfolio.weights.iter().copied())
            .collect();

        Ok(AllocationReport {
            allocations,
            performance: portfolio.performance,
        })
    }
}
