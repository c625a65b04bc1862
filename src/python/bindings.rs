//! PyO3 function bindings for the frontier engine.

use numpy::{PyArray1, PyReadonlyArray1, PyReadonlyArray2};
use pyo3::prelude::*;

use crate::core::types::{OptimizedPortfolio, PerformanceResult, TargetPortfolio};
use crate::metrics::performance;
use crate::optimize::frontier::{self, default_targets};
use crate::optimize::sharpe;
use crate::optimize::solver::SolverSettings;
use crate::portfolio::monte_carlo::{self, MonteCarloConfig};

use super::numpy_bridge::*;

// ============================================================================
// Result Classes
// ============================================================================

/// Python-exposed portfolio performance.
#[pyclass]
#[derive(Debug, Clone)]
pub struct PyPerformance {
    #[pyo3(get)]
    pub annualized_return: f64,
    #[pyo3(get)]
    pub annualized_volatility: f64,
    #[pyo3(get)]
    pub sharpe_ratio: f64,
}

#[pymethods]
impl PyPerformance {
    fn __repr__(&self) -> String {
        format!(
            "Performance(return={:.4}, volatility={:.4}, sharpe={:.4})",
            self.annualized_return, self.annualized_volatility, self.sharpe_ratio
        )
    }

    /// Convert to dictionary.
    fn to_dict(&self, py: Python) -> PyResult<PyObject> {
        let dict = pyo3::types::PyDict::new(py);
        dict.set_item("Annualized Return", self.annualized_return)?;
        dict.set_item("Annualized Volatility", self.annualized_volatility)?;
        dict.set_item("Sharpe Ratio", self.sharpe_ratio)?;
        Ok(dict.into())
    }
}

impl From<PerformanceResult> for PyPerformance {
    fn from(result: PerformanceResult) -> Self {
        Self {
            annualized_return: result.annualized_return,
            annualized_volatility: result.annualized_volatility,
            sharpe_ratio: result.sharpe_ratio,
        }
    }
}

/// Python-exposed optimal portfolio.
#[pyclass]
#[derive(Debug, Clone)]
pub struct PyOptimizedPortfolio {
    #[pyo3(get)]
    pub performance: PyPerformance,
    #[pyo3(get)]
    pub iterations: usize,
    weights: Vec<f64>,
}

#[pymethods]
impl PyOptimizedPortfolio {
    /// Get weights as numpy array.
    fn weights<'py>(&self, py: Python<'py>) -> &'py PyArray1<f64> {
        vec_to_numpy_f64(py, self.weights.clone())
    }

    fn __repr__(&self) -> String {
        format!(
            "OptimizedPortfolio(sharpe={:.4}, assets={}, iterations={})",
            self.performance.sharpe_ratio,
            self.weights.len(),
            self.iterations
        )
    }
}

impl From<OptimizedPortfolio> for PyOptimizedPortfolio {
    fn from(portfolio: OptimizedPortfolio) -> Self {
        Self {
            performance: portfolio.performance.into(),
            iterations: portfolio.iterations,
            weights: portfolio.weights,
        }
    }
}

/// Python-exposed minimum-volatility portfolio for one target return.
#[pyclass]
#[derive(Debug, Clone)]
pub struct PyTargetPortfolio {
    #[pyo3(get)]
    pub target_return: f64,
    #[pyo3(get)]
    pub volatility: f64,
    #[pyo3(get)]
    pub iterations: usize,
    weights: Vec<f64>,
}

#[pymethods]
impl PyTargetPortfolio {
    /// Get weights as numpy array.
    fn weights<'py>(&self, py: Python<'py>) -> &'py PyArray1<f64> {
        vec_to_numpy_f64(py, self.weights.clone())
    }

    fn __repr__(&self) -> String {
        format!(
            "TargetPortfolio(target={:.4}, volatility={:.4})",
            self.target_return, self.volatility
        )
    }
}

impl From<TargetPortfolio> for PyTargetPortfolio {
    fn from(portfolio: TargetPortfolio) -> Self {
        Self {
            target_return: portfolio.target_return,
            volatility: portfolio.volatility,
            iterations: portfolio.iterations,
            weights: portfolio.weights,
        }
    }
}

/// Python-exposed Monte Carlo cloud.
#[pyclass]
#[derive(Debug, Clone)]
pub struct PySimulationResult {
    #[pyo3(get)]
    pub degenerate_samples: usize,
    returns: Vec<f64>,
    volatilities: Vec<f64>,
    sharpe_ratios: Vec<f64>,
    max_sharpe_index: Option<usize>,
}

#[pymethods]
impl PySimulationResult {
    fn returns<'py>(&self, py: Python<'py>) -> &'py PyArray1<f64> {
        vec_to_numpy_f64(py, self.returns.clone())
    }

    fn volatilities<'py>(&self, py: Python<'py>) -> &'py PyArray1<f64> {
        vec_to_numpy_f64(py, self.volatilities.clone())
    }

    /// Sharpe ratios; NaN for zero-volatility samples.
    fn sharpe_ratios<'py>(&self, py: Python<'py>) -> &'py PyArray1<f64> {
        vec_to_numpy_f64(py, self.sharpe_ratios.clone())
    }

    /// Index of the best sample, if any sample has a defined Sharpe ratio.
    fn max_sharpe_index(&self) -> Option<usize> {
        self.max_sharpe_index
    }

    fn __len__(&self) -> usize {
        self.returns.len()
    }

    fn __repr__(&self) -> String {
        format!(
            "SimulationResult(samples={}, degenerate={})",
            self.returns.len(),
            self.degenerate_samples
        )
    }
}

// ============================================================================
// Frontier Functions
// ============================================================================

/// Annualized return, volatility and Sharpe ratio of one weight vector.
#[pyfunction]
#[pyo3(signature = (returns, weights, periods_per_year=None))]
pub fn evaluate_portfolio(
    returns: PyReadonlyArray2<f64>,
    weights: PyReadonlyArray1<f64>,
    periods_per_year: Option<f64>,
) -> PyResult<PyPerformance> {
    let stats = statistics_from_numpy(returns, periods_per_year)?;
    let weights = numpy_to_vec_f64(weights);
    Ok(performance::evaluate(&weights, &stats)?.into())
}

/// Random long-only portfolios for plotting the feasible region.
#[pyfunction]
#[pyo3(signature = (returns, n_simulations=10000, seed=42, periods_per_year=None))]
pub fn simulate_portfolios(
    py: Python<'_>,
    returns: PyReadonlyArray2<f64>,
    n_simulations: usize,
    seed: u64,
    periods_per_year: Option<f64>,
) -> PyResult<PySimulationResult> {
    let stats = statistics_from_numpy(returns, periods_per_year)?;
    let config = MonteCarloConfig {
        n_simulations,
        seed,
        ..Default::default()
    };
    let result = py.allow_threads(|| monte_carlo::simulate(&stats, &config));

    Ok(PySimulationResult {
        degenerate_samples: result.degenerate_samples,
        max_sharpe_index: result.max_sharpe_index(),
        returns: result.returns,
        volatilities: result.volatilities,
        sharpe_ratios: result.sharpe_ratios,
    })
}

/// Long-only, fully invested portfolio with the highest Sharpe ratio.
#[pyfunction]
#[pyo3(signature = (returns, periods_per_year=None, max_iterations=5000))]
pub fn max_sharpe_portfolio(
    py: Python<'_>,
    returns: PyReadonlyArray2<f64>,
    periods_per_year: Option<f64>,
    max_iterations: usize,
) -> PyResult<PyOptimizedPortfolio> {
    let stats = statistics_from_numpy(returns, periods_per_year)?;
    let settings = SolverSettings {
        max_iterations,
        ..Default::default()
    };
    let portfolio = py.allow_threads(|| sharpe::maximize_sharpe(&stats, &settings))?;
    Ok(portfolio.into())
}

/// Minimum-volatility portfolio achieving `target_return`.
#[pyfunction]
#[pyo3(signature = (returns, target_return, periods_per_year=None))]
pub fn min_volatility_for_target(
    py: Python<'_>,
    returns: PyReadonlyArray2<f64>,
    target_return: f64,
    periods_per_year: Option<f64>,
) -> PyResult<PyTargetPortfolio> {
    let stats = statistics_from_numpy(returns, periods_per_year)?;
    let settings = SolverSettings::default();
    let portfolio = py.allow_threads(|| {
        frontier::minimize_volatility_for_target(&stats, target_return, &settings)
    })?;
    Ok(portfolio.into())
}

/// Efficient frontier as (target returns, volatilities).
///
/// Without explicit targets, `n_points` returns from zero to the best
/// single-asset return are used. Unreachable targets are left out.
#[pyfunction]
#[pyo3(signature = (returns, targets=None, n_points=100, periods_per_year=None))]
pub fn efficient_frontier<'py>(
    py: Python<'py>,
    returns: PyReadonlyArray2<f64>,
    targets: Option<PyReadonlyArray1<f64>>,
    n_points: usize,
    periods_per_year: Option<f64>,
) -> PyResult<(&'py PyArray1<f64>, &'py PyArray1<f64>)> {
    let stats = statistics_from_numpy(returns, periods_per_year)?;
    let targets = match targets {
        Some(t) => numpy_to_vec_f64(t),
        None => default_targets(&stats, n_points),
    };
    let settings = SolverSettings::default();
    let points = py.allow_threads(|| frontier::compute_frontier(&stats, &targets, &settings));

    let (achieved, volatilities): (Vec<f64>, Vec<f64>) =
        points.into_iter().map(|p| (p.target_return, p.volatility)).unzip();
    Ok((vec_to_numpy_f64(py, achieved), vec_to_numpy_f64(py, volatilities)))
}
