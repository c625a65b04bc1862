// Suppress warning from PyO3 macro expansion (fixed in newer PyO3 versions)
#![allow(non_local_definitions)]

//! Mean-variance efficient frontier engine.
//!
//! This crate provides:
//! - Sample statistics of aligned return series
//! - Portfolio performance metrics (annualized return, volatility, Sharpe)
//! - Monte Carlo sampling of long-only portfolios
//! - Maximum-Sharpe and minimum-volatility optimization on the simplex
//! - Efficient frontier tracing over a grid of target returns
//!
//! Python bindings are available behind the `python` feature.

pub mod core;
pub mod metrics;
pub mod optimize;
pub mod portfolio;
#[cfg(feature = "python")]
pub mod python;

pub use crate::core::{FrontierError, Result};

#[cfg(feature = "python")]
use pyo3::prelude::*;

/// Python module entry point
#[cfg(feature = "python")]
#[pymodule]
fn _efficient_frontier(_py: Python<'_>, m: &PyModule) -> PyResult<()> {
    // Register result classes
    m.add_class::<python::bindings::PyPerformance>()?;
    m.add_class::<python::bindings::PyOptimizedPortfolio>()?;
    m.add_class::<python::bindings::PyTargetPortfolio>()?;
    m.add_class::<python::bindings::PySimulationResult>()?;

    // Register frontier functions
    m.add_function(wrap_pyfunction!(python::bindings::evaluate_portfolio, m)?)?;
    m.add_function(wrap_pyfunction!(python::bindings::simulate_portfolios, m)?)?;
    m.add_function(wrap_pyfunction!(python::bindings::max_sharpe_portfolio, m)?)?;
    m.add_function(wrap_pyfunction!(python::bindings::min_volatility_for_target, m)?)?;
    m.add_function(wrap_pyfunction!(python::bindings::efficient_frontier, m)?)?;

    Ok(())
}
