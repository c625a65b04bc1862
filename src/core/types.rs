//! Core data types for the frontier engine.

use serde::{Deserialize, Serialize};

use super::error::{FrontierError, Result};

/// Tolerance on the weight-sum constraint for inputs and sampled portfolios.
pub const WEIGHT_TOLERANCE: f64 = 1e-8;

/// Tolerance on the weight-sum constraint for solver output.
pub const SOLVER_WEIGHT_TOLERANCE: f64 = 1e-6;

/// Ordered set of asset identifiers, fixed for the lifetime of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetUniverse {
    tickers: Vec<String>,
}

impl AssetUniverse {
    /// Create a universe of at least two unique, non-empty identifiers.
    pub fn new<I, S>(tickers: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tickers: Vec<String> = tickers.into_iter().map(Into::into).collect();
        if tickers.len() < 2 {
            return Err(FrontierError::insufficient_data("asset universe", 2, tickers.len()));
        }
        for (i, ticker) in tickers.iter().enumerate() {
            if ticker.trim().is_empty() {
                return Err(FrontierError::invalid_input(format!(
                    "asset identifier at position {i} is empty"
                )));
            }
            if tickers[..i].contains(ticker) {
                return Err(FrontierError::invalid_input(format!(
                    "duplicate asset identifier '{ticker}'"
                )));
            }
        }
        Ok(Self { tickers })
    }

    /// Number of assets.
    #[inline]
    pub fn len(&self) -> usize {
        self.tickers.len()
    }

    /// Check if empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tickers.is_empty()
    }

    /// Asset identifiers in column order.
    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    /// Column index of an identifier.
    pub fn index_of(&self, ticker: &str) -> Option<usize> {
        self.tickers.iter().position(|t| t == ticker)
    }
}

/// How periodic returns are derived from prices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReturnKind {
    /// Percent change: p_t / p_{t-1} - 1.
    #[default]
    Simple,
    /// Log return: ln(p_t / p_{t-1}).
    Log,
}

/// Scaling applied to per-period mean and covariance.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum Annualization {
    /// Scale by the number of observations in the sample.
    #[default]
    SampleSize,
    /// Scale by a calendar constant (e.g. 252 trading days).
    PeriodsPerYear(f64),
}

/// Annualized performance of one weight vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceResult {
    pub annualized_return: f64,
    pub annualized_volatility: f64,
    pub sharpe_ratio: f64,
}

/// One point of the efficient frontier curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrontierPoint {
    pub target_return: f64,
    pub volatility: f64,
}

/// Optimal weights together with their performance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizedPortfolio {
    pub weights: Vec<f64>,
    pub performance: PerformanceResult,
    /// Solver iterations spent.
    pub iterations: usize,
}

/// Minimum-volatility portfolio for a fixed target return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetPortfolio {
    pub target_return: f64,
    pub weights: Vec<f64>,
    pub volatility: f64,
    pub iterations: usize,
}

impl TargetPortfolio {
    /// The frontier point this solve produced.
    pub fn point(&self) -> FrontierPoint {
        FrontierPoint {
            target_return: self.target_return,
            volatility: self.volatility,
        }
    }
}

/// Ticker-labelled allocation handed to display collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationReport {
    /// (ticker, weight) in universe order.
    pub allocations: Vec<(String, f64)>,
    pub performance: PerformanceResult,
}

impl AllocationReport {
    /// Weight of a single ticker.
    pub fn weight_of(&self, ticker: &str) -> Option<f64> {
        self.allocations
            .iter()
            .find(|(t, _)| t == ticker)
            .map(|(_, w)| *w)
    }
}

/// Equal weights, 1/N each.
pub fn equal_weights(n: usize) -> Vec<f64> {
    if n == 0 {
        return Vec::new();
    }
    vec![1.0 / n as f64; n]
}

/// Check the feasibility invariant: every weight in [0, 1] and the sum
/// within `tolerance` of one.
pub fn is_feasible(weights: &[f64], tolerance: f64) -> bool {
    if weights.is_empty() {
        return false;
    }
    let in_bounds = weights
        .iter()
        .all(|&w| w.is_finite() && w >= -tolerance && w <= 1.0 + tolerance);
    let sum: f64 = weights.iter().sum();
    in_bounds && (sum - 1.0).abs() <= tolerance
}
