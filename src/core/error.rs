//! Error types for the frontier engine.

use thiserror::Error;

/// Result type alias for frontier operations.
pub type Result<T> = std::result::Result<T, FrontierError>;

/// Error types for the frontier engine.
///
/// Every variant is a recoverable condition: callers branch on it, nothing
/// in the engine aborts the process.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FrontierError {
    /// Malformed input: too few assets or observations, misaligned
    /// dimensions, non-finite statistics or invalid configuration.
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    /// Portfolio volatility is exactly zero, so the Sharpe ratio is undefined.
    #[error("Degenerate (zero) volatility in {context}")]
    DegenerateVolatility { context: String },

    /// The constrained solver did not converge.
    #[error("Optimization failed after {iterations} iterations: {message}")]
    OptimizationFailed {
        message: String,
        iterations: usize,
        /// Last iterate of the solver.
        weights: Vec<f64>,
    },

    /// Target return cannot be reached by a long-only, fully invested portfolio.
    #[error("Target return {target} is infeasible (achievable range [{min_return}, {max_return}])")]
    InfeasibleTarget {
        target: f64,
        min_return: f64,
        max_return: f64,
    },
}

impl FrontierError {
    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create an invalid input error for a dimension mismatch.
    pub fn length_mismatch(what: &str, expected: usize, actual: usize) -> Self {
        Self::InvalidInput {
            message: format!("{what}: expected length {expected}, got {actual}"),
        }
    }

    /// Create an invalid input error for too little data.
    pub fn insufficient_data(what: &str, required: usize, available: usize) -> Self {
        Self::InvalidInput {
            message: format!("{what}: need at least {required}, got {available}"),
        }
    }

    /// Create a degenerate volatility error.
    pub fn degenerate_volatility(context: impl Into<String>) -> Self {
        Self::DegenerateVolatility {
            context: context.into(),
        }
    }

    /// Create an optimization failure carrying the solver's last iterate.
    pub fn optimization_failed(
        message: impl Into<String>,
        iterations: usize,
        weights: Vec<f64>,
    ) -> Self {
        Self::OptimizationFailed {
            message: message.into(),
            iterations,
            weights,
        }
    }

    /// Create an infeasible target error.
    pub fn infeasible_target(target: f64, min_return: f64, max_return: f64) -> Self {
        Self::InfeasibleTarget {
            target,
            min_return,
            max_return,
        }
    }

    /// True for `InvalidInput`.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidInput { .. })
    }

    /// True for `InfeasibleTarget`.
    pub fn is_infeasible_target(&self) -> bool {
        matches!(self, Self::InfeasibleTarget { .. })
    }
}

#[cfg(feature = "python")]
impl From<FrontierError> for pyo3::PyErr {
    fn from(err: FrontierError) -> pyo3::PyErr {
        pyo3::exceptions::PyValueError::new_err(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = FrontierError::length_mismatch("weights", 3, 2);
        assert!(err.is_invalid_input());
        assert_eq!(
            err.to_string(),
            "Invalid input: weights: expected length 3, got 2"
        );

        let err = FrontierError::infeasible_target(0.5, 0.1, 0.2);
        assert!(err.is_infeasible_target());
        assert!(err.to_string().contains("0.5"));
    }
}
