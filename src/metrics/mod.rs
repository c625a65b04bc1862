//! Portfolio performance metrics.

pub mod performance;

pub use performance::{
    evaluate, evaluate_vector, portfolio_return, portfolio_variance, portfolio_volatility,
    sharpe_ratio,
};
