//! Constrained portfolio optimization on the long-only simplex.

pub mod frontier;
pub mod sharpe;
pub mod solver;

pub use frontier::{
    compute_frontier, default_targets, linspace, minimize_volatility,
    minimize_volatility_for_target, solve_frontier, PortfolioVariance,
};
pub use sharpe::{maximize_sharpe, NegativeSharpe};
pub use solver::{
    project_simplex, LinearEquality, Objective, SimplexSolver, SolveStatus, SolverReport,
    SolverSettings,
};
