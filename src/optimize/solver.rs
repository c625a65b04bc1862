//! Constrained solver over the feasible weight simplex.
//!
//! Bounds `0 <= w_i <= 1` and the budget constraint `sum(w) = 1` are enforced
//! exactly by Euclidean projection onto the simplex. Additional linear
//! equality constraints `a·w = b` are handled with an augmented Lagrangian
//! outer loop. The inner loop is a spectral projected-gradient method
//! (Barzilai-Borwein step lengths, Armijo backtracking).
//!
//! For nonconvex objectives the result is a local optimum.

use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::error::{FrontierError, Result};
use crate::core::types::{is_feasible, SOLVER_WEIGHT_TOLERANCE};

const ARMIJO: f64 = 1e-4;
const MAX_BACKTRACKS: usize = 100;
const MIN_STEP: f64 = 1e-12;
const MAX_STEP: f64 = 1e8;

/// Smooth objective over weight vectors.
pub trait Objective: Sync {
    /// Objective value. Non-finite values mark points outside the domain.
    fn value(&self, w: &DVector<f64>) -> f64;

    /// Gradient with respect to the weights.
    fn gradient(&self, w: &DVector<f64>) -> DVector<f64>;
}

/// Linear equality constraint `coefficients · w = rhs`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearEquality {
    pub coefficients: DVector<f64>,
    pub rhs: f64,
}

impl LinearEquality {
    pub fn new(coefficients: DVector<f64>, rhs: f64) -> Self {
        Self { coefficients, rhs }
    }

    /// Signed violation at `w`.
    #[inline]
    pub fn residual(&self, w: &DVector<f64>) -> f64 {
        self.coefficients.dot(w) - self.rhs
    }

    /// Magnitude the residual is measured against: `max(1, |rhs|, ||a||_inf)`.
    pub fn scale(&self) -> f64 {
        self.coefficients.amax().max(self.rhs.abs()).max(1.0)
    }
}

/// Termination status of a solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolveStatus {
    /// Stationary and feasible within tolerance.
    Converged,
    /// Iteration limit reached before stationarity.
    MaxIterations,
    /// No step along the projected gradient decreased the objective.
    LineSearchFailed,
    /// Equality constraints still violated when the outer loop ended.
    Infeasible,
    /// Objective or gradient evaluated to a non-finite value.
    NumericalError,
}

/// Solver settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverSettings {
    /// Projected-gradient iterations per inner solve.
    pub max_iterations: usize,
    /// Augmented Lagrangian updates.
    pub max_outer_iterations: usize,
    /// Stationarity tolerance on `||w - P(w - ∇f)||_inf`, relative to
    /// `max(1, ||∇f||_inf)`.
    pub tolerance: f64,
    /// Looser stationarity accepted when the line search stalls on rounding.
    pub stall_tolerance: f64,
    /// Maximum violation of the equality constraints, relative to each
    /// constraint's scale.
    pub feasibility_tolerance: f64,
    pub initial_penalty: f64,
    pub penalty_growth: f64,
    pub max_penalty: f64,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            max_iterations: 5_000,
            max_outer_iterations: 60,
            tolerance: 1e-10,
            stall_tolerance: 1e-6,
            feasibility_tolerance: 1e-8,
            initial_penalty: 10.0,
            penalty_growth: 10.0,
            max_penalty: 1e8,
        }
    }
}

impl SolverSettings {
    /// Reject settings the solver cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 || self.max_outer_iterations == 0 {
            return Err(FrontierError::invalid_input("solver iteration limits must be positive"));
        }
        let positive = [
            ("tolerance", self.tolerance),
            ("stall_tolerance", self.stall_tolerance),
            ("feasibility_tolerance", self.feasibility_tolerance),
            ("initial_penalty", self.initial_penalty),
            ("max_penalty", self.max_penalty),
        ];
        if let Some((name, value)) = positive.iter().find(|(_, v)| !(v.is_finite() && *v > 0.0)) {
            return Err(FrontierError::invalid_input(format!(
                "solver {name} must be positive, got {value}"
            )));
        }
        if !(self.penalty_growth.is_finite() && self.penalty_growth >= 1.0) {
            return Err(FrontierError::invalid_input(format!(
                "solver penalty_growth must be >= 1, got {}",
                self.penalty_growth
            )));
        }
        Ok(())
    }
}

/// Outcome of a solve, returned whether or not it converged.
#[derive(Debug, Clone)]
pub struct SolverReport {
    /// Last iterate. Always on the simplex.
    pub x: DVector<f64>,
    /// Objective value at `x` (without penalty terms).
    pub fun: f64,
    pub status: SolveStatus,
    /// Total projected-gradient iterations.
    pub iterations: usize,
    /// Largest equality residual at `x`, relative to the constraint scale.
    pub max_violation: f64,
    /// Final stationarity measure.
    pub stationarity: f64,
    pub message: String,
}

impl SolverReport {
    /// True when the solve converged.
    #[inline]
    pub fn converged(&self) -> bool {
        self.status == SolveStatus::Converged
    }

    /// Weights of a converged, feasible solve; `OptimizationFailed` with the
    /// last iterate otherwise.
    pub fn checked_weights(&self) -> Result<Vec<f64>> {
        let weights: Vec<f64> = self.x.iter().copied().collect();
        if !self.converged() {
            return Err(FrontierError::optimization_failed(
                self.message.clone(),
                self.iterations,
                weights,
            ));
        }
        if !is_feasible(&weights, SOLVER_WEIGHT_TOLERANCE) {
            return Err(FrontierError::optimization_failed(
                "solver returned weights outside the feasible simplex",
                self.iterations,
                weights,
            ));
        }
        Ok(weights)
    }
}

/// Euclidean projection onto `{w : w_i >= 0, sum(w) = 1}`.
pub fn project_simplex(v: &DVector<f64>) -> DVector<f64> {
    let mut u: Vec<f64> = v.iter().copied().collect();
    u.sort_by(|a, b| b.total_cmp(a));

    let mut cssv = 0.0;
    let mut rho = 0_usize;
    let mut theta = 0.0;
    for (i, ui) in u.iter().enumerate() {
        cssv += *ui;
        let t = (cssv - 1.0) / (i as f64 + 1.0);
        if *ui - t > 0.0 {
            rho = i + 1;
            theta = t;
        }
    }

    if rho == 0 {
        return DVector::from_element(v.len(), 1.0 / v.len() as f64);
    }
    v.map(|x| (x - theta).max(0.0))
}

/// Projected-gradient stationarity measure with unit step.
fn stationarity(x: &DVector<f64>, g: &DVector<f64>) -> f64 {
    (x - project_simplex(&(x - g))).amax()
}

/// `f + Σ λ_k c_k + ρ/2 Σ c_k²`.
struct AugmentedLagrangian<'a, O: ?Sized> {
    objective: &'a O,
    equalities: &'a [LinearEquality],
    multipliers: &'a [f64],
    penalty: f64,
}

impl<O: Objective + ?Sized> Objective for AugmentedLagrangian<'_, O> {
    fn value(&self, w: &DVector<f64>) -> f64 {
        let mut value = self.objective.value(w);
        for (eq, lambda) in self.equalities.iter().zip(self.multipliers) {
            let c = eq.residual(w);
            value += lambda * c + 0.5 * self.penalty * c * c;
        }
        value
    }

    fn gradient(&self, w: &DVector<f64>) -> DVector<f64> {
        let mut grad = self.objective.gradient(w);
        for (eq, lambda) in self.equalities.iter().zip(self.multipliers) {
            let scale = lambda + self.penalty * eq.residual(w);
            grad.axpy(scale, &eq.coefficients, 1.0);
        }
        grad
    }
}

struct InnerOutcome {
    x: DVector<f64>,
    iterations: usize,
    stationarity: f64,
    status: SolveStatus,
}

/// Minimizer over the simplex with optional linear equality constraints.
#[derive(Debug, Clone, Default)]
pub struct SimplexSolver {
    settings: SolverSettings,
}

impl SimplexSolver {
    /// Create a solver with the given settings.
    pub fn new(settings: SolverSettings) -> Self {
        Self { settings }
    }

    /// Solver settings.
    pub fn settings(&self) -> &SolverSettings {
        &self.settings
    }

    /// Minimize `objective` from `x0` (projected onto the simplex first)
    /// subject to `equalities`.
    pub fn minimize<O: Objective + ?Sized>(
        &self,
        objective: &O,
        x0: &DVector<f64>,
        equalities: &[LinearEquality],
    ) -> SolverReport {
        let s = &self.settings;
        let mut x = project_simplex(x0);

        if equalities.is_empty() {
            let inner = self.projected_gradient(objective, x);
            return self.report(
                objective,
                inner.x,
                inner.status,
                inner.iterations,
                0.0,
                inner.stationarity,
            );
        }

        let mut multipliers = vec![0.0; equalities.len()];
        let mut penalty = s.initial_penalty;
        let mut previous_violation = f64::INFINITY;
        let mut iterations = 0;
        let mut last_status = SolveStatus::MaxIterations;
        let mut last_stationarity = f64::INFINITY;
        let mut violation = f64::INFINITY;

        for outer in 0..s.max_outer_iterations {
            let lagrangian = AugmentedLagrangian {
                objective,
                equalities,
                multipliers: &multipliers,
                penalty,
            };
            let inner = self.projected_gradient(&lagrangian, x);
            iterations += inner.iterations;
            x = inner.x;
            last_status = inner.status;
            last_stationarity = inner.stationarity;

            if inner.status == SolveStatus::NumericalError {
                break;
            }

            let residuals: Vec<f64> = equalities.iter().map(|eq| eq.residual(&x)).collect();
            violation = residuals
                .iter()
                .zip(equalities)
                .fold(0.0_f64, |m, (r, eq)| m.max(r.abs() / eq.scale()));
            debug!(
                outer,
                violation,
                penalty,
                inner_iterations = inner.iterations,
                "augmented lagrangian step"
            );

            if violation <= s.feasibility_tolerance && inner.status == SolveStatus::Converged {
                return self.report(
                    objective,
                    x,
                    SolveStatus::Converged,
                    iterations,
                    violation,
                    last_stationarity,
                );
            }

            for (lambda, r) in multipliers.iter_mut().zip(&residuals) {
                *lambda += penalty * r;
            }
            if violation > 0.25 * previous_violation {
                penalty = (penalty * s.penalty_growth).min(s.max_penalty);
            }
            previous_violation = violation;
        }

        let status = match last_status {
            SolveStatus::NumericalError => SolveStatus::NumericalError,
            _ if violation > s.feasibility_tolerance => SolveStatus::Infeasible,
            SolveStatus::Converged => SolveStatus::MaxIterations,
            other => other,
        };
        self.report(objective, x, status, iterations, violation, last_stationarity)
    }

    fn projected_gradient<O: Objective + ?Sized>(
        &self,
        objective: &O,
        mut x: DVector<f64>,
    ) -> InnerOutcome {
        let s = &self.settings;
        let mut fx = objective.value(&x);
        let mut g = objective.gradient(&x);
        if !fx.is_finite() || g.iter().any(|v| !v.is_finite()) {
            return InnerOutcome {
                x,
                iterations: 0,
                stationarity: f64::NAN,
                status: SolveStatus::NumericalError,
            };
        }

        let g_max = g.amax();
        let mut step = if g_max > 0.0 {
            (1.0 / g_max).clamp(MIN_STEP, MAX_STEP)
        } else {
            1.0
        };
        let mut pg = stationarity(&x, &g);
        let mut g_scale = g_max.max(1.0);

        for iteration in 0..s.max_iterations {
            if pg <= s.tolerance * g_scale {
                return InnerOutcome {
                    x,
                    iterations: iteration,
                    stationarity: pg,
                    status: SolveStatus::Converged,
                };
            }

            let mut alpha = step;
            let mut accepted = None;
            for _ in 0..MAX_BACKTRACKS {
                let candidate = project_simplex(&(&x - &g * alpha));
                let decrease = g.dot(&(&candidate - &x));
                let fc = objective.value(&candidate);
                let slack = 16.0 * f64::EPSILON * fx.abs();
                if fc.is_finite() && fc <= fx + ARMIJO * decrease + slack {
                    accepted = Some((candidate, fc));
                    break;
                }
                alpha *= 0.5;
            }

            let Some((x_new, f_new)) = accepted else {
                let status = if pg <= s.stall_tolerance * g_scale {
                    SolveStatus::Converged
                } else {
                    SolveStatus::LineSearchFailed
                };
                return InnerOutcome {
                    x,
                    iterations: iteration,
                    stationarity: pg,
                    status,
                };
            };

            let g_new = objective.gradient(&x_new);
            if g_new.iter().any(|v| !v.is_finite()) {
                return InnerOutcome {
                    x,
                    iterations: iteration,
                    stationarity: pg,
                    status: SolveStatus::NumericalError,
                };
            }

            let sk = &x_new - &x;
            let yk = &g_new - &g;
            let sy = sk.dot(&yk);
            step = if sy > 0.0 {
                (sk.dot(&sk) / sy).clamp(MIN_STEP, MAX_STEP)
            } else {
                (alpha * 2.0).min(MAX_STEP)
            };

            x = x_new;
            fx = f_new;
            g = g_new;
            g_scale = g.amax().max(1.0);
            pg = stationarity(&x, &g);
        }

        let status = if pg <= s.tolerance * g_scale {
            SolveStatus::Converged
        } else {
            SolveStatus::MaxIterations
        };
        InnerOutcome {
            x,
            iterations: s.max_iterations,
            stationarity: pg,
            status,
        }
    }

    fn report<O: Objective + ?Sized>(
        &self,
        objective: &O,
        x: DVector<f64>,
        status: SolveStatus,
        iterations: usize,
        max_violation: f64,
        stationarity: f64,
    ) -> SolverReport {
        let message = match status {
            SolveStatus::Converged => "Optimization terminated successfully".to_string(),
            SolveStatus::MaxIterations => {
                format!("Iteration limit reached (stationarity {stationarity:.3e})")
            }
            SolveStatus::LineSearchFailed => format!(
                "Line search failed to decrease the objective (stationarity {stationarity:.3e})"
            ),
            SolveStatus::Infeasible => {
                format!("Equality constraints violated by {max_violation:.3e}")
            }
            SolveStatus::NumericalError => "Objective or gradient is not finite".to_string(),
        };
        debug!(?status, iterations, max_violation, stationarity, "solve finished");
        SolverReport {
            fun: objective.value(&x),
            x,
            status,
            iterations,
            max_violation,
            stationarity,
            message,
        }
    }
}
