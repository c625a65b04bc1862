//! Portfolio-level workflows: random sampling and analysis sessions.

pub mod monte_carlo;
pub mod session;

pub use monte_carlo::{simulate, MonteCarloConfig, SimulationResult};
pub use session::{FrontierConfig, FrontierSession};
