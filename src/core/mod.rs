//! Core types and utilities for the frontier engine.

pub mod error;
pub mod returns;
pub mod statistics;
pub mod types;

pub use error::{FrontierError, Result};
pub use returns::ReturnMatrix;
pub use statistics::ReturnStatistics;
pub use types::*;
