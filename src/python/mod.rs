//! Python bindings.

pub mod bindings;
pub mod numpy_bridge;
