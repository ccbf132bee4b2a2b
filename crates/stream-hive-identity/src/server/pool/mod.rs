//! Connection pool lifecycle.
//!
//! - [`manager`] - pool construction, occupancy and shutdown.
//! - [`health`] - periodic health-check task.

pub mod health;
pub mod manager;

pub use manager::ConnectionPool;
