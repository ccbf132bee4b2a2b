//! gRPC service implementation for the identity data-access boundary.
//!
//! ## Structure
//!
//! - [`handler`] - gRPC service entry point (`UserDataService`).

pub mod handler;

pub use handler::UserDataService;
