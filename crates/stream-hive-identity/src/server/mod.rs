//! Identity data-access server.
//!
//! - [`config`] - CLI/environment configuration.
//! - [`pool`] - bounded connection pool and its health check.
//! - [`store`] - credential store queries.
//! - [`service`] - the gRPC service translating RPCs into store calls.

pub mod config;
pub mod pool;
pub mod service;
pub mod store;
