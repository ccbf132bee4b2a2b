#![doc = include_str!("../README.md")]

mod common;
pub use common::*;

#[cfg(feature = "telemetry")]
pub mod telemetry;

/// Generated protobuf messages and tonic client/server bindings for the
/// identity service.
pub mod proto {
    tonic::include_proto!("identity");

    /// Encoded file descriptor set used to serve gRPC reflection.
    pub const FILE_DESCRIPTOR_SET: &[u8] =
        tonic::include_file_descriptor_set!("identity_descriptor");
}
