//! Error types for the identity data-access service.
//!
//! This module defines the central `Error` enum returned by the identity RPC
//! handlers. It implements `From<Error>` for `tonic::Status` so that every
//! failure crosses the process boundary with a stable status code and the
//! underlying message.
//!
//! "No such user" is absent from this enum: lookups that match
//! no row succeed with an empty reply.
//!
//! ## Error Cases
//! - `Store`: The relational store failed (connection, query, decode).
//! - `DuplicateEmail`: An insert violated the unique constraint on `email`.
//! - `ServiceShutdown`: A request arrived while the service was draining.

use tonic::Status;

/// Unified error type for the identity service.
#[derive(Clone, thiserror::Error, Debug, PartialEq, Eq)]
pub enum Error {
    /// The credential store reported a fault.
    #[error("Store error: {context}")]
    Store { context: String },

    /// A user with this email already exists.
    #[error("User with email {email} already exists")]
    DuplicateEmail { email: String },

    /// The service is in the process of shutting down.
    #[error("Service is shutting down")]
    ServiceShutdown,
}

impl From<Error> for Status {
    fn from(err: Error) -> Self {
        match err {
            Error::Store { context } => Status::internal(format!("Store error: {context}")),
            Error::DuplicateEmail { email } => {
                Status::already_exists(format!("User with email {email} already exists"))
            }
            Error::ServiceShutdown => Status::unavailable("Service is shutting down"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tonic::Code;

    #[test]
    fn store_errors_carry_the_underlying_message() {
        let status: Status = Error::Store {
            context: "connection refused".to_string(),
        }
        .into();
        assert_eq!(status.code(), Code::Internal);
        assert!(status.message().contains("connection refused"));
    }

    #[test]
    fn duplicate_email_maps_to_already_exists() {
        let status: Status = Error::DuplicateEmail {
            email: "a@x.com".to_string(),
        }
        .into();
        assert_eq!(status.code(), Code::AlreadyExists);
        assert!(status.message().contains("a@x.com"));
    }

    #[test]
    fn shutdown_maps_to_unavailable() {
        assert_eq!(Status::from(Error::ServiceShutdown).code(), Code::Unavailable);
    }
}
