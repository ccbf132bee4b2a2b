//! HTTP error mapping.
//!
//! This is the only place internal failures become status codes:
//!
//! | Variant              | Status | Message                                   |
//! |----------------------|--------|-------------------------------------------|
//! | `Validation`         | 400    | decoder message                           |
//! | `InvalidCredentials` | 401    | `Invalid credentials`                     |
//! | `Downstream`         | 500    | identity service message                  |
//! | `Signing`            | 500    | key or signing failure                    |
//! | `Hashing`            | 500    | generic                                   |
//! | `Timeout`            | 500    | generic                                   |
//!
//! Unknown email and wrong password both map to `InvalidCredentials`, so the
//! two are indistinguishable to the caller.

use crate::api::response::Envelope;
use crate::password::PasswordError;
use crate::token::TokenError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tonic::{Code, Status};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Unexpected error occurred while getting JSON request: {0}")]
    Validation(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Unexpected error occurred while {context}: {}", status.message())]
    Downstream {
        context: &'static str,
        status: Status,
    },

    #[error("Unexpected error occurred while creating tokens: {0}")]
    Signing(#[from] TokenError),

    #[error("Unexpected error occurred while hashing password")]
    Hashing(#[from] PasswordError),

    #[error("Request timed out")]
    Timeout,
}

impl ApiError {
    /// Maps an identity RPC failure. Deadline and cancellation statuses are
    /// the request timeout observed on the far side of the boundary.
    pub fn downstream(context: &'static str, status: Status) -> Self {
        match status.code() {
            Code::DeadlineExceeded | Code::Cancelled => Self::Timeout,
            _ => Self::Downstream { context, status },
        }
    }

    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::Downstream { .. } | Self::Signing(_) | Self::Hashing(_) | Self::Timeout => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let http_status = self.status_code();
        match &self {
            Self::Downstream { status, .. } => {
                tracing::error!(code = ?status.code(), "Identity service error: {self}");
            }
            Self::Signing(e) => tracing::error!("Token signing error: {e}"),
            Self::Hashing(e) => tracing::error!("Password hashing error: {e}"),
            Self::Timeout => tracing::warn!("Request exceeded its deadline"),
            Self::Validation(_) | Self::InvalidCredentials => {
                tracing::debug!("Rejected request: {self}");
            }
        }

        (http_status, Json(Envelope::<()>::failure(self.to_string()))).into_response()
    }
}
