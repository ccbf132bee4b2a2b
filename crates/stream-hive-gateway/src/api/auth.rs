//! Sign-up and login.
//!
//! Both flows run under one server-side deadline (see
//! [`crate::config::REQUEST_TIMEOUT`]). The deadline is forwarded to the
//! identity service, and once it passes the flow future is dropped, so no
//! later stage (insert, signing) is started.
//!
//! Sign-up: decode, hash, insert, sign. The user row is written before any
//! token is signed; if signing then fails the row stays and the caller gets a
//! 500.
//!
//! Login: decode, fetch by email, verify, sign. Unknown email and wrong
//! password produce the same 401 after the same bcrypt work.
//!
//! Sign-up refuses passwords longer than bcrypt's 72-byte input.

use super::response::{ApiJson, AuthData, Envelope, LoginResult, SignUpResult};
use crate::error::ApiError;
use crate::password;
use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use serde::Deserialize;
use tokio::time::{Instant, timeout_at};

#[derive(Deserialize)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub full_name: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

fn require(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::Validation(format!("`{field}` must not be empty")));
    }
    Ok(())
}

fn require_hashable(password: &str) -> Result<(), ApiError> {
    if password.len() > password::MAX_PASSWORD_BYTES {
        return Err(ApiError::Validation(format!(
            "`password` must be at most {} bytes",
            password::MAX_PASSWORD_BYTES
        )));
    }
    Ok(())
}

#[tracing::instrument(skip_all)]
pub async fn sign_up(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<SignUpRequest>,
) -> Result<Json<Envelope<SignUpResult>>, ApiError> {
    require("email", &req.email)?;
    require("password", &req.password)?;
    require_hashable(&req.password)?;

    let deadline = Instant::now() + state.request_timeout;
    let data = timeout_at(deadline, sign_up_flow(&state, req, deadline))
        .await
        .map_err(|_| ApiError::Timeout)??;

    Ok(Json(Envelope::ok(data)))
}

async fn sign_up_flow(
    state: &AppState,
    req: SignUpRequest,
    deadline: Instant,
) -> Result<SignUpResult, ApiError> {
    let password_hash = password::hash_password(req.password, state.hash_cost).await?;

    let user = state
        .users
        .insert_user(&req.email, password_hash, &req.full_name, deadline)
        .await
        .map_err(|status| ApiError::downstream("inserting user", status))?;
    tracing::info!(user_id = user.id, "User signed up");

    let tokens = state.tokens.issue(&user).await?;
    Ok(AuthData::new(&user, tokens))
}

#[tracing::instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Json<Envelope<LoginResult>>, ApiError> {
    require("email", &req.email)?;
    require("password", &req.password)?;

    let deadline = Instant::now() + state.request_timeout;
    let data = timeout_at(deadline, login_flow(&state, req, deadline))
        .await
        .map_err(|_| ApiError::Timeout)??;

    Ok(Json(Envelope::ok(data)))
}

async fn login_flow(
    state: &AppState,
    req: LoginRequest,
    deadline: Instant,
) -> Result<LoginResult, ApiError> {
    let user = state
        .users
        .get_user_by_email(&req.email, deadline)
        .await
        .map_err(|status| ApiError::downstream("getting user", status))?;

    let Some(user) = user else {
        // Same bcrypt work as a wrong password, so response time does not
        // reveal whether the account exists.
        let decoy = state.decoy_hash().await?;
        password::verify_password(req.password, decoy).await?;
        return Err(ApiError::InvalidCredentials);
    };

    if !password::verify_password(req.password, user.password_hash.clone()).await? {
        return Err(ApiError::InvalidCredentials);
    }
    tracing::info!(user_id = user.id, "User logged in");

    let tokens = state.tokens.issue(&user).await?;
    Ok(AuthData::new(&user, tokens))
}
