pub mod auth;
pub mod health;
pub mod response;

use crate::state::AppState;
use axum::Router;
use axum::http::header::{AUTHORIZATION, CACHE_CONTROL, CONTENT_TYPE, EXPIRES, PRAGMA};
use axum::http::{HeaderName, HeaderValue, Method};
use axum::routing::{get, post};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;

/// Builds the gateway's HTTP surface:
///
/// - `POST /api/v1/auth/sign-up`
/// - `POST /api/v1/auth/login`
/// - `GET  /api/v1/health-check`
///
/// Every `/api` response is marked uncacheable; all responses get permissive
/// CORS headers and gzip compression when the client accepts it.
pub fn router(state: AppState) -> Router {
    let v1 = Router::new()
        .route("/auth/sign-up", post(auth::sign_up))
        .route("/auth/login", post(auth::login))
        .route("/health-check", get(health::health_check));

    let api = Router::new()
        .nest("/v1", v1)
        .layer(SetResponseHeaderLayer::overriding(
            CACHE_CONTROL,
            HeaderValue::from_static("no-cache, no-store, must-revalidate, proxy-revalidate"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            PRAGMA,
            HeaderValue::from_static("no-cache"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            EXPIRES,
            HeaderValue::from_static("0"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("surrogate-control"),
            HeaderValue::from_static("no-store"),
        ));

    Router::new()
        .nest("/api", api)
        .layer(CompressionLayer::new())
        .layer(cors())
        .with_state(state)
}

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_methods([
            Method::POST,
            Method::GET,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
}
