use super::response::HealthStatus;
use axum::Json;

/// Liveness probe. Does not touch the identity service.
pub async fn health_check() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "healthy".to_string(),
    })
}
