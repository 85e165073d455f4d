use axum::extract::State;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::services::publisher::SharedPublisherState;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status ("ok" when the broker is connected, "degraded" otherwise)
    pub status: String,
    /// API version
    pub version: String,
    /// Whether the MQTT broker connection is up
    pub broker_connected: bool,
}

/// Health check endpoint.
///
/// Returns the API status and version. Returns status "degraded" (still 200)
/// while the broker is unreachable: the HTTP endpoints keep working, only
/// scheduled publication is paused.
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse),
    )
)]
pub async fn health_check(State(state): State<SharedPublisherState>) -> Json<HealthResponse> {
    let connected = state.read().await.connected;

    Json(HealthResponse {
        status: if connected {
            "ok".to_string()
        } else {
            "degraded".to_string()
        },
        version: env!("CARGO_PKG_VERSION").to_string(),
        broker_connected: connected,
    })
}
