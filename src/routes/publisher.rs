//! Publisher status HTTP endpoint.
//!
//! GET /api/publisher/status returns the current state of the background
//! MQTT publisher as JSON.

use axum::extract::State;
use axum::Json;

use crate::services::publisher::{PublisherState, SharedPublisherState};

/// Get the current publisher status.
///
/// Returns per-artifact info (topics, interval, last attempt and success,
/// last result, counters) and whether the broker connection is up.
#[utoipa::path(
    get,
    path = "/api/publisher/status",
    tag = "Publisher",
    responses(
        (status = 200, description = "Current publisher status", body = PublisherState),
    )
)]
pub async fn get_publisher_status(
    State(state): State<SharedPublisherState>,
) -> Json<PublisherState> {
    let s = state.read().await;
    Json(s.clone())
}
