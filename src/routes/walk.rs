//! Walking-time HTTP endpoints.
//!
//! - GET /api/current-walk
//! - GET /api/walk-history?days=N

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use utoipa::IntoParams;

use super::AppState;
use crate::errors::{AppError, ErrorResponse};
use crate::services::walk_model::{WalkHistory, WeatherSample};

/// Days of history returned when `days` is omitted.
const DEFAULT_HISTORY_DAYS: u32 = 30;

/// Open-Meteo serves at most 92 past days.
const MAX_HISTORY_DAYS: u32 = 92;

#[derive(Debug, Deserialize, IntoParams)]
pub struct WalkHistoryQuery {
    /// Number of past days (1–92, default 30)
    pub days: Option<u32>,
}

/// Get the current weather and the walking time it implies.
#[utoipa::path(
    get,
    path = "/api/current-walk",
    tag = "Walk",
    responses(
        (status = 200, description = "Current conditions and walking time", body = WeatherSample),
        (status = 502, description = "Weather provider unavailable", body = ErrorResponse),
    )
)]
pub async fn get_current_walk(
    State(state): State<AppState>,
) -> Result<Json<WeatherSample>, AppError> {
    Ok(Json(state.weather.fetch_current_walk().await?))
}

/// Get the daily walking time over the last N days.
#[utoipa::path(
    get,
    path = "/api/walk-history",
    tag = "Walk",
    params(WalkHistoryQuery),
    responses(
        (status = 200, description = "Daily average conditions and walking time", body = WalkHistory),
        (status = 400, description = "days out of range", body = ErrorResponse),
        (status = 502, description = "Weather provider unavailable", body = ErrorResponse),
    )
)]
pub async fn get_walk_history(
    State(state): State<AppState>,
    Query(params): Query<WalkHistoryQuery>,
) -> Result<Json<WalkHistory>, AppError> {
    let days = params.days.unwrap_or(DEFAULT_HISTORY_DAYS);
    if days == 0 || days > MAX_HISTORY_DAYS {
        return Err(AppError::BadRequest(format!(
            "days must be between 1 and {}",
            MAX_HISTORY_DAYS
        )));
    }

    Ok(Json(state.weather.fetch_walk_history(days).await?))
}
