//! Timetable HTTP endpoint.
//!
//! - GET /api/timetable/:route

use axum::extract::{Path, State};
use axum::Json;

use super::AppState;
use crate::errors::{AppError, ErrorResponse};
use crate::services::timetable::{current_timetable, Route, Trip};

/// Get the full day's timetable for a route, with the trip to catch after
/// class marked as recommended.
///
/// Recomputed from the current weather on every request.
#[utoipa::path(
    get,
    path = "/api/timetable/{route}",
    tag = "Timetable",
    params(
        ("route" = String, Path, description = "Route number: 108 or 339"),
    ),
    responses(
        (status = 200, description = "All trips of the day, ascending by boarding time", body = [Trip]),
        (status = 404, description = "Unknown route", body = ErrorResponse),
        (status = 502, description = "Weather provider unavailable", body = ErrorResponse),
    )
)]
pub async fn get_timetable(
    State(state): State<AppState>,
    Path(route): Path<String>,
) -> Result<Json<Vec<Trip>>, AppError> {
    let route = Route::from_code(&route)
        .ok_or_else(|| AppError::NotFound(format!("Route {} is not served", route)))?;

    let trips = current_timetable(&state.weather, route).await?;
    Ok(Json(trips))
}
