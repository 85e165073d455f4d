//! Day plan HTTP endpoint.
//!
//! - GET /api/day-plan?date=YYYY-MM-DD

use axum::extract::{Query, State};
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::IntoParams;

use super::AppState;
use crate::errors::{AppError, ErrorResponse};
use crate::services::day_plan::build_day_plan_with_weather;
use crate::services::timetable::Trip;

#[derive(Debug, Deserialize, IntoParams)]
pub struct DayPlanQuery {
    /// Calendar date (YYYY-MM-DD); defaults to today at the weather location
    pub date: Option<String>,
}

/// Get every trip of both routes for a date, each with the temperature
/// expected at its boarding time.
#[utoipa::path(
    get,
    path = "/api/day-plan",
    tag = "Timetable",
    params(DayPlanQuery),
    responses(
        (status = 200, description = "Both routes' trips, ascending by boarding time", body = [Trip]),
        (status = 400, description = "Invalid date", body = ErrorResponse),
        (status = 502, description = "Weather provider unavailable or returned no data", body = ErrorResponse),
    )
)]
pub async fn get_day_plan(
    State(state): State<AppState>,
    Query(params): Query<DayPlanQuery>,
) -> Result<Json<Vec<Trip>>, AppError> {
    let date = params
        .date
        .as_deref()
        .map(|raw| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map_err(|e| AppError::BadRequest(format!("Invalid date '{}': {}", raw, e)))
        })
        .transpose()?;

    let plan = build_day_plan_with_weather(&state.weather, date).await?;
    Ok(Json(plan))
}
