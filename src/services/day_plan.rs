//! A full day of trips on both routes, each with its expected temperature.

use chrono::NaiveDate;

use crate::errors::AppError;
use crate::services::open_meteo::OpenMeteoClient;
use crate::services::temperature::{attach_temperatures, HourlyWeatherPoint};
use crate::services::timetable::{build_timetable, Route, Trip};

/// Both routes' timetables, route by route, with no walking time applied.
///
/// The result is not globally sorted: 339's morning trips follow 108's
/// evening ones.
pub fn base_day_plan() -> Result<Vec<Trip>, AppError> {
    let mut trips = Vec::new();
    for route in Route::ALL {
        trips.extend(build_timetable(route, 0)?);
    }
    Ok(trips)
}

/// Attach temperatures to `base` and return it sorted by boarding time.
///
/// `base` may arrive in any order; the sort is stable so trips boarding at
/// the same minute keep their relative order.
pub fn assemble_day_plan(
    base: Vec<Trip>,
    hourly: &[HourlyWeatherPoint],
) -> Result<Vec<Trip>, AppError> {
    let mut trips = attach_temperatures(base, hourly)?;
    trips.sort_by_key(|t| t.arrival_primary);
    Ok(trips)
}

/// Fetch the hourly series for `date` (today at the weather location when
/// `None`) and assemble that day's plan.
pub async fn build_day_plan_with_weather(
    client: &OpenMeteoClient,
    date: Option<NaiveDate>,
) -> Result<Vec<Trip>, AppError> {
    let base = base_day_plan()?;
    let hourly = client.fetch_hourly_temperatures(date).await?;
    match date {
        Some(date) => tracing::debug!(
            "Assembling day plan for {} from {} trips and {} hourly points",
            date,
            base.len(),
            hourly.len()
        ),
        None => tracing::debug!(
            "Assembling today's day plan from {} trips and {} hourly points",
            base.len(),
            hourly.len()
        ),
    }
    assemble_day_plan(base, &hourly)
}
