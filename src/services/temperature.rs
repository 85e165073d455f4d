//! Attach the nearest-hour temperature to each trip of a day.

use crate::errors::AppError;
use crate::services::timetable::Trip;

/// One reading of a date's hourly temperature series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HourlyWeatherPoint {
    /// Local time of day, minutes since midnight.
    pub minutes: i32,
    pub temperature_c: f64,
}

/// The temperature of the point closest to `minutes`.
///
/// The earliest point wins when two are equally close, e.g. a 13:30 trip
/// between 13:00 and 14:00 readings gets the 13:00 temperature.
pub fn nearest_temperature(minutes: i32, hourly: &[HourlyWeatherPoint]) -> Option<f64> {
    hourly
        .iter()
        .enumerate()
        .min_by_key(|&(idx, p)| ((minutes - p.minutes).unsigned_abs(), idx))
        .map(|(_, p)| p.temperature_c)
}

/// Set `temperature_c` on every trip from the hourly series of its date.
pub fn attach_temperatures(
    trips: Vec<Trip>,
    hourly: &[HourlyWeatherPoint],
) -> Result<Vec<Trip>, AppError> {
    if hourly.is_empty() {
        return Err(AppError::NoWeatherData(
            "cannot attach temperatures without hourly data".to_string(),
        ));
    }

    Ok(trips
        .into_iter()
        .map(|trip| Trip {
            temperature_c: nearest_temperature(trip.arrival_primary, hourly),
            ..trip
        })
        .collect())
}
