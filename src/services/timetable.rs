//! Static timetables for routes 108 and 339 and the recommended-trip choice.
//!
//! Both routes are boarded at London Aquatics Centre after a class that ends
//! at 13:00. The recommended trip is the first one the rider can still reach
//! once the current walking time is added to 13:00.
//!
//! - Route 108's schedule is published for Stratford City Bus Station; the
//!   bus reaches London Aquatics Centre 2 minutes earlier.
//! - Route 339's schedule is published for London Aquatics Centre; the bus
//!   reaches Stratford City 2 minutes later.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::errors::AppError;
use crate::services::open_meteo::OpenMeteoClient;
use crate::services::time_codec::{hhmm, to_minutes, wrap_minutes};

/// Class end, the reference event every recommendation is anchored to.
pub const CLASS_END_MINUTES: i32 = 13 * 60;

/// Route 108 arrivals at Stratford City Bus Station.
const ROUTE_108_AT_STRATFORD: &[&str] = &[
    "00:02", "00:17", "00:32", "00:47", "01:02", "01:17", "01:32", "01:47", //
    "06:22", "06:37", "06:52", "07:07", "07:22", "07:37", "07:52", //
    "08:07", "08:22", "08:37", "08:52", "09:07", "09:22", "09:37", "09:52", //
    "10:07", "10:22", "10:37", "10:52", "11:07", "11:22", "11:37", "11:52", //
    "12:07", "12:22", "12:37", "12:52", "13:08", "13:22", "13:37", "13:52", //
    "14:07", "14:22", "14:37", "14:52", "15:07", "15:22", "15:37", "15:52", //
    "16:07", "16:22", "16:37", "16:52", "17:07", "17:22", "17:37", "17:52", //
    "18:07", "18:22", "18:37", "18:52", "19:07", "19:22", "19:37", "19:52", //
    "20:07", "20:22", "20:37", "20:52", "21:07", "21:22", "21:37", "21:52", //
    "22:07", "22:22", "22:37", "22:52", "23:07", "23:22", "23:47",
];

/// Route 339 arrivals at London Aquatics Centre.
const ROUTE_339_AT_AQUATICS: &[&str] = &[
    "07:42", "08:01", "08:22", "09:02", "09:23", "09:43", //
    "10:02", "10:21", "10:41", "11:01", "11:21", //
    "12:01", "12:21", "12:41", "13:06", "13:21", "13:41", //
    "14:01", "14:21", "14:41", "15:01", "15:21", "15:41", //
    "16:01", "16:21", "16:41", "17:01", "17:21", "17:41", //
    "18:01", "18:21", "18:41", "19:01", "19:21", "19:41", //
    "20:01", "20:21", "20:41", "21:01", "21:21", "21:41", //
    "22:01", "22:21", "22:39",
];

/// A bus route served from the boarding stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Route {
    #[serde(rename = "108")]
    Route108,
    #[serde(rename = "339")]
    Route339,
}

impl Route {
    pub const ALL: [Route; 2] = [Route::Route108, Route::Route339];

    /// Route number as shown on the bus.
    pub fn code(self) -> &'static str {
        match self {
            Route::Route108 => "108",
            Route::Route339 => "339",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Route::ALL.into_iter().find(|r| r.code() == code)
    }

    /// The hardcoded schedule at this route's reference stop.
    fn reference_times(self) -> &'static [&'static str] {
        match self {
            Route::Route108 => ROUTE_108_AT_STRATFORD,
            Route::Route339 => ROUTE_339_AT_AQUATICS,
        }
    }

    /// `(boarding, secondary)` offsets from the reference stop, in minutes.
    fn stop_offsets(self) -> (i32, i32) {
        match self {
            // reference = Stratford City; Aquatics is reached 2 min before
            Route::Route108 => (-2, 0),
            // reference = Aquatics; Stratford City is reached 2 min after
            Route::Route339 => (0, 2),
        }
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// One scheduled bus arrival.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Trip {
    /// Route number ("108" or "339")
    pub route: Route,
    /// Arrival at the boarding stop (London Aquatics Centre), HH:MM
    #[serde(with = "hhmm")]
    #[schema(value_type = String, example = "13:06")]
    pub arrival_primary: i32,
    /// Arrival at Stratford City Bus Station, HH:MM
    #[serde(with = "hhmm")]
    #[schema(value_type = String, example = "13:08")]
    pub arrival_secondary: i32,
    /// Whether this is the trip to catch after class
    pub recommended: bool,
    /// Nearest-hour air temperature in Celsius (day plan only)
    #[serde(
        rename = "temperatureC",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub temperature_c: Option<f64>,
}

/// Build the full day's timetable for a route, marking the trip to catch
/// for a given walking time in whole minutes.
///
/// Trips are returned ascending by boarding-stop arrival.
pub fn build_timetable(route: Route, walk_minutes: i32) -> Result<Vec<Trip>, AppError> {
    let (boarding_offset, secondary_offset) = route.stop_offsets();

    let mut trips = route
        .reference_times()
        .iter()
        .map(|t| {
            let reference = to_minutes(t)?;
            Ok(Trip {
                route,
                arrival_primary: wrap_minutes(reference + boarding_offset),
                arrival_secondary: wrap_minutes(reference + secondary_offset),
                recommended: false,
                temperature_c: None,
            })
        })
        .collect::<Result<Vec<_>, AppError>>()?;

    trips.sort_by_key(|t| t.arrival_primary);

    let boarding: Vec<i32> = trips.iter().map(|t| t.arrival_primary).collect();
    match choose_recommended_index(&boarding, walk_minutes) {
        Some(idx) => trips[idx].recommended = true,
        None => tracing::debug!(
            "No route {} trip left after {} (walk {} min)",
            route,
            crate::services::time_codec::from_minutes(CLASS_END_MINUTES),
            walk_minutes
        ),
    }

    Ok(trips)
}

/// Pick the trip to catch, given boarding times in minutes since midnight.
///
/// 1. The trip with the smallest non-negative gap after `13:00 + walk`;
///    the earliest trip wins ties.
/// 2. Otherwise, the earliest trip at or after 13:00, ignoring the walk.
/// 3. Otherwise nothing: there is no service left after class.
pub fn choose_recommended_index(boarding_minutes: &[i32], walk_minutes: i32) -> Option<usize> {
    let target = CLASS_END_MINUTES + walk_minutes;

    let reachable = boarding_minutes
        .iter()
        .enumerate()
        .filter(|&(_, &m)| m >= target)
        .min_by_key(|&(idx, &m)| (m - target, m, idx))
        .map(|(idx, _)| idx);

    reachable.or_else(|| {
        boarding_minutes
            .iter()
            .enumerate()
            .filter(|&(_, &m)| m >= CLASS_END_MINUTES)
            .min_by_key(|&(idx, &m)| (m, idx))
            .map(|(idx, _)| idx)
    })
}

/// The single recommended trip of a timetable, if any.
pub fn best_trip(trips: &[Trip]) -> Option<&Trip> {
    trips.iter().find(|t| t.recommended)
}

/// Fetch the current weather and build a route's timetable from it.
pub async fn current_timetable(
    client: &OpenMeteoClient,
    route: Route,
) -> Result<Vec<Trip>, AppError> {
    let sample = client.fetch_current_walk().await?;
    let walk_minutes = sample.estimate().whole_minutes();
    tracing::debug!(
        "Building route {} timetable with walk {} min ({}s)",
        route,
        walk_minutes,
        sample.walking_time_seconds
    );
    build_timetable(route, walk_minutes)
}
