pub mod day_plan;
pub mod health;
pub mod publisher;
pub mod timetable;
pub mod walk;

use crate::services::open_meteo::OpenMeteoClient;

/// Shared state for the on-demand endpoints. Holds no computed values:
/// every request fetches and computes from scratch.
#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) weather: OpenMeteoClient,
}
