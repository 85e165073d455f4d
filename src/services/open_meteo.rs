//! Open-Meteo forecast API client.
//!
//! Three views of the same endpoint are used: current conditions, the hourly
//! temperature series for one date, and the daily mean series for the last
//! N days. See: https://open-meteo.com/en/docs

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use serde::Deserialize;
use std::time::Duration;

use crate::errors::AppError;
use crate::services::temperature::HourlyWeatherPoint;
use crate::services::walk_model::{DailyWalkRecord, WalkHistory, WeatherSample};

/// Where and how to ask Open-Meteo.
#[derive(Debug, Clone)]
pub struct WeatherLocation {
    pub latitude: f64,
    pub longitude: f64,
    /// IANA timezone the provider should report local times in.
    pub timezone: String,
}

/// Client for the Open-Meteo forecast API.
#[derive(Debug, Clone)]
pub struct OpenMeteoClient {
    client: reqwest::Client,
    base_url: String,
    location: WeatherLocation,
}

// --- Open-Meteo JSON response types ---

#[derive(Debug, Deserialize)]
struct CurrentResponse {
    current_weather: CurrentWeather,
}

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    temperature: f64,
    weathercode: i32,
}

#[derive(Debug, Deserialize)]
struct HourlyResponse {
    hourly: HourlySeries,
}

#[derive(Debug, Deserialize)]
struct HourlySeries {
    time: Vec<String>,
    temperature_2m: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct DailyResponse {
    daily: DailySeries,
}

#[derive(Debug, Deserialize)]
struct DailySeries {
    time: Vec<NaiveDate>,
    temperature_2m_mean: Vec<Option<f64>>,
    weathercode: Vec<Option<i32>>,
}

impl OpenMeteoClient {
    /// `timeout` bounds every request end to end; a hung provider surfaces as
    /// an `UpstreamFetch` error instead of stalling the caller.
    pub fn new(base_url: &str, location: WeatherLocation, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to build HTTP client");
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            location,
        }
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        extra: &[(&str, String)],
    ) -> Result<T, AppError> {
        let mut query: Vec<(&str, String)> = vec![
            ("latitude", self.location.latitude.to_string()),
            ("longitude", self.location.longitude.to_string()),
            ("timezone", self.location.timezone.clone()),
        ];
        query.extend_from_slice(extra);

        let response = self
            .client
            .get(&self.base_url)
            .query(&query)
            .send()
            .await
            .map_err(|e| AppError::UpstreamFetch(format!("Open-Meteo request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::UpstreamFetch(format!(
                "Open-Meteo returned HTTP {}",
                response.status()
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| AppError::UpstreamFetch(format!("Open-Meteo JSON parse error: {}", e)))
    }

    /// Current temperature and weather code, mapped through the walk model.
    pub async fn fetch_current_walk(&self) -> Result<WeatherSample, AppError> {
        let resp: CurrentResponse = self
            .get(&[("current_weather", "true".to_string())])
            .await?;
        let cw = resp.current_weather;
        Ok(WeatherSample::from_conditions(cw.temperature, cw.weathercode))
    }

    /// Hourly temperatures for one local calendar date, ascending by time.
    ///
    /// With no date, the provider picks today in the configured timezone.
    pub async fn fetch_hourly_temperatures(
        &self,
        date: Option<NaiveDate>,
    ) -> Result<Vec<HourlyWeatherPoint>, AppError> {
        let mut query = vec![("hourly", "temperature_2m".to_string())];
        match date {
            Some(date) => {
                let day = date.format("%Y-%m-%d").to_string();
                query.push(("start_date", day.clone()));
                query.push(("end_date", day));
            }
            None => query.push(("forecast_days", "1".to_string())),
        }
        let resp: HourlyResponse = self.get(&query).await?;
        hourly_points(resp.hourly)
    }

    /// Walking times for the last `days` days (excluding forecast days).
    pub async fn fetch_walk_history(&self, days: u32) -> Result<WalkHistory, AppError> {
        let resp: DailyResponse = self
            .get(&[
                ("daily", "temperature_2m_mean,weathercode".to_string()),
                ("past_days", days.to_string()),
                ("forecast_days", "0".to_string()),
            ])
            .await?;
        daily_records(resp.daily).map(WalkHistory::new)
    }
}

/// Convert the parallel hourly arrays into points, skipping null readings.
fn hourly_points(series: HourlySeries) -> Result<Vec<HourlyWeatherPoint>, AppError> {
    if series.time.len() != series.temperature_2m.len() {
        tracing::warn!(
            "Open-Meteo hourly arrays differ in length ({} times, {} temperatures)",
            series.time.len(),
            series.temperature_2m.len()
        );
    }

    let mut points = Vec::with_capacity(series.time.len());
    for (time, temp) in series.time.iter().zip(series.temperature_2m) {
        let local = NaiveDateTime::parse_from_str(time, "%Y-%m-%dT%H:%M").map_err(|e| {
            AppError::UpstreamFetch(format!("Open-Meteo hourly time '{}': {}", time, e))
        })?;
        let Some(temperature_c) = temp else {
            tracing::debug!("Skipping hourly point {} without temperature", time);
            continue;
        };
        points.push(HourlyWeatherPoint {
            minutes: (local.hour() * 60 + local.minute()) as i32,
            temperature_c,
        });
    }

    if points.is_empty() {
        return Err(AppError::NoWeatherData(
            "Open-Meteo returned an empty hourly series".to_string(),
        ));
    }
    Ok(points)
}

/// Convert the parallel daily arrays into walk records, skipping days with
/// missing readings (the current day is often incomplete).
fn daily_records(series: DailySeries) -> Result<Vec<DailyWalkRecord>, AppError> {
    let records: Vec<DailyWalkRecord> = series
        .time
        .iter()
        .zip(series.temperature_2m_mean)
        .zip(series.weathercode)
        .filter_map(|((&date, temp), code)| match (temp, code) {
            (Some(t), Some(c)) => Some(DailyWalkRecord::from_conditions(date, t, c)),
            _ => {
                tracing::debug!("Skipping daily record {} with missing data", date);
                None
            }
        })
        .collect();

    if records.is_empty() {
        return Err(AppError::NoWeatherData(
            "Open-Meteo returned an empty daily series".to_string(),
        ));
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::walk_model::WeatherCondition;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> OpenMeteoClient {
        OpenMeteoClient::new(
            &server.uri(),
            WeatherLocation {
                latitude: 51.538,
                longitude: -0.011,
                timezone: "Europe/London".to_string(),
            },
            Duration::from_secs(2),
        )
    }

    #[test]
    fn test_hourly_points() {
        let series: HourlySeries = serde_json::from_value(serde_json::json!({
            "time": ["2025-12-03T00:00", "2025-12-03T13:00", "2025-12-03T14:00"],
            "temperature_2m": [3.04, 7.1, null]
        }))
        .unwrap();

        let points = hourly_points(series).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].minutes, 0);
        assert_eq!(points[0].temperature_c, 3.04);
        assert_eq!(points[1].minutes, 13 * 60);
        assert_eq!(points[1].temperature_c, 7.1);
    }

    #[test]
    fn test_hourly_points_empty() {
        let series = HourlySeries {
            time: vec![],
            temperature_2m: vec![],
        };
        assert!(matches!(
            hourly_points(series),
            Err(AppError::NoWeatherData(_))
        ));
    }

    #[test]
    fn test_hourly_points_bad_time() {
        let series = HourlySeries {
            time: vec!["13:00".to_string()],
            temperature_2m: vec![Some(7.0)],
        };
        assert!(matches!(
            hourly_points(series),
            Err(AppError::UpstreamFetch(_))
        ));
    }

    #[test]
    fn test_daily_records_skip_missing() {
        let series: DailySeries = serde_json::from_value(serde_json::json!({
            "time": ["2025-12-01", "2025-12-02", "2025-12-03"],
            "temperature_2m_mean": [4.2, 6.0, null],
            "weathercode": [61, null, 3]
        }))
        .unwrap();

        let records = daily_records(series).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].date, NaiveDate::from_ymd_opt(2025, 12, 1).unwrap());
        assert_eq!(records[0].condition, WeatherCondition::Rain);
    }

    #[test]
    fn test_daily_records_bucket_on_raw_mean() {
        // Just above a bucket edge must not be pulled back under it
        let series: DailySeries = serde_json::from_value(serde_json::json!({
            "time": ["2025-07-01", "2025-12-01"],
            "temperature_2m_mean": [25.04, 0.04],
            "weathercode": [0, 0]
        }))
        .unwrap();

        let records = daily_records(series).unwrap();
        assert_eq!(records[0].avg_temperature_c, 25.04);
        assert_eq!(records[0].temp_bucket_index, 5);
        assert_eq!(records[1].avg_temperature_c, 0.04);
        assert_eq!(records[1].temp_bucket_index, 1);

        let current = WeatherSample::from_conditions(25.04, 0);
        assert_eq!(records[0].segment_index, current.segment_index);
    }

    #[tokio::test]
    async fn test_fetch_current_walk() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("current_weather", "true"))
            .and(query_param("timezone", "Europe/London"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "latitude": 51.54,
                "longitude": -0.01,
                "current_weather": {
                    "time": "2025-12-03T13:00",
                    "temperature": 7.1,
                    "windspeed": 12.3,
                    "weathercode": 3
                }
            })))
            .mount(&server)
            .await;

        let sample = client_for(&server).fetch_current_walk().await.unwrap();
        assert_eq!(sample.condition, WeatherCondition::Cloudy);
        assert_eq!(sample.segment_index, 8);
        assert_eq!(sample.walking_time_seconds, 320);
    }

    #[tokio::test]
    async fn test_fetch_hourly_temperatures_sends_date() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("hourly", "temperature_2m"))
            .and(query_param("start_date", "2025-12-03"))
            .and(query_param("end_date", "2025-12-03"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "hourly": {
                    "time": ["2025-12-03T12:00", "2025-12-03T13:00"],
                    "temperature_2m": [6.5, 7.1]
                }
            })))
            .mount(&server)
            .await;

        let date = NaiveDate::from_ymd_opt(2025, 12, 3).unwrap();
        let points = client_for(&server)
            .fetch_hourly_temperatures(Some(date))
            .await
            .unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[1].minutes, 780);
    }

    #[tokio::test]
    async fn test_fetch_hourly_temperatures_today_is_local() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("hourly", "temperature_2m"))
            .and(query_param("forecast_days", "1"))
            .and(query_param("timezone", "Europe/London"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "hourly": {
                    "time": ["2025-12-03T00:00", "2025-12-03T01:00"],
                    "temperature_2m": [2.5, 2.1]
                }
            })))
            .mount(&server)
            .await;

        let points = client_for(&server)
            .fetch_hourly_temperatures(None)
            .await
            .unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].minutes, 0);

        let requests = server.received_requests().await.unwrap();
        assert!(!requests[0].url.query().unwrap_or("").contains("start_date"));
    }

    #[tokio::test]
    async fn test_fetch_walk_history() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("past_days", "2"))
            .and(query_param("forecast_days", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "daily": {
                    "time": ["2025-12-02", "2025-12-03"],
                    "temperature_2m_mean": [-1.0, 12.4],
                    "weathercode": [73, 0]
                }
            })))
            .mount(&server)
            .await;

        let history = client_for(&server).fetch_walk_history(2).await.unwrap();
        assert_eq!(history.days, 2);
        assert_eq!(history.items[0].condition, WeatherCondition::Snow);
        assert_eq!(history.items[0].segment_index, 18);
        assert_eq!(history.items[1].segment_index, 3);
    }

    #[tokio::test]
    async fn test_server_error_is_upstream_fetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = client_for(&server).fetch_current_walk().await.unwrap_err();
        assert!(matches!(err, AppError::UpstreamFetch(_)), "{:?}", err);
    }

    #[tokio::test]
    async fn test_hung_provider_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({
                        "current_weather": { "temperature": 7.1, "weathercode": 3 }
                    }))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let err = client_for(&server).fetch_current_walk().await.unwrap_err();
        assert!(matches!(err, AppError::UpstreamFetch(_)), "{:?}", err);
    }

    #[tokio::test]
    async fn test_malformed_body_is_upstream_fetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = client_for(&server).fetch_walk_history(30).await.unwrap_err();
        assert!(matches!(err, AppError::UpstreamFetch(_)), "{:?}", err);
    }
}
