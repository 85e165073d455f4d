use std::str::FromStr;
use std::time::Duration;

use crate::services::open_meteo::WeatherLocation;
use crate::services::timetable::Route;

/// Broker connection settings.
#[derive(Debug, Clone)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub client_id: String,
}

/// Topic names for every published artifact.
#[derive(Debug, Clone)]
pub struct TopicConfig {
    pub timetable_108: String,
    pub timetable_339: String,
    pub best_108: String,
    pub best_339: String,
    pub walk: String,
    pub walk_history: String,
}

impl TopicConfig {
    pub fn timetable(&self, route: Route) -> &str {
        match route {
            Route::Route108 => &self.timetable_108,
            Route::Route339 => &self.timetable_339,
        }
    }

    pub fn best(&self, route: Route) -> &str {
        match route {
            Route::Route108 => &self.best_108,
            Route::Route339 => &self.best_339,
        }
    }
}

/// How often each artifact is recomputed and republished.
#[derive(Debug, Clone)]
pub struct CadenceConfig {
    pub current_walk: Duration,
    pub timetable: Duration,
    pub walk_history: Duration,
    /// Days of history in the walk-history artifact.
    pub walk_history_days: u32,
}

/// Application configuration, parsed from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub mqtt: MqttConfig,
    pub topics: TopicConfig,
    pub cadence: CadenceConfig,
    pub open_meteo_url: String,
    pub weather_location: WeatherLocation,
    /// Upper bound on a single Open-Meteo request.
    pub weather_timeout: Duration,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|_| panic!("{} must be a valid {}", key, std::any::type_name::<T>())),
        Err(_) => default,
    }
}

fn env_secs(key: &str, default: u64) -> Duration {
    Duration::from_secs(env_parse(key, default))
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env_parse("PORT", 3000),
            mqtt: MqttConfig {
                host: env_or("MQTT_BROKER", "localhost"),
                port: env_parse("MQTT_PORT", 1883),
                username: std::env::var("MQTT_USERNAME").ok(),
                password: std::env::var("MQTT_PASSWORD").ok(),
                client_id: std::env::var("MQTT_CLIENT_ID")
                    .unwrap_or_else(|_| format!("bus-walk-api-{}", uuid::Uuid::new_v4())),
            },
            topics: TopicConfig {
                timetable_108: env_or("MQTT_TOPIC_108", "bus-walk/bus-108"),
                timetable_339: env_or("MQTT_TOPIC_339", "bus-walk/bus-339"),
                best_108: env_or("MQTT_TOPIC_108_BEST", "bus-walk/best-108"),
                best_339: env_or("MQTT_TOPIC_339_BEST", "bus-walk/best-339"),
                walk: env_or("MQTT_TOPIC_WALK", "bus-walk/walk"),
                walk_history: env_or("MQTT_TOPIC_WALK_HISTORY", "bus-walk/walk-history"),
            },
            cadence: CadenceConfig {
                current_walk: env_secs("CURRENT_WALK_INTERVAL_SECS", 5 * 60),
                timetable: env_secs("TIMETABLE_INTERVAL_SECS", 60 * 60),
                walk_history: env_secs("WALK_HISTORY_INTERVAL_SECS", 6 * 60 * 60),
                walk_history_days: env_parse("WALK_HISTORY_DAYS", 30),
            },
            open_meteo_url: env_or("OPEN_METEO_URL", "https://api.open-meteo.com/v1/forecast"),
            weather_location: WeatherLocation {
                // Stratford / London Aquatics Centre
                latitude: env_parse("WEATHER_LATITUDE", 51.538),
                longitude: env_parse("WEATHER_LONGITUDE", -0.011),
                timezone: env_or("WEATHER_TIMEZONE", "Europe/London"),
            },
            weather_timeout: env_secs("WEATHER_TIMEOUT_SECS", 10),
        }
    }
}
