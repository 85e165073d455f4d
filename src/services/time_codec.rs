//! `HH:MM` text <-> minutes since midnight.

use crate::errors::AppError;

/// Minutes in one day.
pub const MINUTES_PER_DAY: i32 = 24 * 60;

/// Parse a strict `HH:MM` time of day into minutes since midnight.
pub fn to_minutes(text: &str) -> Result<i32, AppError> {
    let malformed = || AppError::Format(format!("expected HH:MM, got '{}'", text));

    let (hours, minutes) = text.split_once(':').ok_or_else(malformed)?;
    if hours.len() != 2 || minutes.len() != 2 {
        return Err(malformed());
    }
    if !hours.bytes().chain(minutes.bytes()).all(|b| b.is_ascii_digit()) {
        return Err(malformed());
    }

    let h: i32 = hours.parse().map_err(|_| malformed())?;
    let m: i32 = minutes.parse().map_err(|_| malformed())?;
    if h >= 24 || m >= 60 {
        return Err(malformed());
    }

    Ok(h * 60 + m)
}

/// Wrap any minute count into `[0, 1440)`.
pub fn wrap_minutes(total: i32) -> i32 {
    total.rem_euclid(MINUTES_PER_DAY)
}

/// Format minutes since midnight as `HH:MM`, wrapping around 24h first.
pub fn from_minutes(total: i32) -> String {
    let mins = wrap_minutes(total);
    format!("{:02}:{:02}", mins / 60, mins % 60)
}

/// Serde adapter for minute fields that travel as `HH:MM` strings.
pub mod hhmm {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(minutes: &i32, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::from_minutes(*minutes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i32, D::Error> {
        let text = String::deserialize(deserializer)?;
        super::to_minutes(&text).map_err(serde::de::Error::custom)
    }
}
