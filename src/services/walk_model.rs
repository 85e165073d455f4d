//! Weather-to-walking-time model.
//!
//! Walking time to the boarding stop is discretized into 24 segments of
//! 10 seconds each, from 4 minutes (clear and freezing) to 7.83 minutes
//! (snow and hot). The segment is picked from a weather category and a
//! temperature bucket:
//!
//! ```text
//! segment_index = weather_index * 6 + temp_bucket_index   (0..=23)
//! walking_secs  = 240 + segment_index * 10                (240..=470)
//! ```

use chrono::NaiveDate;
use serde::Serialize;
use utoipa::ToSchema;

use crate::helpers::round_2dp;

/// Walking time at segment 0, in seconds.
const BASE_WALK_SECS: u32 = 4 * 60;

/// Extra seconds per segment step.
const SEGMENT_STEP_SECS: u32 = 10;

/// Number of temperature buckets per weather category.
const TEMP_BUCKETS: u8 = 6;

/// Simplified weather condition derived from a WMO weather code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum WeatherCondition {
    Clear,
    Cloudy,
    Rain,
    Snow,
    Other,
}

impl WeatherCondition {
    /// Map a WMO weather code (as used by Open-Meteo) to a condition.
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => WeatherCondition::Clear,
            1..=3 => WeatherCondition::Cloudy,
            // drizzle, rain, rain showers
            51..=57 | 61..=67 | 80..=82 => WeatherCondition::Rain,
            // snow, snow grains, snow showers
            71..=77 | 85..=86 => WeatherCondition::Snow,
            _ => WeatherCondition::Other,
        }
    }

    /// Weather category index. `Other` walks like `Cloudy`.
    pub fn weather_index(self) -> u8 {
        match self {
            WeatherCondition::Clear => 0,
            WeatherCondition::Cloudy | WeatherCondition::Other => 1,
            WeatherCondition::Rain => 2,
            WeatherCondition::Snow => 3,
        }
    }
}

/// Temperature bucket 0..=5; each bucket is inclusive of its upper bound.
pub fn temp_bucket_index(temperature_c: f64) -> u8 {
    if temperature_c <= 0.0 {
        0
    } else if temperature_c <= 5.0 {
        1
    } else if temperature_c <= 10.0 {
        2
    } else if temperature_c <= 20.0 {
        3
    } else if temperature_c <= 25.0 {
        4
    } else {
        5
    }
}

/// Output of the walking-time model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkEstimate {
    pub weather_index: u8,
    pub temp_bucket_index: u8,
    pub segment_index: u8,
    /// Authoritative walking duration.
    pub walking_secs: u32,
}

impl WalkEstimate {
    /// Walking time in minutes, rounded to 2 decimal places. For display only.
    pub fn walking_minutes(&self) -> f64 {
        round_2dp(f64::from(self.walking_secs) / 60.0)
    }

    /// Walking time rounded to the nearest whole minute (halves round up).
    /// This is the value trip selection works with.
    pub fn whole_minutes(&self) -> i32 {
        ((self.walking_secs + 30) / 60) as i32
    }
}

/// Estimate the walking time for a temperature and condition.
pub fn estimate_walking_time(temperature_c: f64, condition: WeatherCondition) -> WalkEstimate {
    let weather_index = condition.weather_index();
    let temp_bucket_index = temp_bucket_index(temperature_c);
    let segment_index = weather_index * TEMP_BUCKETS + temp_bucket_index;

    WalkEstimate {
        weather_index,
        temp_bucket_index,
        segment_index,
        walking_secs: BASE_WALK_SECS + u32::from(segment_index) * SEGMENT_STEP_SECS,
    }
}

/// Current conditions and the walking time they imply.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WeatherSample {
    /// Air temperature in Celsius
    pub temperature_c: f64,
    /// Simplified weather condition
    pub condition: WeatherCondition,
    /// Walking time in minutes (2 decimal places)
    pub walking_time_minutes: f64,
    /// Walking time in seconds
    pub walking_time_seconds: u32,
    /// Weather category index (clear=0, cloudy=1, rain=2, snow=3)
    pub weather_index: u8,
    /// Temperature bucket index (0..=5)
    pub temp_bucket_index: u8,
    /// Combined segment index (0..=23)
    pub segment_index: u8,
}

impl WeatherSample {
    pub fn from_conditions(temperature_c: f64, weather_code: i32) -> Self {
        let condition = WeatherCondition::from_code(weather_code);
        let estimate = estimate_walking_time(temperature_c, condition);
        Self {
            temperature_c,
            condition,
            walking_time_minutes: estimate.walking_minutes(),
            walking_time_seconds: estimate.walking_secs,
            weather_index: estimate.weather_index,
            temp_bucket_index: estimate.temp_bucket_index,
            segment_index: estimate.segment_index,
        }
    }

    /// Re-derive the estimate from the sample's condition and temperature.
    pub fn estimate(&self) -> WalkEstimate {
        estimate_walking_time(self.temperature_c, self.condition)
    }
}

/// One day of the walk history.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DailyWalkRecord {
    /// Calendar date (YYYY-MM-DD)
    pub date: NaiveDate,
    /// Mean air temperature over the day in Celsius
    pub avg_temperature_c: f64,
    pub condition: WeatherCondition,
    pub walking_time_minutes: f64,
    pub walking_time_seconds: u32,
    pub weather_index: u8,
    pub temp_bucket_index: u8,
    pub segment_index: u8,
}

impl DailyWalkRecord {
    pub fn from_conditions(date: NaiveDate, avg_temperature_c: f64, weather_code: i32) -> Self {
        let condition = WeatherCondition::from_code(weather_code);
        let estimate = estimate_walking_time(avg_temperature_c, condition);
        Self {
            date,
            avg_temperature_c,
            condition,
            walking_time_minutes: estimate.walking_minutes(),
            walking_time_seconds: estimate.walking_secs,
            weather_index: estimate.weather_index,
            temp_bucket_index: estimate.temp_bucket_index,
            segment_index: estimate.segment_index,
        }
    }
}

/// Daily walking times over the last `days` days.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WalkHistory {
    /// Number of days actually returned
    pub days: usize,
    pub items: Vec<DailyWalkRecord>,
}

impl WalkHistory {
    pub fn new(items: Vec<DailyWalkRecord>) -> Self {
        Self {
            days: items.len(),
            items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_condition_from_code() {
        assert_eq!(WeatherCondition::from_code(0), WeatherCondition::Clear);
        for code in [1, 2, 3] {
            assert_eq!(WeatherCondition::from_code(code), WeatherCondition::Cloudy);
        }
        for code in [51, 55, 57, 61, 63, 67, 80, 81, 82] {
            assert_eq!(WeatherCondition::from_code(code), WeatherCondition::Rain);
        }
        for code in [71, 73, 77, 85, 86] {
            assert_eq!(WeatherCondition::from_code(code), WeatherCondition::Snow);
        }
        // fog, thunderstorm, gaps between ranges
        for code in [-1, 4, 45, 48, 50, 58, 60, 68, 70, 78, 79, 83, 84, 87, 95, 99] {
            assert_eq!(WeatherCondition::from_code(code), WeatherCondition::Other);
        }
    }

    #[test]
    fn test_other_walks_like_cloudy() {
        assert_eq!(
            WeatherCondition::Other.weather_index(),
            WeatherCondition::Cloudy.weather_index()
        );
        assert_eq!(
            estimate_walking_time(7.0, WeatherCondition::Other),
            estimate_walking_time(7.0, WeatherCondition::Cloudy)
        );
    }

    #[test]
    fn test_temp_bucket_boundaries_are_upper_inclusive() {
        assert_eq!(temp_bucket_index(-12.0), 0);
        assert_eq!(temp_bucket_index(0.0), 0);
        assert_eq!(temp_bucket_index(0.01), 1);
        assert_eq!(temp_bucket_index(5.0), 1);
        assert_eq!(temp_bucket_index(10.0), 2);
        assert_eq!(temp_bucket_index(20.0), 3);
        assert_eq!(temp_bucket_index(25.0), 4);
        assert_eq!(temp_bucket_index(25.01), 5);
        assert_eq!(temp_bucket_index(40.0), 5);
    }

    #[test]
    fn test_segment_and_seconds_ranges() {
        let temps = [-20.0, 0.0, 3.0, 5.0, 7.5, 10.0, 15.0, 20.0, 22.0, 25.0, 25.01, 35.0];
        for code in -5..=100 {
            for &t in &temps {
                let sample = WeatherSample::from_conditions(t, code);
                assert!(sample.segment_index <= 23);
                assert!((240..=470).contains(&sample.walking_time_seconds));
                assert_eq!(
                    sample.walking_time_seconds,
                    240 + u32::from(sample.segment_index) * 10
                );
            }
        }
    }

    #[test]
    fn test_seconds_monotonic_in_segment() {
        let conditions = [
            WeatherCondition::Clear,
            WeatherCondition::Cloudy,
            WeatherCondition::Rain,
            WeatherCondition::Snow,
        ];
        let temps = [-5.0, 3.0, 8.0, 15.0, 23.0, 30.0];
        let mut estimates: Vec<WalkEstimate> = conditions
            .iter()
            .flat_map(|&c| temps.iter().map(move |&t| estimate_walking_time(t, c)))
            .collect();
        estimates.sort_by_key(|e| e.segment_index);

        let segments: Vec<u8> = estimates.iter().map(|e| e.segment_index).collect();
        assert_eq!(segments, (0..=23).collect::<Vec<u8>>());
        for pair in estimates.windows(2) {
            assert!(pair[0].walking_secs <= pair[1].walking_secs);
        }
    }

    #[test]
    fn test_extremes() {
        let fastest = estimate_walking_time(-3.0, WeatherCondition::Clear);
        assert_eq!(fastest.segment_index, 0);
        assert_eq!(fastest.walking_secs, 240);
        assert_eq!(fastest.walking_minutes(), 4.0);

        let slowest = estimate_walking_time(30.0, WeatherCondition::Snow);
        assert_eq!(slowest.segment_index, 23);
        assert_eq!(slowest.walking_secs, 470);
        assert_eq!(slowest.walking_minutes(), 7.83);
    }

    #[test]
    fn test_cloudy_mild_sample() {
        // 7.1°C, overcast → cloudy(1) * 6 + bucket 2 = segment 8 → 320s
        let sample = WeatherSample::from_conditions(7.1, 3);
        assert_eq!(sample.condition, WeatherCondition::Cloudy);
        assert_eq!(sample.weather_index, 1);
        assert_eq!(sample.temp_bucket_index, 2);
        assert_eq!(sample.segment_index, 8);
        assert_eq!(sample.walking_time_seconds, 320);
        assert_eq!(sample.walking_time_minutes, 5.33);
        assert_eq!(sample.estimate().whole_minutes(), 5);
    }

    #[test]
    fn test_whole_minutes_rounds_half_up() {
        // 270s = 4.5 min
        let e = estimate_walking_time(20.0, WeatherCondition::Clear);
        assert_eq!(e.walking_secs, 270);
        assert_eq!(e.whole_minutes(), 5);
        // 260s = 4.33 min
        let e = estimate_walking_time(10.0, WeatherCondition::Clear);
        assert_eq!(e.walking_secs, 260);
        assert_eq!(e.whole_minutes(), 4);
    }

    #[test]
    fn test_weather_sample_json() {
        let sample = WeatherSample::from_conditions(7.1, 3);
        let json = serde_json::to_value(&sample).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "temperatureC": 7.1,
                "condition": "cloudy",
                "walkingTimeMinutes": 5.33,
                "walkingTimeSeconds": 320,
                "weatherIndex": 1,
                "tempBucketIndex": 2,
                "segmentIndex": 8
            })
        );
    }

    #[test]
    fn test_walk_history_json() {
        let date = NaiveDate::from_ymd_opt(2025, 12, 3).unwrap();
        let history = WalkHistory::new(vec![DailyWalkRecord::from_conditions(date, 4.2, 61)]);
        let json = serde_json::to_value(&history).unwrap();
        assert_eq!(json["days"], 1);
        let item = &json["items"][0];
        assert_eq!(item["date"], "2025-12-03");
        assert_eq!(item["avgTemperatureC"], 4.2);
        assert_eq!(item["condition"], "rain");
        // rain(2) * 6 + bucket 1 = 13 → 370s
        assert_eq!(item["segmentIndex"], 13);
        assert_eq!(item["walkingTimeSeconds"], 370);
        assert_eq!(item["walkingTimeMinutes"], 6.17);
    }
}
