//! Display formatting for weather payloads.
//!
//! Pure functions; no state, no I/O. Times and weekday labels are rendered
//! in UTC (shifted by the provider's timezone offset where one is given).

use chrono::DateTime;
use skycast_core::Units;

use crate::types::ForecastEntry;

const NOT_AVAILABLE: &str = "N/A";

/// Compass points for 45° sectors; the trailing N covers the 360°/0° wrap.
const DIRECTIONS: [&str; 9] = ["N", "NE", "E", "SE", "S", "SW", "W", "NW", "N"];

/// Round to the nearest integer with halves going up (2.5 → 3, -2.5 → -2).
fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

/// "21°C" / "70°F"; `None` or non-finite input yields "N/A".
pub fn format_temperature(temp: Option<f64>, units: Units) -> String {
    match temp.filter(|t| t.is_finite()) {
        Some(t) => format!("{}{}", round_half_up(t), units.temperature_symbol()),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// Compass direction for a bearing in degrees.
pub fn wind_direction(deg: f64) -> &'static str {
    let index = round_half_up(deg / 45.0).rem_euclid(DIRECTIONS.len() as i64);
    DIRECTIONS[index as usize]
}

/// "4 m/s SW"; "N/A" unless both speed and direction are known.
pub fn format_wind(speed: Option<f64>, deg: Option<f64>, units: Units) -> String {
    match (speed.filter(|s| s.is_finite()), deg.filter(|d| d.is_finite())) {
        (Some(speed), Some(deg)) => format!(
            "{} {} {}",
            round_half_up(speed),
            units.speed_unit(),
            wind_direction(deg)
        ),
        _ => NOT_AVAILABLE.to_string(),
    }
}

/// Icon name for an OpenWeatherMap icon code; unknown codes map to "cloud".
pub fn weather_icon(code: &str) -> &'static str {
    match code {
        "01d" => "clear-day",
        "01n" => "clear-night",
        "02d" => "partly-cloudy-day",
        "02n" => "partly-cloudy-night",
        "03d" | "03n" | "04d" | "04n" => "cloudy",
        "09d" | "09n" | "10d" | "10n" => "rain",
        "11d" | "11n" => "thunderstorm",
        "13d" | "13n" => "snow",
        "50d" | "50n" => "fog",
        _ => "cloud",
    }
}

/// "HH:MM" for a unix timestamp shifted by `timezone_offset` seconds.
pub fn format_time(timestamp: Option<i64>, timezone_offset: i64) -> String {
    timestamp
        .filter(|ts| *ts != 0)
        .and_then(|ts| DateTime::from_timestamp(ts.saturating_add(timezone_offset), 0))
        .map(|dt| dt.format("%H:%M").to_string())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// "Wed, May 1" for a unix timestamp.
pub fn format_date(timestamp: Option<i64>) -> String {
    timestamp
        .filter(|ts| *ts != 0)
        .and_then(|ts| DateTime::from_timestamp(ts, 0))
        .map(|dt| dt.format("%a, %b %-d").to_string())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// Visibility in metres as "10.0 km".
pub fn format_visibility(meters: Option<i64>) -> String {
    match meters {
        Some(m) => format!("{:.1} km", m as f64 / 1000.0),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// Background style for a condition description and time of day.
pub fn weather_background(condition: Option<&str>, is_day: bool) -> &'static str {
    let clear = if is_day { "bg-gradient-day" } else { "bg-gradient-night" };

    let Some(condition) = condition else {
        return "bg-gradient-day";
    };
    let condition = condition.to_lowercase();

    if condition.contains("clear") || condition.contains("sun") {
        clear
    } else if condition.contains("cloud") {
        "bg-neutral-200"
    } else if condition.contains("rain") || condition.contains("drizzle") {
        "bg-gradient-rain"
    } else if condition.contains("snow") {
        "bg-neutral-100"
    } else if condition.contains("thunder") {
        "bg-neutral-700"
    } else {
        clear
    }
}

/// Forecast entries sharing a weekday label.
#[derive(Debug, Clone, PartialEq)]
pub struct DayGroup<'a> {
    /// Short weekday, e.g. "Mon"
    pub label: String,
    pub entries: Vec<&'a ForecastEntry>,
}

impl DayGroup<'_> {
    /// Entry closest to the middle of the group, used for the day's headline.
    pub fn representative(&self) -> Option<&ForecastEntry> {
        self.entries.get(self.entries.len() / 2).copied()
    }

    /// (min, max) of the entries' temperatures.
    pub fn temperature_range(&self) -> Option<(f64, f64)> {
        self.entries.iter().map(|e| e.main.temp).fold(None, |acc, t| match acc {
            None => Some((t, t)),
            Some((lo, hi)) => Some((lo.min(t), hi.max(t))),
        })
    }

    /// Highest probability of precipitation in the group.
    pub fn max_precipitation_chance(&self) -> f64 {
        self.entries.iter().map(|e| e.pop).fold(0.0, f64::max)
    }
}

/// Group a forecast series by weekday label in encounter order.
///
/// Labels carry no week information, so a series longer than seven days
/// folds entries from different weeks into the same group.
pub fn group_forecast_by_day(entries: &[ForecastEntry]) -> Vec<DayGroup<'_>> {
    let mut groups: Vec<DayGroup<'_>> = Vec::new();

    for entry in entries {
        let label = DateTime::from_timestamp(entry.dt, 0)
            .map(|dt| dt.format("%a").to_string())
            .unwrap_or_else(|| NOT_AVAILABLE.to_string());

        match groups.iter_mut().find(|g| g.label == label) {
            Some(group) => group.entries.push(entry),
            None => groups.push(DayGroup {
                label,
                entries: vec![entry],
            }),
        }
    }

    groups
}
