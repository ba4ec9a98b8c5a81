//! Plain-text views for the terminal.

use std::fmt::Write as _;

use skycast_core::Units;
use skycast_services::SavedLocation;
use skycast_weather::format::{
    format_date, format_temperature, format_time, format_visibility, format_wind,
    group_forecast_by_day, weather_background, weather_icon,
};
use skycast_weather::{CurrentWeather, ForecastEntry};

pub fn current_weather(current: &CurrentWeather, units: Units) -> String {
    let mut out = String::new();
    let condition = current.primary_condition();

    let place = match &current.sys.country {
        Some(country) => format!("{}, {}", current.name, country),
        None => current.name.clone(),
    };
    let _ = writeln!(out, "{}  ({})", place, format_date(Some(current.dt)));

    if let Some(condition) = condition {
        let _ = writeln!(
            out,
            "{}  [{}]",
            condition.description,
            weather_icon(&condition.icon)
        );
    }

    let _ = writeln!(
        out,
        "Temperature: {} (feels like {})",
        format_temperature(Some(current.main.temp), units),
        format_temperature(Some(current.main.feels_like), units)
    );
    let _ = writeln!(out, "Humidity:    {}%", current.main.humidity.round());
    let _ = writeln!(
        out,
        "Wind:        {}",
        format_wind(Some(current.wind.speed), Some(current.wind.deg), units)
    );
    let _ = writeln!(out, "Visibility:  {}", format_visibility(current.visibility));
    let _ = writeln!(
        out,
        "Sunrise:     {}   Sunset: {}",
        format_time(current.sys.sunrise, current.timezone),
        format_time(current.sys.sunset, current.timezone)
    );
    let _ = write!(
        out,
        "Theme:       {}",
        weather_background(condition.map(|c| c.main.as_str()), current.is_day())
    );

    out
}

/// One line per weekday: label, headline condition, low/high, rain chance.
pub fn forecast(entries: &[ForecastEntry], units: Units) -> String {
    let mut out = String::new();

    for day in group_forecast_by_day(entries) {
        let headline = day
            .representative()
            .and_then(|e| e.weather.first())
            .map(|c| c.description.as_str())
            .unwrap_or("-");
        let (low, high) = match day.temperature_range() {
            Some((low, high)) => (Some(low), Some(high)),
            None => (None, None),
        };

        let _ = writeln!(
            out,
            "{:<4} {:<20} {:>6} / {:<6} {:>3}% rain",
            day.label,
            headline,
            format_temperature(low, units),
            format_temperature(high, units),
            (day.max_precipitation_chance() * 100.0).round()
        );
    }

    out.trim_end().to_string()
}

pub fn saved_locations(locations: &[SavedLocation]) -> String {
    if locations.is_empty() {
        return "No saved locations".to_string();
    }

    locations
        .iter()
        .map(|loc| format!("{:>4}  {} ({:.2}, {:.2})", loc.id, loc.name, loc.lat, loc.lon))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use skycast_weather::{Condition, MainReadings};

    #[test]
    fn test_current_weather_view() {
        let current = CurrentWeather {
            name: "Lima".into(),
            weather: vec![Condition {
                id: 800,
                main: "Clear".into(),
                description: "clear sky".into(),
                icon: "01d".into(),
            }],
            main: MainReadings {
                temp: 22.5,
                feels_like: 21.2,
                humidity: 70.0,
                ..Default::default()
            },
            dt: 1_704_067_200,
            ..Default::default()
        };

        let view = current_weather(&current, Units::Metric);
        assert!(view.starts_with("Lima  (Mon, Jan 1)"));
        assert!(view.contains("clear sky  [clear-day]"));
        assert!(view.contains("Temperature: 23°C (feels like 21°C)"));
        assert!(view.contains("Wind:        0 m/s N"));
        assert!(view.contains("Theme:       bg-gradient-day"));
    }

    #[test]
    fn test_forecast_view_has_one_line_per_day() {
        let entries: Vec<ForecastEntry> = (0..16)
            .map(|i| ForecastEntry {
                dt: 1_704_067_200 + i * 3 * 3600,
                main: MainReadings {
                    temp: i as f64,
                    ..Default::default()
                },
                ..Default::default()
            })
            .collect();

        let view = forecast(&entries, Units::Imperial);
        let lines: Vec<&str> = view.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("Mon"));
        assert!(lines[0].contains("0°F"));
        assert!(lines[0].contains("7°F"));
        assert!(lines[1].starts_with("Tue"));
    }

    #[test]
    fn test_saved_locations_view() {
        assert_eq!(saved_locations(&[]), "No saved locations");

        let view = saved_locations(&[SavedLocation {
            id: 4,
            user_id: Some(1),
            name: "Oslo".into(),
            lat: 59.913,
            lon: 10.752,
            created_at: None,
        }]);
        assert_eq!(view, "   4  Oslo (59.91, 10.75)");
    }
}
