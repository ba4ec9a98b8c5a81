//! OpenWeatherMap 2.5 payloads and weather-side error types.

use serde::{Deserialize, Serialize};
use skycast_core::RequestError;

/// Geographic coordinates as used by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// One entry of the provider's `weather` array.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Condition {
    pub id: i64,
    /// Condition group, e.g. "Rain", "Thunderstorm"
    pub main: String,
    pub description: String,
    /// Icon code, e.g. "10d"
    pub icon: String,
}

/// Temperature, pressure and humidity block.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MainReadings {
    pub temp: f64,
    #[serde(default)]
    pub feels_like: f64,
    #[serde(default)]
    pub temp_min: f64,
    #[serde(default)]
    pub temp_max: f64,
    #[serde(default)]
    pub pressure: f64,
    #[serde(default)]
    pub humidity: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sea_level: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grnd_level: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Wind {
    pub speed: f64,
    #[serde(default)]
    pub deg: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gust: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Clouds {
    pub all: f64,
}

/// Rain or snow volume in millimetres.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Precipitation {
    #[serde(rename = "1h", default, skip_serializing_if = "Option::is_none")]
    pub last_hour: Option<f64>,
    #[serde(rename = "3h", default, skip_serializing_if = "Option::is_none")]
    pub last_three_hours: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Sys {
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub sunrise: Option<i64>,
    #[serde(default)]
    pub sunset: Option<i64>,
}

/// Current conditions for one location (`GET /weather`).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CurrentWeather {
    pub coord: Coordinates,
    #[serde(default)]
    pub weather: Vec<Condition>,
    #[serde(default)]
    pub base: Option<String>,
    pub main: MainReadings,
    #[serde(default)]
    pub visibility: Option<i64>,
    #[serde(default)]
    pub wind: Wind,
    #[serde(default)]
    pub clouds: Clouds,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rain: Option<Precipitation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snow: Option<Precipitation>,
    /// Observation time, unix seconds
    pub dt: i64,
    #[serde(default)]
    pub sys: Sys,
    /// Shift from UTC in seconds
    #[serde(default)]
    pub timezone: i64,
    #[serde(default)]
    pub id: i64,
    pub name: String,
}

impl CurrentWeather {
    /// First (dominant) condition reported by the provider.
    pub fn primary_condition(&self) -> Option<&Condition> {
        self.weather.first()
    }

    /// Whether the observation falls between sunrise and sunset.
    ///
    /// Without sunrise/sunset data the reading is assumed to be daytime.
    pub fn is_day(&self) -> bool {
        match (self.sys.sunrise, self.sys.sunset) {
            (Some(rise), Some(set)) => self.dt >= rise && self.dt < set,
            _ => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ForecastSys {
    /// Part of day: "d" or "n"
    #[serde(default)]
    pub pod: Option<String>,
}

/// One 3-hour step of a forecast series.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ForecastEntry {
    pub dt: i64,
    pub main: MainReadings,
    #[serde(default)]
    pub weather: Vec<Condition>,
    #[serde(default)]
    pub clouds: Clouds,
    #[serde(default)]
    pub wind: Wind,
    #[serde(default)]
    pub visibility: Option<i64>,
    /// Probability of precipitation, 0.0..=1.0
    #[serde(default)]
    pub pop: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rain: Option<Precipitation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snow: Option<Precipitation>,
    #[serde(default)]
    pub sys: ForecastSys,
    #[serde(default)]
    pub dt_txt: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct City {
    #[serde(default)]
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub coord: Coordinates,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub population: Option<i64>,
    #[serde(default)]
    pub timezone: i64,
    #[serde(default)]
    pub sunrise: Option<i64>,
    #[serde(default)]
    pub sunset: Option<i64>,
}

/// Full `GET /forecast` response.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ForecastResponse {
    #[serde(default)]
    pub cnt: u32,
    pub list: Vec<ForecastEntry>,
    #[serde(default)]
    pub city: Option<City>,
}

/// Result of a combined current + forecast fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherBundle {
    pub current_weather: CurrentWeather,
    pub forecast: ForecastResponse,
}

/// How a location is identified in provider requests.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationQuery {
    /// Free-text place name (`q=`)
    Name(String),
    /// Coordinates (`lat=`/`lon=`)
    Coordinates { lat: f64, lon: f64 },
}

impl LocationQuery {
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    /// Query parameters identifying this location.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        match self {
            LocationQuery::Name(name) => vec![("q", name.clone())],
            LocationQuery::Coordinates { lat, lon } => {
                vec![("lat", lat.to_string()), ("lon", lon.to_string())]
            }
        }
    }
}

impl std::fmt::Display for LocationQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LocationQuery::Name(name) => write!(f, "{}", name),
            LocationQuery::Coordinates { lat, lon } => write!(f, "{:.4},{:.4}", lat, lon),
        }
    }
}

/// Device position reported by a [`crate::location::Geolocator`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_meters: Option<f64>,
}

/// Geolocation failures. The first three mirror the platform error codes.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeolocationError {
    #[error("Location permission denied")]
    PermissionDenied,
    #[error("Location information unavailable")]
    PositionUnavailable,
    #[error("Location request timed out")]
    Timeout,
    #[error("Geolocation is not supported")]
    Unsupported,
    #[error("Failed to get your location")]
    Other(String),
}

impl GeolocationError {
    pub const PERMISSION_DENIED: u16 = 1;
    pub const POSITION_UNAVAILABLE: u16 = 2;
    pub const TIMEOUT: u16 = 3;

    /// Map a numeric platform error code.
    pub fn from_code(code: u16) -> Self {
        match code {
            Self::PERMISSION_DENIED => Self::PermissionDenied,
            Self::POSITION_UNAVAILABLE => Self::PositionUnavailable,
            Self::TIMEOUT => Self::Timeout,
            other => Self::Other(format!("unknown geolocation error code {}", other)),
        }
    }

    /// Map a symbolic platform error name such as `PERMISSION_DENIED`.
    pub fn from_name(name: &str) -> Self {
        match name {
            "PERMISSION_DENIED" => Self::PermissionDenied,
            "POSITION_UNAVAILABLE" => Self::PositionUnavailable,
            "TIMEOUT" => Self::Timeout,
            other => Self::Other(format!("unknown geolocation error {}", other)),
        }
    }

    pub fn code(&self) -> Option<u16> {
        match self {
            Self::PermissionDenied => Some(Self::PERMISSION_DENIED),
            Self::PositionUnavailable => Some(Self::POSITION_UNAVAILABLE),
            Self::Timeout => Some(Self::TIMEOUT),
            Self::Unsupported | Self::Other(_) => None,
        }
    }
}

/// Errors returned by [`crate::store::WeatherStore`] operations.
///
/// `Display` is the user-facing message already stored in the store state.
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    /// The weather provider request failed
    #[error("{message}")]
    Provider {
        message: String,
        #[source]
        source: RequestError,
    },
    /// A saved-location request to the backend failed
    #[error("{message}")]
    Backend {
        message: String,
        #[source]
        source: RequestError,
    },
    #[error(transparent)]
    Location(#[from] GeolocationError),
}

impl WeatherError {
    /// True when the provider did not recognise the location.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            WeatherError::Provider {
                source: RequestError::Status { status: 404, .. },
                ..
            }
        )
    }
}
