//! Dashboard flow tying the weather and auth stores together.
//!
//! Owns the startup sequence, location search with its recent-search
//! bookkeeping, and the checks made before a location is saved.

use std::sync::Arc;

use skycast_auth::AuthStore;
use skycast_core::storage::LAST_LOCATION_KEY;
use skycast_core::{KeyValueStore, Notifier, StorageError};
use skycast_services::{NewLocation, SavedLocation};
use skycast_weather::{
    CurrentWeather, ForecastResponse, LocationQuery, RecentSearches, WeatherError, WeatherStore,
};
use thiserror::Error;

const SEARCH_FAILED: &str = "Failed to fetch weather data";

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("Please enter a location")]
    EmptyQuery,

    #[error("No weather data loaded")]
    NoWeatherLoaded,

    #[error("You must be logged in to save locations")]
    NotLoggedIn,

    #[error("This location is already saved")]
    AlreadySaved,

    #[error(transparent)]
    Weather(#[from] WeatherError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// How the dashboard picked its initial location.
#[derive(Debug, Clone, PartialEq)]
pub enum StartLocation {
    LastSearch(String),
    Device { lat: f64, lon: f64 },
    Default(String),
}

pub struct Dashboard {
    weather: Arc<WeatherStore>,
    auth: Arc<AuthStore>,
    storage: Arc<dyn KeyValueStore>,
    notifier: Arc<dyn Notifier>,
    recent: RecentSearches,
    default_location: String,
}

impl Dashboard {
    pub fn new(
        weather: Arc<WeatherStore>,
        auth: Arc<AuthStore>,
        storage: Arc<dyn KeyValueStore>,
        notifier: Arc<dyn Notifier>,
        default_location: impl Into<String>,
    ) -> Self {
        let recent = RecentSearches::load(storage.clone());
        Self {
            weather,
            auth,
            storage,
            notifier,
            recent,
            default_location: default_location.into(),
        }
    }

    pub fn weather(&self) -> &WeatherStore {
        &self.weather
    }

    pub fn auth(&self) -> &AuthStore {
        &self.auth
    }

    pub fn recent_searches(&self) -> &[String] {
        self.recent.entries()
    }

    /// Last successfully searched location, if any.
    pub fn last_location(&self) -> Option<String> {
        match self.storage.get_item(LAST_LOCATION_KEY) {
            Ok(last) => last.filter(|l| !l.trim().is_empty()),
            Err(e) => {
                tracing::warn!("Failed to read last location: {}", e);
                None
            }
        }
    }

    /// Load saved locations, then show the last search, the device
    /// position, or the default location, in that order of preference.
    pub async fn start(&self) -> Result<StartLocation, DashboardError> {
        self.weather.fetch_saved_locations().await;

        if let Some(last) = self.last_location() {
            tracing::info!("Resuming last location: {}", last);
            self.load_location(&last).await?;
            return Ok(StartLocation::LastSearch(last));
        }

        match self.weather.get_user_location().await {
            Ok(coords) => Ok(StartLocation::Device {
                lat: coords.lat,
                lon: coords.lon,
            }),
            Err(e) => {
                tracing::info!(
                    "Falling back to {} after location failure: {}",
                    self.default_location,
                    e
                );
                let fallback = self.default_location.clone();
                self.load_location(&fallback).await?;
                Ok(StartLocation::Default(fallback))
            }
        }
    }

    /// Search typed by the user: load the place and record it as a recent
    /// search.
    pub async fn search(
        &mut self,
        query: &str,
    ) -> Result<(CurrentWeather, ForecastResponse), DashboardError> {
        let loaded = self.load_location(query).await?;
        self.recent.add(query.trim())?;
        Ok(loaded)
    }

    /// Load current weather and forecast for a place name and remember it as
    /// the last location. Recent searches are left alone.
    pub async fn load_location(
        &self,
        query: &str,
    ) -> Result<(CurrentWeather, ForecastResponse), DashboardError> {
        let query = query.trim();
        if query.is_empty() {
            let err = DashboardError::EmptyQuery;
            self.notifier.error(&err.to_string());
            return Err(err);
        }

        let location = LocationQuery::name(query);
        let result = tokio::try_join!(
            self.weather.fetch_current_weather(&location),
            self.weather.fetch_forecast(&location)
        );

        let loaded = match result {
            Ok(loaded) => loaded,
            Err(e) => {
                tracing::warn!("Search for {} failed: {}", query, e);
                self.notifier.error(SEARCH_FAILED);
                return Err(e.into());
            }
        };

        self.storage.set_item(LAST_LOCATION_KEY, query)?;
        Ok(loaded)
    }

    /// Save the location currently shown, for the signed-in user.
    pub async fn save_current_location(&self) -> Result<SavedLocation, DashboardError> {
        let state = self.weather.state();
        let current = state
            .current_weather
            .ok_or(DashboardError::NoWeatherLoaded)?;

        let Some(user) = self.auth.current_user() else {
            return Err(self.reject(DashboardError::NotLoggedIn));
        };

        let name = current.name.to_lowercase();
        if state
            .saved_locations
            .iter()
            .any(|loc| loc.name.to_lowercase() == name)
        {
            return Err(self.reject(DashboardError::AlreadySaved));
        }

        let location = NewLocation {
            name: current.name,
            lat: current.coord.lat,
            lon: current.coord.lon,
            user_id: user.id,
        };
        Ok(self.weather.save_favorite_location(&location).await?)
    }

    pub async fn select_saved_location(
        &self,
        location: &SavedLocation,
    ) -> Result<(CurrentWeather, ForecastResponse), DashboardError> {
        self.load_location(&location.name).await
    }

    /// Alert text when the current conditions report a thunderstorm.
    pub fn thunderstorm_alert(&self) -> Option<String> {
        let state = self.weather.state();
        let current = state.current_weather?;
        let condition = current.primary_condition()?;

        (condition.main == "Thunderstorm").then(|| {
            format!(
                "Thunderstorms are forecasted in {}. Take necessary precautions and stay indoors if possible.",
                current.name
            )
        })
    }

    fn reject(&self, err: DashboardError) -> DashboardError {
        self.notifier.error(&err.to_string());
        err
    }
}

impl std::fmt::Debug for Dashboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dashboard")
            .field("recent", &self.recent)
            .field("default_location", &self.default_location)
            .finish_non_exhaustive()
    }
}
