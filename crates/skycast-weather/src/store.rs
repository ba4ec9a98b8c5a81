//! Weather state container.
//!
//! Holds the current conditions, forecast series and saved locations behind
//! a `watch` channel so front ends can observe whole-state snapshots. Every
//! failed operation is reported twice: stored in the state (where the state
//! tracks it) and sent to the injected [`Notifier`], then returned.

use std::sync::Arc;

use skycast_core::{Notifier, RequestError, Units};
use skycast_services::{BackendClient, NewLocation, SavedLocation};
use tokio::sync::watch;
use tracing::instrument;

use crate::location::Geolocator;
use crate::provider::WeatherProvider;
use crate::types::{
    Coordinates, CurrentWeather, ForecastEntry, ForecastResponse, LocationQuery, WeatherBundle,
    WeatherError,
};

const WEATHER_FALLBACK: &str = "Failed to fetch weather data";
const FORECAST_FALLBACK: &str = "Failed to fetch forecast data";
const WEATHER_PREFIX: &str = "Weather data error: ";
const FORECAST_PREFIX: &str = "Forecast data error: ";
const SAVE_FALLBACK: &str = "Failed to save location";
const REMOVE_FALLBACK: &str = "Failed to remove location";

/// Snapshot of everything the weather views render.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeatherState {
    pub current_weather: Option<CurrentWeather>,
    /// Forecast series only; the city block is returned to callers but not kept
    pub forecast: Option<Vec<ForecastEntry>>,
    pub saved_locations: Vec<SavedLocation>,
    pub is_loading: bool,
    pub error: Option<String>,
}

pub struct WeatherStore {
    provider: WeatherProvider,
    backend: BackendClient,
    geolocator: Arc<dyn Geolocator>,
    notifier: Arc<dyn Notifier>,
    state: watch::Sender<WeatherState>,
}

impl WeatherStore {
    pub fn new(
        provider: WeatherProvider,
        backend: BackendClient,
        geolocator: Arc<dyn Geolocator>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            provider,
            backend,
            geolocator,
            notifier,
            state: watch::Sender::new(WeatherState::default()),
        }
    }

    /// Current state snapshot.
    pub fn state(&self) -> WeatherState {
        self.state.borrow().clone()
    }

    /// Receiver notified after every state change.
    pub fn subscribe(&self) -> watch::Receiver<WeatherState> {
        self.state.subscribe()
    }

    pub fn units(&self) -> Units {
        self.provider.units()
    }

    /// Fetch and store current conditions for `query`.
    #[instrument(skip(self), fields(location = %query))]
    pub async fn fetch_current_weather(
        &self,
        query: &LocationQuery,
    ) -> Result<CurrentWeather, WeatherError> {
        self.begin_loading();

        match self.provider.current(query).await {
            Ok(current) => {
                self.state.send_modify(|s| {
                    s.current_weather = Some(current.clone());
                    s.is_loading = false;
                });
                Ok(current)
            }
            Err(e) => Err(self.fail(e, WEATHER_FALLBACK, WEATHER_PREFIX)),
        }
    }

    /// Fetch the forecast for `query`; only its series is stored.
    #[instrument(skip(self), fields(location = %query))]
    pub async fn fetch_forecast(
        &self,
        query: &LocationQuery,
    ) -> Result<ForecastResponse, WeatherError> {
        self.begin_loading();

        match self.provider.forecast(query).await {
            Ok(forecast) => {
                self.state.send_modify(|s| {
                    s.forecast = Some(forecast.list.clone());
                    s.is_loading = false;
                });
                Ok(forecast)
            }
            Err(e) => Err(self.fail(e, FORECAST_FALLBACK, FORECAST_PREFIX)),
        }
    }

    /// Fetch current conditions and forecast for a position concurrently.
    ///
    /// Nothing is stored unless both requests succeed.
    #[instrument(skip(self))]
    pub async fn fetch_weather_by_coords(
        &self,
        lat: f64,
        lon: f64,
    ) -> Result<WeatherBundle, WeatherError> {
        self.begin_loading();

        let query = LocationQuery::Coordinates { lat, lon };
        let result = tokio::try_join!(self.provider.current(&query), self.provider.forecast(&query));

        match result {
            Ok((current_weather, forecast)) => {
                self.state.send_modify(|s| {
                    s.current_weather = Some(current_weather.clone());
                    s.forecast = Some(forecast.list.clone());
                    s.is_loading = false;
                });
                Ok(WeatherBundle {
                    current_weather,
                    forecast,
                })
            }
            Err(e) => Err(self.fail(e, WEATHER_FALLBACK, WEATHER_PREFIX)),
        }
    }

    /// Locate the device, then load weather for that position.
    ///
    /// Resolves with the coordinates once the weather fetch has settled.
    #[instrument(skip(self))]
    pub async fn get_user_location(&self) -> Result<Coordinates, WeatherError> {
        let position = match self.geolocator.current_position().await {
            Ok(position) => position,
            Err(e) => {
                tracing::warn!("Geolocation failed: {:?}", e);
                self.notifier.error(&e.to_string());
                return Err(e.into());
            }
        };

        self.fetch_weather_by_coords(position.latitude, position.longitude)
            .await?;

        Ok(Coordinates {
            lat: position.latitude,
            lon: position.longitude,
        })
    }

    /// Save a favorite on the backend and append the stored record.
    ///
    /// Duplicate names are not checked here.
    #[instrument(skip(self), fields(name = %location.name))]
    pub async fn save_favorite_location(
        &self,
        location: &NewLocation,
    ) -> Result<SavedLocation, WeatherError> {
        match self.backend.save_location(location).await {
            Ok(saved) => {
                self.state
                    .send_modify(|s| s.saved_locations.push(saved.clone()));
                self.notifier
                    .success(&format!("{} added to favorites", location.name));
                Ok(saved)
            }
            Err(e) => Err(self.backend_failure(e, SAVE_FALLBACK)),
        }
    }

    /// Replace the saved list with the backend's.
    ///
    /// Failures are logged and yield an empty list with the state untouched,
    /// so startup never blocks on the backend.
    #[instrument(skip(self))]
    pub async fn fetch_saved_locations(&self) -> Vec<SavedLocation> {
        match self.backend.list_locations().await {
            Ok(locations) => {
                tracing::debug!("Loaded {} saved locations", locations.len());
                self.state
                    .send_modify(|s| s.saved_locations = locations.clone());
                locations
            }
            Err(e) => {
                tracing::error!("Failed to fetch saved locations: {}", e);
                Vec::new()
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn remove_saved_location(&self, id: i64) -> Result<(), WeatherError> {
        match self.backend.delete_location(id).await {
            Ok(()) => {
                self.state
                    .send_modify(|s| s.saved_locations.retain(|loc| loc.id != id));
                self.notifier.success("Location removed from favorites");
                Ok(())
            }
            Err(e) => Err(self.backend_failure(e, REMOVE_FALLBACK)),
        }
    }

    fn begin_loading(&self) {
        self.state.send_modify(|s| {
            s.is_loading = true;
            s.error = None;
        });
    }

    fn fail(&self, source: RequestError, fallback: &str, prefix: &str) -> WeatherError {
        let message = source.describe(fallback);
        tracing::warn!("{}{} ({})", prefix, message, source);

        self.state.send_modify(|s| {
            s.error = Some(message.clone());
            s.is_loading = false;
        });
        self.notifier.error(&format!("{}{}", prefix, message));

        WeatherError::Provider { message, source }
    }

    fn backend_failure(&self, source: RequestError, fallback: &str) -> WeatherError {
        let message = source.describe(fallback);
        tracing::warn!("{} ({})", message, source);
        self.notifier.error(&message);
        WeatherError::Backend { message, source }
    }
}

impl std::fmt::Debug for WeatherStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeatherStore")
            .field("provider", &self.provider)
            .field("backend", &self.backend.base_url().as_str())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::{DeniedGeolocator, FixedGeolocator};
    use crate::types::{GeolocationError, Position};
    use skycast_core::{ChannelNotifier, Notification};
    use std::time::Duration;
    use tokio::sync::mpsc::UnboundedReceiver;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn current_json(name: &str) -> serde_json::Value {
        serde_json::json!({
            "coord": {"lat": 51.5, "lon": -0.12},
            "weather": [{"id": 800, "main": "Clear", "description": "clear sky", "icon": "01d"}],
            "main": {"temp": 18.0},
            "dt": 1714560000,
            "name": name
        })
    }

    fn forecast_json() -> serde_json::Value {
        serde_json::json!({
            "cnt": 2,
            "list": [
                {"dt": 1714564800, "main": {"temp": 17.0}},
                {"dt": 1714575600, "main": {"temp": 15.0}}
            ],
            "city": {"name": "London"}
        })
    }

    fn store_with(
        server: &MockServer,
        geolocator: Arc<dyn Geolocator>,
    ) -> (WeatherStore, UnboundedReceiver<Notification>) {
        let provider =
            WeatherProvider::new(&server.uri(), "key", Units::Metric, Duration::from_secs(5))
                .unwrap();
        let backend =
            BackendClient::new(&format!("{}/api", server.uri()), Duration::from_secs(5)).unwrap();
        let (notifier, rx) = ChannelNotifier::new();
        (
            WeatherStore::new(provider, backend, geolocator, Arc::new(notifier)),
            rx,
        )
    }

    fn store(server: &MockServer) -> (WeatherStore, UnboundedReceiver<Notification>) {
        store_with(server, Arc::new(FixedGeolocator::new(51.5, -0.12)))
    }

    /// Fails every lookup with a platform error code.
    struct CodeGeolocator(u16);

    #[async_trait::async_trait]
    impl Geolocator for CodeGeolocator {
        async fn current_position(&self) -> Result<Position, GeolocationError> {
            Err(GeolocationError::from_code(self.0))
        }
    }

    async fn assert_geolocation_code_fails(code: u16, message: &str) {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let (store, mut rx) = store_with(&server, Arc::new(CodeGeolocator(code)));
        let err = store.get_user_location().await.unwrap_err();

        assert_eq!(err.to_string(), message);
        assert_eq!(rx.try_recv().unwrap(), Notification::error(message));
        assert!(rx.try_recv().is_err());
        let state = store.state();
        assert!(state.current_weather.is_none());
        assert!(!state.is_loading);
    }

    #[tokio::test]
    async fn test_fetch_current_weather_stores_payload() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .and(query_param("q", "London"))
            .respond_with(ResponseTemplate::new(200).set_body_json(current_json("London")))
            .mount(&server)
            .await;

        let (store, mut rx) = store(&server);
        let current = store
            .fetch_current_weather(&LocationQuery::name("London"))
            .await
            .unwrap();

        let state = store.state();
        assert_eq!(current.name, "London");
        assert_eq!(state.current_weather.unwrap().name, "London");
        assert!(!state.is_loading);
        assert!(state.error.is_none());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_fetch_current_weather_failure_reports_twice() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "cod": "404",
                "message": "city not found"
            })))
            .mount(&server)
            .await;

        let (store, mut rx) = store(&server);
        let err = store
            .fetch_current_weather(&LocationQuery::name("Atlantis"))
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "city not found");

        let state = store.state();
        assert_eq!(state.error.as_deref(), Some("city not found"));
        assert!(!state.is_loading);
        assert!(state.current_weather.is_none());

        let notification = rx.try_recv().unwrap();
        assert!(notification.is_error());
        assert_eq!(notification.message, "Weather data error: city not found");
    }

    #[tokio::test]
    async fn test_fetch_forecast_bodiless_error_uses_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/forecast"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let (store, mut rx) = store(&server);
        let err = store
            .fetch_forecast(&LocationQuery::name("London"))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Failed to fetch forecast data");
        assert_eq!(
            rx.try_recv().unwrap().message,
            "Forecast data error: Failed to fetch forecast data"
        );
    }

    #[tokio::test]
    async fn test_fetch_forecast_stores_list_only() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/forecast"))
            .respond_with(ResponseTemplate::new(200).set_body_json(forecast_json()))
            .mount(&server)
            .await;

        let (store, _rx) = store(&server);
        let forecast = store
            .fetch_forecast(&LocationQuery::name("London"))
            .await
            .unwrap();

        assert_eq!(forecast.city.unwrap().name, "London");
        assert_eq!(store.state().forecast.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_weather_by_coords_commits_both() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .and(query_param("lat", "51.5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(current_json("London")))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/forecast"))
            .and(query_param("lon", "-0.12"))
            .respond_with(ResponseTemplate::new(200).set_body_json(forecast_json()))
            .expect(1)
            .mount(&server)
            .await;

        let (store, _rx) = store(&server);
        let bundle = store.fetch_weather_by_coords(51.5, -0.12).await.unwrap();

        assert_eq!(bundle.current_weather.name, "London");
        assert_eq!(bundle.forecast.list.len(), 2);
        let state = store.state();
        assert!(state.current_weather.is_some());
        assert_eq!(state.forecast.map(|f| f.len()), Some(2));
    }

    #[tokio::test]
    async fn test_fetch_weather_by_coords_is_all_or_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(ResponseTemplate::new(200).set_body_json(current_json("London")))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/forecast"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let (store, mut rx) = store(&server);
        let err = store.fetch_weather_by_coords(51.5, -0.12).await.unwrap_err();

        assert_eq!(err.to_string(), "Failed to fetch weather data");
        let state = store.state();
        assert!(state.current_weather.is_none());
        assert!(state.forecast.is_none());
        assert_eq!(state.error.as_deref(), Some("Failed to fetch weather data"));
        assert_eq!(
            rx.try_recv().unwrap().message,
            "Weather data error: Failed to fetch weather data"
        );
    }

    #[tokio::test]
    async fn test_get_user_location_fetches_by_position() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(ResponseTemplate::new(200).set_body_json(current_json("London")))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/forecast"))
            .respond_with(ResponseTemplate::new(200).set_body_json(forecast_json()))
            .mount(&server)
            .await;

        let (store, _rx) = store(&server);
        let coords = store.get_user_location().await.unwrap();

        assert_eq!(coords, Coordinates { lat: 51.5, lon: -0.12 });
        assert!(store.state().current_weather.is_some());
    }

    #[tokio::test]
    async fn test_get_user_location_denied() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let (store, mut rx) = store_with(&server, Arc::new(DeniedGeolocator));
        let err = store.get_user_location().await.unwrap_err();

        assert_eq!(err.to_string(), "Location permission denied");
        assert_eq!(
            rx.try_recv().unwrap(),
            Notification::error("Location permission denied")
        );
    }

    #[tokio::test]
    async fn test_get_user_location_unavailable() {
        assert_geolocation_code_fails(
            GeolocationError::POSITION_UNAVAILABLE,
            "Location information unavailable",
        )
        .await;
    }

    #[tokio::test]
    async fn test_get_user_location_timeout() {
        assert_geolocation_code_fails(GeolocationError::TIMEOUT, "Location request timed out")
            .await;
    }

    #[tokio::test]
    async fn test_saved_locations_lifecycle() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/locations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": 1, "userId": 7, "name": "Paris", "lat": 48.85, "lon": 2.35}
            ])))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/locations"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "id": 2, "userId": 7, "name": "London", "lat": 51.5, "lon": -0.12
            })))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/api/locations/1"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let (store, mut rx) = store(&server);

        assert_eq!(store.fetch_saved_locations().await.len(), 1);

        let saved = store
            .save_favorite_location(&NewLocation {
                name: "London".into(),
                lat: 51.5,
                lon: -0.12,
                user_id: 7,
            })
            .await
            .unwrap();
        assert_eq!(saved.id, 2);
        assert_eq!(store.state().saved_locations.len(), 2);
        assert_eq!(
            rx.try_recv().unwrap(),
            Notification::success("London added to favorites")
        );

        store.remove_saved_location(1).await.unwrap();
        assert_eq!(
            rx.try_recv().unwrap(),
            Notification::success("Location removed from favorites")
        );

        let names: Vec<String> = store
            .state()
            .saved_locations
            .into_iter()
            .map(|l| l.name)
            .collect();
        assert_eq!(names, vec!["London"]);
    }

    #[tokio::test]
    async fn test_fetch_saved_locations_swallows_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/locations"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let (store, mut rx) = store(&server);
        assert!(store.fetch_saved_locations().await.is_empty());
        assert!(store.state().error.is_none());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_remove_failure_uses_server_message() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/locations/9"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "message": "Location not found"
            })))
            .mount(&server)
            .await;

        let (store, mut rx) = store(&server);
        let err = store.remove_saved_location(9).await.unwrap_err();

        assert_eq!(err.to_string(), "Location not found");
        assert_eq!(rx.try_recv().unwrap(), Notification::error("Location not found"));
    }

    #[tokio::test]
    async fn test_subscribers_see_loading_settle() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(ResponseTemplate::new(200).set_body_json(current_json("Oslo")))
            .mount(&server)
            .await;

        let (store, _rx) = store(&server);
        let mut rx = store.subscribe();

        store
            .fetch_current_weather(&LocationQuery::name("Oslo"))
            .await
            .unwrap();

        assert!(rx.has_changed().unwrap());
        let seen = rx.borrow_and_update().clone();
        assert!(!seen.is_loading);
        assert_eq!(seen.current_weather.unwrap().name, "Oslo");
    }
}
