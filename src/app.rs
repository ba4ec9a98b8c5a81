//! Application wiring: builds the stores from a [`Config`].

use std::sync::Arc;

use anyhow::{Context, Result};
use skycast_auth::AuthStore;
use skycast_core::{Config, FileStorage, KeyValueStore, Notifier};
use skycast_services::BackendClient;
use skycast_weather::{location, WeatherProvider, WeatherStore};

use crate::dashboard::Dashboard;

/// Shared services for one user profile
pub struct App {
    config: Arc<Config>,
    storage: Arc<dyn KeyValueStore>,
    notifier: Arc<dyn Notifier>,
    weather: Arc<WeatherStore>,
    auth: Arc<AuthStore>,
}

impl App {
    /// Build the application with file-backed storage in `config.config_dir`.
    pub fn new(config: Config, notifier: Arc<dyn Notifier>) -> Result<Self> {
        let storage = FileStorage::open(&config.config_dir)
            .with_context(|| format!("Failed to open storage in {:?}", config.config_dir))?;
        Self::with_storage(config, Arc::new(storage), notifier)
    }

    pub fn with_storage(
        config: Config,
        storage: Arc<dyn KeyValueStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        let timeout = config.request_timeout();

        let backend = BackendClient::new(&config.backend.api_url, timeout)?;
        let provider =
            WeatherProvider::from_config(&config).context("Failed to create weather client")?;
        let geolocator =
            location::from_config(&config).context("Failed to create location service")?;

        let weather = Arc::new(WeatherStore::new(
            provider,
            backend.clone(),
            geolocator,
            notifier.clone(),
        ));
        let auth = Arc::new(AuthStore::new(backend, storage.clone(), notifier.clone()));

        // Restore any remembered session before the first command runs
        auth.check_auth();

        tracing::info!("SkyCast initialized (backend: {})", config.backend.api_url);

        Ok(Self {
            config: Arc::new(config),
            storage,
            notifier,
            weather,
            auth,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn weather(&self) -> &WeatherStore {
        &self.weather
    }

    pub fn auth(&self) -> &AuthStore {
        &self.auth
    }

    /// Dashboard sharing this app's stores.
    pub fn dashboard(&self) -> Dashboard {
        Dashboard::new(
            self.weather.clone(),
            self.auth.clone(),
            self.storage.clone(),
            self.notifier.clone(),
            self.config.weather.default_location.clone(),
        )
    }
}
