//! OpenWeatherMap client for current conditions and 3-hourly forecasts.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use skycast_core::http::{build_client, read_json};
use skycast_core::{Config, RequestError, Units};
use tracing::instrument;

use crate::types::{CurrentWeather, ForecastResponse, LocationQuery};

#[derive(Debug, Clone)]
pub struct WeatherProvider {
    client: Arc<Client>,
    base_url: String,
    api_key: String,
    units: Units,
}

impl WeatherProvider {
    pub fn new(
        base_url: &str,
        api_key: &str,
        units: Units,
        timeout: Duration,
    ) -> Result<Self, RequestError> {
        let client = build_client(timeout)?;

        Ok(Self {
            client: Arc::new(client),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            units,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, RequestError> {
        Self::new(
            &config.weather.api_url,
            &config.weather.api_key,
            config.weather.units,
            config.request_timeout(),
        )
    }

    /// Unit system sent with every request.
    pub fn units(&self) -> Units {
        self.units
    }

    /// `GET /weather`
    #[instrument(skip(self), fields(location = %query), level = "debug")]
    pub async fn current(&self, query: &LocationQuery) -> Result<CurrentWeather, RequestError> {
        let current: CurrentWeather = self.get("weather", query).await?;
        tracing::debug!("Current weather for {}: {}", current.name, current.main.temp);
        Ok(current)
    }

    /// `GET /forecast`
    #[instrument(skip(self), fields(location = %query), level = "debug")]
    pub async fn forecast(&self, query: &LocationQuery) -> Result<ForecastResponse, RequestError> {
        let forecast: ForecastResponse = self.get("forecast", query).await?;
        tracing::debug!("Forecast with {} entries", forecast.list.len());
        Ok(forecast)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &LocationQuery,
    ) -> Result<T, RequestError> {
        let url = format!("{}/{}", self.base_url, endpoint);

        let mut params = query.params();
        params.push(("appid", self.api_key.clone()));
        params.push(("units", self.units.as_str().to_string()));

        let response = self.client.get(&url).query(&params).send().await?;
        read_json(response).await
    }
}
