//! Device position lookup.
//!
//! A terminal has no browser location service, so the position comes from
//! configuration or an IP geolocation endpoint. Every source reports
//! failures with the platform error codes of [`GeolocationError`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use skycast_core::http::build_client;
use skycast_core::{Config, RequestError};

use crate::types::{GeolocationError, Position};

/// Source of the device's current position.
#[async_trait]
pub trait Geolocator: Send + Sync {
    async fn current_position(&self) -> Result<Position, GeolocationError>;
}

/// Build the geolocator described by `config.location`.
pub fn from_config(config: &Config) -> Result<Arc<dyn Geolocator>, RequestError> {
    let location = &config.location;

    if !location.enabled {
        return Ok(Arc::new(DeniedGeolocator));
    }
    if let Some((latitude, longitude)) = location.fixed_position() {
        return Ok(Arc::new(FixedGeolocator::new(latitude, longitude)));
    }
    Ok(Arc::new(IpGeolocator::new(
        &location.lookup_url,
        config.request_timeout(),
    )?))
}

/// Always reports the same position.
#[derive(Debug, Clone, Copy)]
pub struct FixedGeolocator {
    position: Position,
}

impl FixedGeolocator {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            position: Position {
                latitude,
                longitude,
                accuracy_meters: None,
            },
        }
    }
}

#[async_trait]
impl Geolocator for FixedGeolocator {
    async fn current_position(&self) -> Result<Position, GeolocationError> {
        Ok(self.position)
    }
}

/// The user turned location access off.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeniedGeolocator;

#[async_trait]
impl Geolocator for DeniedGeolocator {
    async fn current_position(&self) -> Result<Position, GeolocationError> {
        Err(GeolocationError::PermissionDenied)
    }
}

/// No location capability at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedGeolocator;

#[async_trait]
impl Geolocator for UnsupportedGeolocator {
    async fn current_position(&self) -> Result<Position, GeolocationError> {
        Err(GeolocationError::Unsupported)
    }
}

/// Accepts both the ip-api.com (`status`, `lat`/`lon`) and the ipwho.is
/// (`success`, `latitude`/`longitude`) response shapes.
#[derive(Debug, Deserialize)]
struct IpLookupResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    success: Option<bool>,
    #[serde(default, alias = "latitude")]
    lat: Option<f64>,
    #[serde(default, alias = "longitude")]
    lon: Option<f64>,
    #[serde(default)]
    message: Option<String>,
}

impl IpLookupResponse {
    fn succeeded(&self) -> bool {
        self.status.as_deref().map_or(true, |s| s == "success") && self.success != Some(false)
    }
}

/// Coarse position from an IP geolocation endpoint.
#[derive(Debug, Clone)]
pub struct IpGeolocator {
    client: Arc<Client>,
    lookup_url: String,
}

/// IP lookups are city-level at best.
const IP_ACCURACY_METERS: f64 = 5_000.0;

impl IpGeolocator {
    pub fn new(lookup_url: &str, timeout: Duration) -> Result<Self, RequestError> {
        Ok(Self {
            client: Arc::new(build_client(timeout)?),
            lookup_url: lookup_url.to_string(),
        })
    }
}

#[async_trait]
impl Geolocator for IpGeolocator {
    async fn current_position(&self) -> Result<Position, GeolocationError> {
        let response = self
            .client
            .get(&self.lookup_url)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GeolocationError::Timeout
                } else {
                    tracing::debug!("IP geolocation request failed: {}", e);
                    GeolocationError::PositionUnavailable
                }
            })?;

        if !response.status().is_success() {
            tracing::debug!("IP geolocation returned status {}", response.status());
            return Err(GeolocationError::PositionUnavailable);
        }

        let body: IpLookupResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                GeolocationError::Timeout
            } else {
                GeolocationError::Other(e.to_string())
            }
        })?;

        match (body.succeeded(), body.lat, body.lon) {
            (true, Some(latitude), Some(longitude)) => {
                tracing::info!("Located via IP: {}, {}", latitude, longitude);
                Ok(Position {
                    latitude,
                    longitude,
                    accuracy_meters: Some(IP_ACCURACY_METERS),
                })
            }
            _ => {
                tracing::debug!(
                    "IP geolocation failed: {}",
                    body.message.as_deref().unwrap_or("no position in response")
                );
                Err(GeolocationError::PositionUnavailable)
            }
        }
    }
}
