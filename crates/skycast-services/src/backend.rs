//! HTTP client for the SkyCast backend (authentication and saved locations).

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use skycast_core::http::{build_client, ensure_success, read_json};
use skycast_core::RequestError;
use tracing::instrument;
use url::Url;

use crate::models::{
    AuthResponse, LoginCredentials, NewLocation, RegisterCredentials, SavedLocation, UserRecord,
};

/// Backend API client
#[derive(Debug, Clone)]
pub struct BackendClient {
    base_url: Url,
    client: Arc<Client>,
}

impl BackendClient {
    /// Create a client for the API rooted at `base_url` (e.g. `http://localhost:2033/api`).
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        // Url::join drops the last path segment unless the base ends in '/'
        let normalized = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalized)
            .with_context(|| format!("Invalid backend URL: {}", base_url))?;

        let client = build_client(timeout).context("Failed to create HTTP client")?;

        Ok(Self {
            base_url,
            client: Arc::new(client),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, RequestError> {
        self.base_url
            .join(path)
            .map_err(|e| RequestError::Transport(format!("Invalid endpoint {}: {}", path, e)))
    }

    /// `POST /login`
    #[instrument(skip(self, credentials), fields(username = %credentials.username))]
    pub async fn login(&self, credentials: &LoginCredentials) -> Result<UserRecord, RequestError> {
        let url = self.endpoint("login")?;
        let response = self.client.post(url).json(credentials).send().await?;
        let body: AuthResponse = read_json(response).await?;
        let user = body.into_user();

        tracing::info!("Logged in as user {}", user.id);
        Ok(user)
    }

    /// `POST /register`
    #[instrument(skip(self, credentials), fields(username = %credentials.username))]
    pub async fn register(
        &self,
        credentials: &RegisterCredentials,
    ) -> Result<UserRecord, RequestError> {
        let url = self.endpoint("register")?;
        let response = self.client.post(url).json(credentials).send().await?;
        let body: AuthResponse = read_json(response).await?;
        let user = body.into_user();

        tracing::info!("Registered user {}", user.id);
        Ok(user)
    }

    /// `GET /locations`
    #[instrument(skip(self))]
    pub async fn list_locations(&self) -> Result<Vec<SavedLocation>, RequestError> {
        let url = self.endpoint("locations")?;
        let response = self.client.get(url).send().await?;
        let locations: Vec<SavedLocation> = read_json(response).await?;

        tracing::debug!("Fetched {} saved locations", locations.len());
        Ok(locations)
    }

    /// `POST /locations`; returns the stored record with its server-assigned id.
    #[instrument(skip(self), fields(name = %location.name))]
    pub async fn save_location(&self, location: &NewLocation) -> Result<SavedLocation, RequestError> {
        let url = self.endpoint("locations")?;
        let response = self.client.post(url).json(location).send().await?;
        let saved: SavedLocation = read_json(response).await?;

        tracing::info!("Saved location {} with id {}", saved.name, saved.id);
        Ok(saved)
    }

    /// `DELETE /locations/{id}`
    #[instrument(skip(self))]
    pub async fn delete_location(&self, id: i64) -> Result<(), RequestError> {
        let url = self.endpoint(&format!("locations/{}", id))?;
        let response = self.client.delete(url).send().await?;
        ensure_success(response).await?;

        tracing::info!("Deleted location {}", id);
        Ok(())
    }
}
