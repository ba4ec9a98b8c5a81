//! Shared HTTP plumbing for the backend and weather provider clients.

use std::time::Duration;

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;

use crate::error::RequestError;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

const USER_AGENT: &str = concat!("SkyCast/", env!("CARGO_PKG_VERSION"));

/// Build the HTTP client used by every SkyCast service.
pub fn build_client(timeout: Duration) -> Result<Client, RequestError> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| RequestError::Transport(format!("Failed to create HTTP client: {}", e)))
}

/// Decode a JSON body, or turn a failed response into a [`RequestError`].
pub async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, RequestError> {
    let status = response.status();
    if !status.is_success() {
        return Err(error_from_response(response).await);
    }

    let body = response.bytes().await?;
    serde_json::from_slice(&body).map_err(|e| {
        tracing::debug!("Failed to decode {} response body: {}", status, e);
        RequestError::Decode(e.to_string())
    })
}

/// Check that a response succeeded, discarding its body.
pub async fn ensure_success(response: Response) -> Result<(), RequestError> {
    if response.status().is_success() {
        Ok(())
    } else {
        Err(error_from_response(response).await)
    }
}

/// Build a status error, extracting a `message` field from a JSON body if there is one.
async fn error_from_response(response: Response) -> RequestError {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    let message = extract_message(&text);

    tracing::debug!(
        "Request failed with status {} (message: {:?})",
        status,
        message
    );

    RequestError::Status {
        status: status.as_u16(),
        message,
    }
}

/// Pull a string `message` field out of an error body. Plain-text bodies yield `None`.
pub fn extract_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("message")
        .and_then(serde_json::Value::as_str)
        .map(str::to_string)
}
