//! Centralized error types for SkyCast.
//!
//! The stores never surface raw transport errors to the front end. Every
//! failure is reduced to a display string following one rule:
//! - HTTP status errors use the `message` field of the response body when present
//! - transport failures and bodiless status errors use the operation's fallback
//! - anything else (undecodable payloads) reports [`UNKNOWN_ERROR`]

use thiserror::Error;

/// Message used for failures that are not plain HTTP errors.
pub const UNKNOWN_ERROR: &str = "An unknown error occurred";

/// Failure of a single HTTP exchange with the backend or the weather provider.
#[derive(Debug, Clone, Error)]
pub enum RequestError {
    /// The server answered with a non-success status.
    #[error("HTTP {status}: {}", message.as_deref().unwrap_or("no message"))]
    Status { status: u16, message: Option<String> },

    #[error("Request timed out")]
    Timeout,

    /// The request never produced a response (DNS, refused, reset).
    #[error("Transport error: {0}")]
    Transport(String),

    /// The response arrived but could not be decoded.
    #[error("Invalid response: {0}")]
    Decode(String),
}

impl RequestError {
    /// Resolve the message shown to the user for this failure.
    ///
    /// `fallback` is the operation-specific text used when the server did not
    /// provide a `message` of its own.
    pub fn describe(&self, fallback: &str) -> String {
        match self {
            RequestError::Status {
                message: Some(message),
                ..
            } if !message.is_empty() => message.clone(),
            RequestError::Status { .. } | RequestError::Timeout | RequestError::Transport(_) => {
                fallback.to_string()
            }
            RequestError::Decode(_) => UNKNOWN_ERROR.to_string(),
        }
    }

    /// HTTP status code, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            RequestError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for RequestError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RequestError::Timeout
        } else if err.is_decode() {
            RequestError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            RequestError::Status {
                status: status.as_u16(),
                message: None,
            }
        } else {
            RequestError::Transport(err.to_string())
        }
    }
}

/// Durable client storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to read storage file: {0}")]
    Read(String),

    #[error("Failed to write storage file: {0}")]
    Write(String),
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Configuration parse error: {0}")]
    ParseError(String),
}
