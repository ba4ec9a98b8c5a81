//! Shared foundations for SkyCast: configuration, errors, HTTP helpers,
//! durable client storage and notifications.

pub mod config;
pub mod error;
pub mod http;
pub mod notify;
pub mod storage;

pub use config::{BackendConfig, Config, LocationConfig, Units, ValidationResult, WeatherConfig};
pub use error::{ConfigError, RequestError, StorageError, UNKNOWN_ERROR};
pub use notify::{ChannelNotifier, Notification, NotificationLevel, Notifier, SilentNotifier, TracingNotifier};
pub use storage::{FileStorage, KeyValueStore, MemoryStorage};

use anyhow::Result;

/// Initialize logging for the application
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("SkyCast core initialized");
    Ok(())
}
