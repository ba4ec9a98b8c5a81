//! Observable authentication state.

use std::sync::Arc;

use skycast_core::storage::USER_KEY;
use skycast_core::{KeyValueStore, Notifier, RequestError};
use skycast_services::{BackendClient, LoginCredentials, RegisterCredentials, UserRecord};
use thiserror::Error;
use tokio::sync::watch;
use tracing::instrument;

const LOGIN_FALLBACK: &str = "Failed to login";
const REGISTER_FALLBACK: &str = "Registration failed";

/// Authentication failures. `Display` is the message shown to the user.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("{message}")]
    Request {
        message: String,
        #[source]
        source: RequestError,
    },
}

/// Snapshot of the current session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub user: Option<UserRecord>,
    pub is_authenticated: bool,
    pub is_loading: bool,
    pub error: Option<String>,
}

pub struct AuthStore {
    backend: BackendClient,
    storage: Arc<dyn KeyValueStore>,
    notifier: Arc<dyn Notifier>,
    state: watch::Sender<Session>,
}

impl AuthStore {
    pub fn new(
        backend: BackendClient,
        storage: Arc<dyn KeyValueStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            backend,
            storage,
            notifier,
            state: watch::Sender::new(Session::default()),
        }
    }

    pub fn session(&self) -> Session {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    pub fn current_user(&self) -> Option<UserRecord> {
        self.state.borrow().user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated
    }

    #[instrument(skip(self, credentials), fields(username = %credentials.username))]
    pub async fn login(&self, credentials: &LoginCredentials) -> Result<UserRecord, AuthError> {
        self.begin_loading();

        match self.backend.login(credentials).await {
            Ok(user) => {
                self.sign_in(&user);
                self.notifier.success("Successfully logged in!");
                Ok(user)
            }
            Err(e) => Err(self.fail_request(e, LOGIN_FALLBACK)),
        }
    }

    /// Create an account and sign in. Mismatched passwords fail before any request.
    #[instrument(skip(self, credentials), fields(username = %credentials.username))]
    pub async fn register(
        &self,
        credentials: &RegisterCredentials,
    ) -> Result<UserRecord, AuthError> {
        self.begin_loading();

        if !credentials.passwords_match() {
            let err = AuthError::PasswordMismatch;
            self.record_failure(&err.to_string());
            return Err(err);
        }

        match self.backend.register(credentials).await {
            Ok(user) => {
                self.sign_in(&user);
                self.notifier.success("Registration successful!");
                Ok(user)
            }
            Err(e) => Err(self.fail_request(e, REGISTER_FALLBACK)),
        }
    }

    /// Forget the user locally. There is no backend session to end.
    pub fn logout(&self) {
        self.state.send_modify(|s| {
            s.user = None;
            s.is_authenticated = false;
        });

        if let Err(e) = self.storage.remove_item(USER_KEY) {
            tracing::warn!("Failed to clear stored user: {}", e);
        }

        tracing::info!("Logged out");
        self.notifier.success("Logged out successfully");
    }

    /// Restore the session from storage. Returns whether a user was found.
    pub fn check_auth(&self) -> bool {
        let user = match self.storage.get_item(USER_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<UserRecord>(&raw) {
                Ok(user) => Some(user),
                Err(e) => {
                    tracing::warn!("Ignoring malformed stored user: {}", e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("Failed to read stored user: {}", e);
                None
            }
        };

        let authenticated = user.is_some();
        if let Some(user) = &user {
            tracing::debug!("Restored session for {}", user.username);
        }

        self.state.send_modify(|s| {
            s.user = user;
            s.is_authenticated = authenticated;
        });
        authenticated
    }

    fn begin_loading(&self) {
        self.state.send_modify(|s| {
            s.is_loading = true;
            s.error = None;
        });
    }

    fn sign_in(&self, user: &UserRecord) {
        self.state.send_modify(|s| {
            s.user = Some(user.clone());
            s.is_authenticated = true;
            s.is_loading = false;
            s.error = None;
        });

        // The session stays valid in memory even if it cannot be remembered
        match serde_json::to_string(user) {
            Ok(json) => {
                if let Err(e) = self.storage.set_item(USER_KEY, &json) {
                    tracing::warn!("Failed to persist user: {}", e);
                }
            }
            Err(e) => tracing::warn!("Failed to serialize user: {}", e),
        }

        tracing::info!("Signed in as {}", user.username);
    }

    fn fail_request(&self, source: RequestError, fallback: &str) -> AuthError {
        let message = source.describe(fallback);
        tracing::warn!("{} ({})", message, source);
        self.record_failure(&message);
        AuthError::Request { message, source }
    }

    fn record_failure(&self, message: &str) {
        self.state.send_modify(|s| {
            s.error = Some(message.to_string());
            s.is_loading = false;
        });
        self.notifier.error(message);
    }
}

impl std::fmt::Debug for AuthStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthStore")
            .field("backend", &self.backend.base_url().as_str())
            .field("session", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}
