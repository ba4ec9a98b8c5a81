//! Clients for the SkyCast backend service.

pub mod backend;
pub mod models;

pub use backend::BackendClient;
pub use models::{LoginCredentials, NewLocation, RegisterCredentials, SavedLocation, UserRecord};
