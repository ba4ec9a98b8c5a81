//! Session handling for SkyCast
//!
//! Login, registration and logout against the backend, with the signed-in
//! user remembered in durable client storage.

pub mod store;

pub use store::{AuthError, AuthStore, Session};
