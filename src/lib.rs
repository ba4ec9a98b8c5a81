//! SkyCast: weather dashboard client.

pub mod app;
pub mod dashboard;
pub mod render;

pub use app::App;
pub use dashboard::{Dashboard, DashboardError, StartLocation};
