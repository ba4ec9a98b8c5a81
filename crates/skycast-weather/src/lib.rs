//! Weather side of SkyCast
//!
//! OpenWeatherMap client, device location, display formatting, recent
//! searches and the observable weather store.

pub mod types;
pub mod format;
pub mod location;
pub mod provider;
pub mod recent;
pub mod store;

pub use types::*;
pub use location::Geolocator;
pub use provider::WeatherProvider;
pub use recent::RecentSearches;
pub use store::{WeatherState, WeatherStore};
