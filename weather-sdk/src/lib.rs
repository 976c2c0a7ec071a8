//! Client library for current weather conditions by city.
//!
//! This crate defines:
//! - Configuration loading (TOML with dotted option names)
//! - An expiring, size-bounded LRU cache of recent results
//! - A pluggable fetcher, with an HTTP implementation for OpenWeather-style APIs
//! - The [`WeatherSdk`] handle, which ties these together and optionally
//!   keeps cached cities refreshed in the background
//!
//! It is used by `weather-cli`, but is meant to be embedded in any application.

pub mod cache;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod model;
pub mod refresher;
pub mod registry;
pub mod sdk;

#[cfg(test)]
mod test_support;

pub use cache::WeatherCache;
pub use config::{SdkConfig, WeatherMode};
pub use error::{ErrorKind, SdkError};
pub use fetcher::{HttpFetcher, WeatherFetcher};
pub use model::{Condition, SunTimes, Temperature, WeatherRecord, Wind};
pub use sdk::{WeatherSdk, WeatherSdkBuilder};
