//! Core library for the `weatherd` service.
//!
//! This crate defines:
//! - Shared domain models (requests, responses, weather records)
//! - The request orchestrator with its cache and statistics
//! - Abstraction over the upstream weather provider, plus an Open-Meteo client
//! - Configuration handling
//!
//! It is used by `weatherd-cli`, but can also be embedded behind any other transport.

pub mod cache;
pub mod condition;
pub mod config;
pub mod error;
pub mod model;
pub mod provider;
pub mod service;
pub mod stats;

pub use cache::WeatherCache;
pub use config::Config;
pub use error::{ErrorKind, WeatherError};
pub use model::{
    CitySuggestion, Coordinates, DailyPoint, HourlyPoint, RequestKind, Units, WeatherRecord,
    WeatherRequest, WeatherResponse,
};
pub use provider::{FetchParams, WeatherProvider};
pub use service::WeatherService;
pub use stats::{Statistics, StatisticsTracker};
