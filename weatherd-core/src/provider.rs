use std::{fmt::Debug, time::Duration};

use async_trait::async_trait;

use crate::{
    Config,
    model::{CitySuggestion, Coordinates, Units, WeatherRecord},
    provider::open_meteo::OpenMeteoProvider,
};

pub mod open_meteo;

/// Per-call options forwarded to the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchParams {
    /// Provider timezone hint, `auto` lets the provider pick the local zone.
    pub timezone: String,
    pub language: String,
    pub units: Units,
}

impl FetchParams {
    pub fn new(language: impl Into<String>, units: Units) -> Self {
        Self { timezone: "auto".to_string(), language: language.into(), units }
    }
}

/// Upstream weather and geocoding source.
///
/// Implementations must be safe to call from many requests at once.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    /// `Ok(None)` means the provider knows no such place.
    async fn resolve_coordinates(
        &self,
        city: &str,
        country: &str,
    ) -> anyhow::Result<Option<Coordinates>>;

    async fn fetch_current(
        &self,
        at: Coordinates,
        params: &FetchParams,
    ) -> anyhow::Result<WeatherRecord>;

    /// Returns current conditions with `hourly` and `daily` populated.
    async fn fetch_forecast(
        &self,
        at: Coordinates,
        days: u32,
        params: &FetchParams,
    ) -> anyhow::Result<WeatherRecord>;

    async fn search_city(&self, query: &str, limit: usize) -> anyhow::Result<Vec<CitySuggestion>>;
}

/// Construct the HTTP provider described by the config.
pub fn provider_from_config(config: &Config) -> anyhow::Result<Box<dyn WeatherProvider>> {
    let provider = OpenMeteoProvider::builder()
        .api_endpoint(&config.api_endpoint)
        .geocoding_endpoint(&config.geocoding_endpoint)
        .geocoding_language(&config.language)
        .timeout(Duration::from_secs(config.upstream_timeout_secs))
        .build()?;

    Ok(Box::new(provider))
}
