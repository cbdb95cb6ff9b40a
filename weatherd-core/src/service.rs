//! Request orchestration: dispatch, caching, statistics.
//!
//! A [`WeatherService`] is shared between concurrently running requests
//! (usually behind an `Arc`). No lock is ever held while a provider call is in
//! flight, so two simultaneous misses for the same key may both reach the
//! provider; the later write wins.

use std::{
    future::Future,
    sync::Arc,
    time::{Duration, Instant},
};

use parking_lot::RwLock;
use tokio::task::JoinHandle;

use crate::{
    cache::{WeatherCache, current_weather_key, forecast_key},
    config::Config,
    error::WeatherError,
    model::{Coordinates, RequestKind, Units, WeatherRecord, WeatherRequest, WeatherResponse},
    provider::{FetchParams, WeatherProvider, provider_from_config},
    stats::{Statistics, StatisticsTracker},
};

/// Day count used when a forecast asks for zero or fewer days.
pub const DEFAULT_FORECAST_DAYS: u32 = 3;
/// Longest forecast the provider serves.
pub const MAX_FORECAST_DAYS: u32 = 16;
/// Upper bound for the sweep period, so the interval arithmetic stays in range.
pub const MAX_CLEANUP_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone)]
struct Settings {
    cache_enabled: bool,
    language: String,
    units: Units,
    upstream_timeout: Duration,
    search_limit: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            language: "zh".to_string(),
            units: Units::Metric,
            upstream_timeout: Duration::from_secs(10),
            search_limit: 10,
        }
    }
}

#[derive(Debug)]
pub struct WeatherService {
    provider: Arc<dyn WeatherProvider>,
    /// Swapped out wholesale when the TTL policy changes.
    cache: RwLock<Arc<WeatherCache>>,
    settings: RwLock<Settings>,
    stats: StatisticsTracker,
}

impl WeatherService {
    pub fn new(provider: Arc<dyn WeatherProvider>) -> Self {
        Self {
            provider,
            cache: RwLock::new(Arc::new(WeatherCache::default())),
            settings: RwLock::new(Settings::default()),
            stats: StatisticsTracker::new(),
        }
    }

    /// Build the HTTP provider from `config` and apply every setting.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        config.validate()?;
        let provider: Arc<dyn WeatherProvider> = Arc::from(provider_from_config(config)?);
        Ok(Self::with_config(provider, config))
    }

    pub fn with_config(provider: Arc<dyn WeatherProvider>, config: &Config) -> Self {
        let service = Self::new(provider);
        service.set_cache_ttl(config.cache_ttl());
        *service.settings.write() = Settings {
            cache_enabled: config.cache_enabled,
            language: config.language.clone(),
            units: config.units,
            upstream_timeout: config.upstream_timeout(),
            search_limit: config.search_limit.max(1),
        };
        service
    }

    /// Handle one request. Never fails: errors come back as `success = false`.
    pub async fn process(&self, request: &WeatherRequest) -> WeatherResponse {
        self.track(self.dispatch(request)).await
    }

    /// Decode a JSON request envelope and handle it like [`Self::process`].
    pub async fn process_json(&self, body: &str) -> WeatherResponse {
        self.track(async {
            let request = decode_request(body)?;
            self.dispatch(&request).await
        })
        .await
    }

    async fn track<F>(&self, handler: F) -> WeatherResponse
    where
        F: Future<Output = Result<WeatherResponse, WeatherError>>,
    {
        let started = Instant::now();
        self.stats.record_request_start();

        let result = handler.await;

        let elapsed = started.elapsed();
        self.stats.record_latency(elapsed);

        match result {
            Ok(response) => {
                tracing::debug!(elapsed_ms = elapsed.as_millis() as u64, "request handled");
                response
            }
            Err(err) => {
                tracing::warn!(kind = ?err.kind(), error = %err, "request failed");
                WeatherResponse::failure(&err)
            }
        }
    }

    async fn dispatch(&self, request: &WeatherRequest) -> Result<WeatherResponse, WeatherError> {
        match &request.kind {
            RequestKind::CurrentWeather { city, country } => {
                self.handle_current(request, city, country).await
            }
            RequestKind::Forecast { city, country, days } => {
                self.handle_forecast(request, city, country, *days).await
            }
            RequestKind::SearchCity { query } => self.handle_search(query).await,
            RequestKind::GeoLocation { latitude, longitude } => {
                self.handle_geo(request, Coordinates::new(*latitude, *longitude)).await
            }
        }
    }

    async fn handle_current(
        &self,
        request: &WeatherRequest,
        city: &str,
        country: &str,
    ) -> Result<WeatherResponse, WeatherError> {
        let params = self.fetch_params(request);
        let key = current_weather_key(city, country, params.units);

        if let Some(mut record) = self.active_cache().and_then(|cache| cache.get(&key)) {
            self.stats.record_cache_hit();
            stamp_names(&mut record, city, country);
            record.derive_labels(&params.language);
            return Ok(WeatherResponse::current(record));
        }

        let at = self.resolve(city, country).await?;
        let mut record = self
            .call_upstream("current weather", self.provider.fetch_current(at, &params))
            .await?;

        stamp_location(&mut record, city, country, at);
        record.derive_labels(&params.language);

        if let Some(cache) = self.active_cache() {
            cache.put(key, record.clone(), None);
        }
        self.stats.record_upstream_call();

        Ok(WeatherResponse::current(record))
    }

    async fn handle_forecast(
        &self,
        request: &WeatherRequest,
        city: &str,
        country: &str,
        days: i32,
    ) -> Result<WeatherResponse, WeatherError> {
        let days = effective_days(days);
        let params = self.fetch_params(request);
        let key = forecast_key(city, country, days, params.units);

        if let Some(mut record) = self.active_cache().and_then(|cache| cache.get(&key)) {
            self.stats.record_cache_hit();
            stamp_names(&mut record, city, country);
            return Ok(WeatherResponse::forecast(project_daily(&record, &params.language)));
        }

        let at = self.resolve(city, country).await?;
        let mut record = self
            .call_upstream("forecast", self.provider.fetch_forecast(at, days, &params))
            .await?;

        stamp_location(&mut record, city, country, at);
        record.derive_labels(&params.language);

        if let Some(cache) = self.active_cache() {
            cache.put(key, record.clone(), None);
        }
        self.stats.record_upstream_call();

        Ok(WeatherResponse::forecast(project_daily(&record, &params.language)))
    }

    async fn handle_search(&self, query: &str) -> Result<WeatherResponse, WeatherError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(WeatherError::Validation("search query must not be empty".to_string()));
        }

        let limit = self.settings.read().search_limit;
        let mut suggestions = self
            .call_upstream("city search", self.provider.search_city(query, limit))
            .await?;

        if suggestions.is_empty() {
            return Err(WeatherError::LocationNotFound(query.to_string()));
        }
        suggestions.truncate(limit);

        Ok(WeatherResponse::suggestions(suggestions))
    }

    async fn handle_geo(
        &self,
        request: &WeatherRequest,
        at: Coordinates,
    ) -> Result<WeatherResponse, WeatherError> {
        if at.is_origin() {
            return Err(WeatherError::Validation(
                "coordinates (0, 0) are ambiguous and not accepted".to_string(),
            ));
        }
        if !at.is_valid() {
            return Err(WeatherError::Validation(format!(
                "coordinates ({}, {}) are out of range",
                at.latitude, at.longitude
            )));
        }

        let params = self.fetch_params(request);
        let mut record = self
            .call_upstream("current weather", self.provider.fetch_current(at, &params))
            .await?;

        record.latitude = at.latitude;
        record.longitude = at.longitude;
        record.derive_labels(&params.language);
        self.stats.record_upstream_call();

        Ok(WeatherResponse::current(record))
    }

    async fn resolve(&self, city: &str, country: &str) -> Result<Coordinates, WeatherError> {
        if city.trim().is_empty() {
            return Err(WeatherError::Validation("city name must not be empty".to_string()));
        }

        let found = self
            .call_upstream("coordinate lookup", self.provider.resolve_coordinates(city, country))
            .await?;

        found.ok_or_else(|| WeatherError::LocationNotFound(describe_location(city, country)))
    }

    /// Run a provider call under the configured timeout.
    async fn call_upstream<T, F>(&self, operation: &'static str, call: F) -> Result<T, WeatherError>
    where
        F: Future<Output = anyhow::Result<T>>,
    {
        let timeout = self.settings.read().upstream_timeout;

        match tokio::time::timeout(timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => {
                tracing::warn!(operation, error = %format!("{err:#}"), "upstream call failed");
                Err(WeatherError::upstream(err))
            }
            Err(_) => {
                tracing::warn!(operation, timeout_ms = timeout.as_millis() as u64, "upstream call timed out");
                Err(WeatherError::Upstream(format!(
                    "{operation} timed out after {}ms",
                    timeout.as_millis()
                )))
            }
        }
    }

    fn fetch_params(&self, request: &WeatherRequest) -> FetchParams {
        let settings = self.settings.read();
        let language = request
            .language
            .as_deref()
            .filter(|l| !l.trim().is_empty())
            .unwrap_or(&settings.language);

        FetchParams::new(language, request.units.unwrap_or(settings.units))
    }

    fn active_cache(&self) -> Option<Arc<WeatherCache>> {
        if self.settings.read().cache_enabled { Some(self.cache.read().clone()) } else { None }
    }

    pub fn set_cache_enabled(&self, enabled: bool) {
        self.settings.write().cache_enabled = enabled;
        tracing::info!(enabled, "cache toggled");
    }

    /// Replace the cache with an empty one using `ttl` as its default.
    pub fn set_cache_ttl(&self, ttl: Duration) {
        *self.cache.write() = Arc::new(WeatherCache::new(ttl));
        tracing::info!(ttl_secs = ttl.as_secs(), "cache recreated with new ttl");
    }

    pub fn set_language(&self, language: impl Into<String>) {
        let language = language.into();
        tracing::info!(language = %language, "default language changed");
        self.settings.write().language = language;
    }

    pub fn set_units(&self, units: Units) {
        self.settings.write().units = units;
        tracing::info!(units = %units, "default units changed");
    }

    pub fn set_upstream_timeout(&self, timeout: Duration) {
        self.settings.write().upstream_timeout = timeout;
    }

    pub fn set_search_limit(&self, limit: usize) {
        self.settings.write().search_limit = limit.max(1);
    }

    pub fn get_statistics(&self) -> Statistics {
        self.stats.snapshot()
    }

    pub fn cache_enabled(&self) -> bool {
        self.settings.read().cache_enabled
    }

    pub fn language(&self) -> String {
        self.settings.read().language.clone()
    }

    pub fn units(&self) -> Units {
        self.settings.read().units
    }

    pub fn cache_ttl(&self) -> Duration {
        self.cache.read().default_ttl()
    }

    pub fn cached_entries(&self) -> usize {
        self.cache.read().len()
    }

    pub fn clear_cache(&self) -> usize {
        let removed = self.cache.read().clear();
        tracing::info!(removed, "cache cleared");
        removed
    }

    pub fn cleanup_cache(&self) -> usize {
        self.cache.read().cleanup()
    }

    /// Sweep expired cache entries every `every` until the service is dropped.
    pub fn spawn_cleanup_task(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let service = Arc::downgrade(self);
        let every = every.clamp(Duration::from_millis(1), MAX_CLEANUP_INTERVAL);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            // the first tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let Some(service) = service.upgrade() else { break };

                let removed = service.cleanup_cache();
                if removed > 0 {
                    tracing::debug!(removed, "swept expired cache entries");
                }
            }
        })
    }
}

fn decode_request(body: &str) -> Result<WeatherRequest, WeatherError> {
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| WeatherError::Validation(format!("malformed request: {e}")))?;

    let kind = match value.get("type").and_then(serde_json::Value::as_str) {
        Some(kind) if RequestKind::NAMES.contains(&kind) => kind.to_string(),
        Some(other) => return Err(WeatherError::UnknownRequestType(other.to_string())),
        None => return Err(WeatherError::UnknownRequestType("unspecified".to_string())),
    };

    serde_json::from_value(value)
        .map_err(|e| WeatherError::Validation(format!("malformed {kind} request: {e}")))
}

fn effective_days(requested: i32) -> u32 {
    match u32::try_from(requested) {
        Ok(0) | Err(_) => DEFAULT_FORECAST_DAYS,
        Ok(days) => days.min(MAX_FORECAST_DAYS),
    }
}

/// The provider doesn't know the caller's name for the place.
fn stamp_location(record: &mut WeatherRecord, city: &str, country: &str, at: Coordinates) {
    stamp_names(record, city, country);
    record.latitude = at.latitude;
    record.longitude = at.longitude;
}

/// Cached records are shared between spellings, so names follow the current request.
fn stamp_names(record: &mut WeatherRecord, city: &str, country: &str) {
    record.city = city.trim().to_string();
    record.country = country.trim().to_string();
}

fn project_daily(record: &WeatherRecord, language: &str) -> Vec<WeatherRecord> {
    record
        .daily
        .iter()
        .map(|day| {
            let mut projected = WeatherRecord::from_daily(day, &record.city, &record.country, language);
            projected.latitude = record.latitude;
            projected.longitude = record.longitude;
            projected.timezone = record.timezone.clone();
            projected
        })
        .collect()
}

fn describe_location(city: &str, country: &str) -> String {
    let country = country.trim();
    if country.is_empty() { city.trim().to_string() } else { format!("{}, {country}", city.trim()) }
}
