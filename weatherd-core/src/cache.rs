//! In-memory, process-lifetime cache of weather records.

use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use parking_lot::Mutex;

use crate::model::{Units, WeatherRecord};

/// Five minutes, same as the service default.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
struct CacheEntry {
    record: WeatherRecord,
    created_at: Instant,
    /// `None` when the TTL reaches past what `Instant` can represent.
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// Key -> record map with per-entry expiry.
///
/// Every operation takes the single lock for its own duration only. Records
/// are cloned in and out, so callers never hold references into the map.
#[derive(Debug)]
pub struct WeatherCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    default_ttl: Duration,
}

impl Default for WeatherCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl WeatherCache {
    pub fn new(default_ttl: Duration) -> Self {
        Self { entries: Mutex::new(HashMap::new()), default_ttl }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Insert or replace. A zero or absent `ttl` falls back to the default TTL.
    pub fn put(&self, key: impl Into<String>, record: WeatherRecord, ttl: Option<Duration>) {
        let ttl = ttl.filter(|t| !t.is_zero()).unwrap_or(self.default_ttl);
        let now = Instant::now();
        let key = key.into();

        tracing::debug!(key = %key, ttl_secs = ttl.as_secs(), "cache store");

        let entry = CacheEntry { record, created_at: now, expires_at: now.checked_add(ttl) };
        self.entries.lock().insert(key, entry);
    }

    /// Returns a copy of a live entry. An expired entry found here is removed.
    pub fn get(&self, key: &str) -> Option<WeatherRecord> {
        let now = Instant::now();
        let mut entries = self.entries.lock();

        let Some(entry) = entries.get(key) else {
            tracing::debug!(key = %key, "cache miss");
            return None;
        };

        if entry.is_expired(now) {
            entries.remove(key);
            tracing::debug!(key = %key, "cache entry expired");
            return None;
        }

        let age = now.duration_since(entry.created_at);
        tracing::debug!(key = %key, age_secs = age.as_secs(), "cache hit");
        Some(entry.record.clone())
    }

    /// Drop every entry. Returns how many were removed.
    pub fn clear(&self) -> usize {
        let mut entries = self.entries.lock();
        let count = entries.len();
        entries.clear();
        count
    }

    /// Drop expired entries. Returns how many were removed.
    pub fn cleanup(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    /// Number of stored entries, expired ones included until they are swept.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.lock().contains_key(key)
    }
}

/// Key for a current-conditions lookup.
///
/// The unit system is part of the key because the provider returns values
/// already converted to it.
pub fn current_weather_key(city: &str, country: &str, units: Units) -> String {
    format!("current:{}:{}:{units}", normalize_city(city), normalize_country(country))
}

/// Key for a forecast lookup. `days` must already be the effective day count.
pub fn forecast_key(city: &str, country: &str, days: u32, units: Units) -> String {
    format!("forecast:{}:{}:{days}:{units}", normalize_city(city), normalize_country(country))
}

fn normalize_city(city: &str) -> String {
    city.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

fn normalize_country(country: &str) -> String {
    country.trim().to_uppercase()
}
