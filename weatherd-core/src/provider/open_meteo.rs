use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Url};
use serde::{Deserialize, de::DeserializeOwned};

use crate::model::{
    CitySuggestion, Coordinates, DailyPoint, HourlyPoint, STANDARD_PRESSURE_HPA, Units,
    WeatherRecord,
};

use super::{FetchParams, WeatherProvider};

pub const DEFAULT_API_ENDPOINT: &str = "https://api.open-meteo.com/v1";
pub const DEFAULT_GEOCODING_ENDPOINT: &str = "https://geocoding-api.open-meteo.com/v1";

const USER_AGENT: &str = concat!("weatherd/", env!("CARGO_PKG_VERSION"));
const CURRENT_FIELDS: &str = "temperature_2m,relative_humidity_2m,apparent_temperature,\
    wind_speed_10m,wind_direction_10m,pressure_msl,precipitation,cloud_cover,weather_code,is_day";
const HOURLY_FIELDS: &str = "temperature_2m,precipitation_probability,weather_code";
const DAILY_FIELDS: &str =
    "weather_code,temperature_2m_max,temperature_2m_min,precipitation_sum,sunrise,sunset";
const MAX_HOURLY_POINTS: usize = 24;
/// Candidates fetched when a country filter has to be applied locally.
const RESOLVE_CANDIDATES: usize = 10;

/// Open-Meteo forecast + geocoding client. No API key required.
#[derive(Debug, Clone)]
pub struct OpenMeteoProvider {
    api_endpoint: Url,
    geocoding_endpoint: Url,
    geocoding_language: String,
    http: Client,
}

#[derive(Debug, Clone)]
pub struct OpenMeteoProviderBuilder {
    api_endpoint: String,
    geocoding_endpoint: String,
    geocoding_language: String,
    timeout: Duration,
}

impl Default for OpenMeteoProviderBuilder {
    fn default() -> Self {
        Self {
            api_endpoint: DEFAULT_API_ENDPOINT.to_string(),
            geocoding_endpoint: DEFAULT_GEOCODING_ENDPOINT.to_string(),
            geocoding_language: "en".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

impl OpenMeteoProviderBuilder {
    pub fn api_endpoint(mut self, endpoint: &str) -> Self {
        self.api_endpoint = endpoint.to_string();
        self
    }

    pub fn geocoding_endpoint(mut self, endpoint: &str) -> Self {
        self.geocoding_endpoint = endpoint.to_string();
        self
    }

    pub fn geocoding_language(mut self, language: &str) -> Self {
        self.geocoding_language = language.to_string();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> Result<OpenMeteoProvider> {
        let api_endpoint = parse_endpoint(&self.api_endpoint)
            .with_context(|| format!("Invalid API endpoint '{}'", self.api_endpoint))?;
        let geocoding_endpoint = parse_endpoint(&self.geocoding_endpoint)
            .with_context(|| format!("Invalid geocoding endpoint '{}'", self.geocoding_endpoint))?;

        let http = Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(OpenMeteoProvider {
            api_endpoint,
            geocoding_endpoint,
            geocoding_language: self.geocoding_language,
            http,
        })
    }
}

impl OpenMeteoProvider {
    pub fn builder() -> OpenMeteoProviderBuilder {
        OpenMeteoProviderBuilder::default()
    }

    /// Provider pointed at the public Open-Meteo endpoints.
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, String)],
        what: &str,
    ) -> Result<T> {
        let res = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .with_context(|| format!("Failed to send request to Open-Meteo ({what})"))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .with_context(|| format!("Failed to read Open-Meteo {what} response body"))?;

        if !status.is_success() {
            return Err(anyhow!(
                "Open-Meteo {what} request failed with status {}: {}",
                status,
                truncate_body(&body),
            ));
        }

        serde_json::from_str(&body).with_context(|| format!("Failed to parse Open-Meteo {what} JSON"))
    }

    async fn geocode(&self, name: &str, count: usize) -> Result<Vec<GeoResult>> {
        let url = join_endpoint(&self.geocoding_endpoint, "search");
        let query = [
            ("name", name.to_string()),
            ("count", count.to_string()),
            ("language", self.geocoding_language.clone()),
            ("format", "json".to_string()),
        ];

        let parsed: GeoResponse = self.get_json(url, &query, "geocoding").await?;
        Ok(parsed.results)
    }

    async fn fetch(
        &self,
        at: Coordinates,
        forecast_days: Option<u32>,
        params: &FetchParams,
    ) -> Result<WeatherRecord> {
        let url = join_endpoint(&self.api_endpoint, "forecast");

        let mut query = vec![
            ("latitude", format!("{:.6}", at.latitude)),
            ("longitude", format!("{:.6}", at.longitude)),
            ("current", CURRENT_FIELDS.to_string()),
            ("timezone", params.timezone.clone()),
            ("timeformat", "unixtime".to_string()),
        ];
        if params.units == Units::Imperial {
            query.push(("temperature_unit", "fahrenheit".to_string()));
            query.push(("wind_speed_unit", "mph".to_string()));
        }

        let what = match forecast_days {
            Some(days) => {
                query.push(("hourly", HOURLY_FIELDS.to_string()));
                query.push(("daily", DAILY_FIELDS.to_string()));
                query.push(("forecast_days", days.to_string()));
                "forecast"
            }
            None => "current weather",
        };

        let parsed: ForecastResponse = self.get_json(url, &query, what).await?;
        Ok(parsed.into_record(&params.language))
    }
}

#[async_trait]
impl WeatherProvider for OpenMeteoProvider {
    async fn resolve_coordinates(&self, city: &str, country: &str) -> Result<Option<Coordinates>> {
        let country = country.trim();
        let count = if country.is_empty() { 1 } else { RESOLVE_CANDIDATES };

        let results = self.geocode(city.trim(), count).await?;

        let found = results.into_iter().find(|r| country.is_empty() || r.matches_country(country));

        Ok(found.map(|r| Coordinates::new(r.latitude, r.longitude)))
    }

    async fn fetch_current(&self, at: Coordinates, params: &FetchParams) -> Result<WeatherRecord> {
        self.fetch(at, None, params).await
    }

    async fn fetch_forecast(
        &self,
        at: Coordinates,
        days: u32,
        params: &FetchParams,
    ) -> Result<WeatherRecord> {
        self.fetch(at, Some(days), params).await
    }

    async fn search_city(&self, query: &str, limit: usize) -> Result<Vec<CitySuggestion>> {
        let results = self.geocode(query.trim(), limit).await?;

        Ok(results
            .into_iter()
            .take(limit)
            .map(|r| CitySuggestion::new(r.name, r.country.unwrap_or_default()))
            .collect())
    }
}

#[derive(Debug, Deserialize)]
struct GeoResponse {
    #[serde(default)]
    results: Vec<GeoResult>,
}

#[derive(Debug, Deserialize)]
struct GeoResult {
    name: String,
    latitude: f64,
    longitude: f64,
    country: Option<String>,
    country_code: Option<String>,
}

impl GeoResult {
    fn matches_country(&self, country: &str) -> bool {
        let eq = |v: &Option<String>| v.as_deref().is_some_and(|v| v.eq_ignore_ascii_case(country));
        eq(&self.country_code) || eq(&self.country)
    }
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    #[serde(default)]
    latitude: f64,
    #[serde(default)]
    longitude: f64,
    #[serde(default)]
    timezone: String,
    #[serde(default)]
    utc_offset_seconds: i64,
    current: Option<OmCurrent>,
    hourly: Option<OmHourly>,
    daily: Option<OmDaily>,
}

#[derive(Debug, Deserialize)]
struct OmCurrent {
    time: Option<i64>,
    temperature_2m: Option<f64>,
    relative_humidity_2m: Option<f64>,
    apparent_temperature: Option<f64>,
    wind_speed_10m: Option<f64>,
    wind_direction_10m: Option<f64>,
    pressure_msl: Option<f64>,
    precipitation: Option<f64>,
    cloud_cover: Option<f64>,
    weather_code: Option<i32>,
    is_day: Option<u8>,
}

#[derive(Debug, Deserialize)]
struct OmHourly {
    #[serde(default)]
    time: Vec<i64>,
    #[serde(default)]
    temperature_2m: Vec<Option<f64>>,
    #[serde(default)]
    precipitation_probability: Vec<Option<f64>>,
    #[serde(default)]
    weather_code: Vec<Option<i32>>,
}

#[derive(Debug, Deserialize)]
struct OmDaily {
    #[serde(default)]
    time: Vec<i64>,
    #[serde(default)]
    weather_code: Vec<Option<i32>>,
    #[serde(default)]
    temperature_2m_max: Vec<Option<f64>>,
    #[serde(default)]
    temperature_2m_min: Vec<Option<f64>>,
    #[serde(default)]
    precipitation_sum: Vec<Option<f64>>,
    #[serde(default)]
    sunrise: Vec<Option<i64>>,
    #[serde(default)]
    sunset: Vec<Option<i64>>,
}

impl ForecastResponse {
    fn into_record(self, language: &str) -> WeatherRecord {
        let mut record = WeatherRecord {
            latitude: self.latitude,
            longitude: self.longitude,
            timezone: self.timezone,
            ..WeatherRecord::default()
        };

        if let Some(c) = self.current {
            record.temperature = c.temperature_2m.unwrap_or_default();
            record.feels_like = c.apparent_temperature.unwrap_or(record.temperature);
            record.humidity_pct = to_percent(c.relative_humidity_2m);
            record.wind_speed = c.wind_speed_10m.unwrap_or_default();
            record.wind_direction_deg =
                c.wind_direction_10m.map(|d| d.rem_euclid(360.0).round() as u16 % 360).unwrap_or(0);
            record.pressure_hpa = c.pressure_msl.unwrap_or(STANDARD_PRESSURE_HPA);
            record.precipitation_mm = c.precipitation.unwrap_or_default();
            record.cloud_cover_pct = to_percent(c.cloud_cover);
            record.weather_code = c.weather_code.unwrap_or_default();
            record.is_day = c.is_day.is_none_or(|d| d == 1);
            record.observation_time = c.time.and_then(unix_to_utc);
        }

        if let Some(h) = self.hourly {
            record.hourly = h
                .time
                .iter()
                .zip(&h.temperature_2m)
                .zip(&h.precipitation_probability)
                .zip(&h.weather_code)
                .take(MAX_HOURLY_POINTS)
                .filter_map(|(((&ts, temp), prob), code)| {
                    Some(HourlyPoint {
                        time: unix_to_utc(ts)?,
                        temperature: temp.unwrap_or_default(),
                        precipitation_probability: prob.unwrap_or_default(),
                        weather_code: code.unwrap_or_default(),
                    })
                })
                .collect();
        }

        if let Some(d) = self.daily {
            let offset = self.utc_offset_seconds;
            let len = [
                d.time.len(),
                d.weather_code.len(),
                d.temperature_2m_max.len(),
                d.temperature_2m_min.len(),
                d.precipitation_sum.len(),
            ]
            .into_iter()
            .min()
            .unwrap_or(0);

            record.daily = (0..len)
                .filter_map(|i| {
                    let date = unix_to_utc(d.time[i].checked_add(offset)?)?.date_naive();
                    Some(DailyPoint {
                        date,
                        temp_min: d.temperature_2m_min[i].unwrap_or_default(),
                        temp_max: d.temperature_2m_max[i].unwrap_or_default(),
                        precipitation_sum: d.precipitation_sum[i].unwrap_or_default(),
                        weather_code: d.weather_code[i].unwrap_or_default(),
                        sunrise: d.sunrise.get(i).copied().flatten().and_then(unix_to_utc),
                        sunset: d.sunset.get(i).copied().flatten().and_then(unix_to_utc),
                    })
                })
                .collect();
        }

        record.derive_labels(language);
        record
    }
}

fn to_percent(value: Option<f64>) -> u8 {
    value.map(|v| v.clamp(0.0, 100.0).round() as u8).unwrap_or(0)
}

fn unix_to_utc(ts: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(ts, 0)
}

fn parse_endpoint(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw)?;
    if url.cannot_be_a_base() {
        return Err(anyhow!("endpoint must be an absolute http(s) URL"));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn join_endpoint(base: &Url, segment: &str) -> Url {
    // `base` always ends with '/', so join appends instead of replacing.
    base.join(segment).unwrap_or_else(|_| base.clone())
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_gets_trailing_slash() {
        let url = parse_endpoint("https://api.open-meteo.com/v1").unwrap();
        assert_eq!(join_endpoint(&url, "forecast").as_str(), "https://api.open-meteo.com/v1/forecast");
    }

    #[test]
    fn endpoint_must_be_absolute() {
        assert!(parse_endpoint("/v1").is_err());
        assert!(parse_endpoint("mailto:someone@example.com").is_err());
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let long = "晴".repeat(300);
        let cut = truncate_body(&long);
        assert!(cut.ends_with("..."));
        assert_eq!(cut.chars().count(), 203);
        assert_eq!(truncate_body("short"), "short");
    }

    #[test]
    fn parses_current_payload() {
        let json = r#"{
            "latitude": 48.86, "longitude": 2.35, "timezone": "Europe/Paris",
            "utc_offset_seconds": 7200,
            "current": {
                "time": 1760608800, "temperature_2m": 14.2, "relative_humidity_2m": 81,
                "apparent_temperature": 12.9, "wind_speed_10m": 9.4, "wind_direction_10m": 225,
                "pressure_msl": 1018.4, "precipitation": 0.2, "cloud_cover": 75,
                "weather_code": 61, "is_day": 0
            }
        }"#;
        let parsed: ForecastResponse = serde_json::from_str(json).unwrap();
        let record = parsed.into_record("en");

        assert_eq!(record.temperature, 14.2);
        assert_eq!(record.humidity_pct, 81);
        assert_eq!(record.wind_direction_deg, 225);
        assert_eq!(record.cloud_cover_pct, 75);
        assert!(!record.is_day);
        assert_eq!(record.condition, "Slight rain");
        assert_eq!(record.icon_name, "rain");
        assert_eq!(record.timezone, "Europe/Paris");
        assert_eq!(record.observation_time.map(|t| t.timestamp()), Some(1760608800));
        assert!(record.hourly.is_empty());
        assert!(record.daily.is_empty());
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let json = r#"{ "current": { "temperature_2m": 3.0 } }"#;
        let parsed: ForecastResponse = serde_json::from_str(json).unwrap();
        let record = parsed.into_record("en");

        assert_eq!(record.temperature, 3.0);
        assert_eq!(record.feels_like, 3.0);
        assert_eq!(record.pressure_hpa, STANDARD_PRESSURE_HPA);
        assert_eq!(record.weather_code, 0);
        assert!(record.is_day);
        assert_eq!(record.icon_name, "sunny");
        assert!(record.observation_time.is_none());
    }

    #[test]
    fn daily_series_zip_to_shortest_and_use_local_dates() {
        // 2025-10-16T22:00:00Z is already the 17th in UTC+2
        let json = r#"{
            "utc_offset_seconds": 7200,
            "daily": {
                "time": [1760652000, 1760738400, 1760824800],
                "weather_code": [3, 80, 95],
                "temperature_2m_max": [18.0, 16.5],
                "temperature_2m_min": [9.0, 8.5, 7.0],
                "precipitation_sum": [0.0, 4.2, 11.0],
                "sunrise": [1760679000],
                "sunset": [null, 1760802000]
            }
        }"#;
        let parsed: ForecastResponse = serde_json::from_str(json).unwrap();
        let record = parsed.into_record("en");

        assert_eq!(record.daily.len(), 2);
        assert_eq!(record.daily[0].date.to_string(), "2025-10-17");
        assert_eq!(record.daily[1].weather_code, 80);
        assert_eq!(record.daily[1].temp_max, 16.5);
        assert!(record.daily[0].sunrise.is_some());
        assert!(record.daily[0].sunset.is_none());
        assert!(record.daily[1].sunrise.is_none());
    }

    #[test]
    fn overflowing_daily_timestamp_is_skipped() {
        let json = serde_json::json!({
            "utc_offset_seconds": 7200,
            "daily": {
                "time": [i64::MAX, 1760652000],
                "weather_code": [1, 2],
                "temperature_2m_max": [10.0, 11.0],
                "temperature_2m_min": [1.0, 2.0],
                "precipitation_sum": [0.0, 0.0],
            }
        });
        let parsed: ForecastResponse = serde_json::from_value(json).unwrap();
        let record = parsed.into_record("en");

        assert_eq!(record.daily.len(), 1);
        assert_eq!(record.daily[0].weather_code, 2);
    }

    #[test]
    fn hourly_series_is_capped() {
        let times: Vec<i64> = (0..48).map(|h| 1760608800 + h * 3600).collect();
        let json = serde_json::json!({
            "hourly": {
                "time": times,
                "temperature_2m": vec![10.0; 48],
                "precipitation_probability": vec![serde_json::Value::Null; 48],
                "weather_code": vec![2; 48],
            }
        });
        let parsed: ForecastResponse = serde_json::from_value(json).unwrap();
        let record = parsed.into_record("en");

        assert_eq!(record.hourly.len(), MAX_HOURLY_POINTS);
        assert_eq!(record.hourly[0].precipitation_probability, 0.0);
    }

    #[test]
    fn geo_result_matches_code_or_name() {
        let r = GeoResult {
            name: "Paris".into(),
            latitude: 48.85,
            longitude: 2.35,
            country: Some("France".into()),
            country_code: Some("FR".into()),
        };
        assert!(r.matches_country("fr"));
        assert!(r.matches_country("France"));
        assert!(!r.matches_country("US"));
    }
}
