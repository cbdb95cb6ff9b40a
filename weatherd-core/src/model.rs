use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    condition::{condition_text, icon_name},
    error::{ErrorKind, WeatherError},
};

/// Unit system used when fetching and formatting values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Metric,
    Imperial,
}

impl Units {
    pub fn as_str(&self) -> &'static str {
        match self {
            Units::Metric => "metric",
            Units::Imperial => "imperial",
        }
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Units {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "metric" => Ok(Units::Metric),
            "imperial" => Ok(Units::Imperial),
            _ => Err(anyhow::anyhow!(
                "Unknown unit system '{value}'. Supported systems: metric, imperial."
            )),
        }
    }
}

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Exactly (0, 0). Callers historically used it to mean "no data".
    pub fn is_origin(&self) -> bool {
        self.latitude == 0.0 && self.longitude == 0.0
    }

    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyPoint {
    pub time: DateTime<Utc>,
    pub temperature: f64,
    pub precipitation_probability: f64,
    pub weather_code: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyPoint {
    pub date: NaiveDate,
    pub temp_min: f64,
    pub temp_max: f64,
    pub precipitation_sum: f64,
    pub weather_code: i32,
    pub sunrise: Option<DateTime<Utc>>,
    pub sunset: Option<DateTime<Utc>>,
}

/// Normalized result of a weather lookup.
///
/// `condition` and `icon_name` are derived from `weather_code` (plus
/// `is_day` and a language) and are rebuilt with [`WeatherRecord::derive_labels`]
/// whenever a record is handed out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    pub temperature: f64,
    pub feels_like: f64,
    pub humidity_pct: u8,
    pub wind_speed: f64,
    pub wind_direction_deg: u16,
    pub pressure_hpa: f64,
    pub precipitation_mm: f64,
    pub cloud_cover_pct: u8,
    pub weather_code: i32,
    pub is_day: bool,
    pub condition: String,
    pub icon_name: String,
    pub observation_time: Option<DateTime<Utc>>,

    pub city: String,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: String,

    #[serde(default)]
    pub hourly: Vec<HourlyPoint>,
    #[serde(default)]
    pub daily: Vec<DailyPoint>,
}

impl Default for WeatherRecord {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            feels_like: 0.0,
            humidity_pct: 0,
            wind_speed: 0.0,
            wind_direction_deg: 0,
            pressure_hpa: STANDARD_PRESSURE_HPA,
            precipitation_mm: 0.0,
            cloud_cover_pct: 0,
            weather_code: 0,
            is_day: true,
            condition: String::new(),
            icon_name: String::new(),
            observation_time: None,
            city: String::new(),
            country: String::new(),
            latitude: 0.0,
            longitude: 0.0,
            timezone: String::new(),
            hourly: Vec::new(),
            daily: Vec::new(),
        }
    }
}

/// Used when the provider omits pressure.
pub const STANDARD_PRESSURE_HPA: f64 = 1013.0;

impl WeatherRecord {
    /// Recompute `condition` and `icon_name` from the weather code.
    pub fn derive_labels(&mut self, language: &str) {
        self.condition = condition_text(self.weather_code, language).to_string();
        self.icon_name = icon_name(self.weather_code, self.is_day).to_string();
    }

    /// Simplified per-day record: max temperature as headline, labels from the day's code.
    pub fn from_daily(day: &DailyPoint, city: &str, country: &str, language: &str) -> Self {
        let mut record = WeatherRecord {
            temperature: day.temp_max,
            precipitation_mm: day.precipitation_sum,
            weather_code: day.weather_code,
            is_day: true,
            observation_time: day.date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc()),
            city: city.to_string(),
            country: country.to_string(),
            ..WeatherRecord::default()
        };
        record.derive_labels(language);
        record
    }
}

/// A (name, country) pair returned by city search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitySuggestion {
    pub name: String,
    pub country: String,
}

impl CitySuggestion {
    pub fn new(name: impl Into<String>, country: impl Into<String>) -> Self {
        Self { name: name.into(), country: country.into() }
    }
}

/// The four kinds of lookups the service answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RequestKind {
    CurrentWeather {
        city: String,
        #[serde(default)]
        country: String,
    },
    Forecast {
        city: String,
        #[serde(default)]
        country: String,
        #[serde(default)]
        days: i32,
    },
    SearchCity {
        query: String,
    },
    GeoLocation {
        latitude: f64,
        longitude: f64,
    },
}

impl RequestKind {
    /// Wire names accepted in the `type` field.
    pub const NAMES: &'static [&'static str] =
        &["current_weather", "forecast", "search_city", "geo_location"];

    pub fn name(&self) -> &'static str {
        match self {
            RequestKind::CurrentWeather { .. } => "current_weather",
            RequestKind::Forecast { .. } => "forecast",
            RequestKind::SearchCity { .. } => "search_city",
            RequestKind::GeoLocation { .. } => "geo_location",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRequest {
    #[serde(flatten)]
    pub kind: RequestKind,
    /// Overrides the service language when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Overrides the service unit system when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<Units>,
}

impl WeatherRequest {
    pub fn new(kind: RequestKind) -> Self {
        Self { kind, language: None, units: None }
    }

    pub fn current(city: impl Into<String>, country: impl Into<String>) -> Self {
        Self::new(RequestKind::CurrentWeather { city: city.into(), country: country.into() })
    }

    pub fn forecast(city: impl Into<String>, country: impl Into<String>, days: i32) -> Self {
        Self::new(RequestKind::Forecast { city: city.into(), country: country.into(), days })
    }

    pub fn search(query: impl Into<String>) -> Self {
        Self::new(RequestKind::SearchCity { query: query.into() })
    }

    pub fn geo(latitude: f64, longitude: f64) -> Self {
        Self::new(RequestKind::GeoLocation { latitude, longitude })
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_units(mut self, units: Units) -> Self {
        self.units = Some(units);
        self
    }
}

/// Result of [`crate::WeatherService::process`].
///
/// A successful response has an empty `error_message` and populates exactly
/// one of `current`, `forecast` or `suggestions`, depending on the request.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WeatherResponse {
    pub success: bool,
    pub error_message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<WeatherRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub forecast: Vec<WeatherRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<CitySuggestion>,
}

impl WeatherResponse {
    pub fn current(record: WeatherRecord) -> Self {
        Self { success: true, current: Some(record), ..Self::default() }
    }

    pub fn forecast(days: Vec<WeatherRecord>) -> Self {
        Self { success: true, forecast: days, ..Self::default() }
    }

    pub fn suggestions(suggestions: Vec<CitySuggestion>) -> Self {
        Self { success: true, suggestions, ..Self::default() }
    }

    pub fn failure(err: &WeatherError) -> Self {
        Self {
            success: false,
            error_message: err.to_string(),
            error_kind: Some(err.kind()),
            ..Self::default()
        }
    }
}
