use serde::{Deserialize, Serialize};

/// Failures reported back to callers inside a [`crate::WeatherResponse`].
///
/// None of these are fatal: the service turns every one of them into a
/// `success = false` response.
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("No location found for '{0}'")]
    LocationNotFound(String),

    #[error("Upstream weather provider failed: {0}")]
    Upstream(String),

    #[error("Unknown request type '{0}'. Supported types: current_weather, forecast, search_city, geo_location.")]
    UnknownRequestType(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    LocationNotFound,
    Upstream,
    UnknownRequestType,
}

impl WeatherError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WeatherError::Validation(_) => ErrorKind::Validation,
            WeatherError::LocationNotFound(_) => ErrorKind::LocationNotFound,
            WeatherError::Upstream(_) => ErrorKind::Upstream,
            WeatherError::UnknownRequestType(_) => ErrorKind::UnknownRequestType,
        }
    }

    /// Wrap a provider error, keeping the whole context chain in the message.
    pub fn upstream(err: anyhow::Error) -> Self {
        WeatherError::Upstream(format!("{err:#}"))
    }
}
