use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};

use crate::{
    model::Units,
    provider::open_meteo::{DEFAULT_API_ENDPOINT, DEFAULT_GEOCODING_ENDPOINT},
};

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// language = "en"
/// units = "imperial"
/// cache_ttl_secs = 600
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the forecast API.
    pub api_endpoint: String,
    /// Base URL of the geocoding API.
    pub geocoding_endpoint: String,
    /// Default language for condition text, e.g. "zh" or "en".
    pub language: String,
    pub units: Units,
    pub cache_enabled: bool,
    pub cache_ttl_secs: u64,
    /// How often the console sweeps expired cache entries. 0 disables the sweep.
    pub cleanup_interval_secs: u64,
    pub upstream_timeout_secs: u64,
    /// Maximum number of city search suggestions.
    pub search_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_endpoint: DEFAULT_API_ENDPOINT.to_string(),
            geocoding_endpoint: DEFAULT_GEOCODING_ENDPOINT.to_string(),
            language: "zh".to_string(),
            units: Units::Metric,
            cache_enabled: true,
            cache_ttl_secs: 300,
            cleanup_interval_secs: 60,
            upstream_timeout_secs: 10,
            search_limit: 10,
        }
    }
}

impl Config {
    /// Load config from disk, or return defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, use defaults.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let cfg: Config = toml::from_str(contents)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_file_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weatherd", "weatherd")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    pub fn validate(&self) -> Result<()> {
        if self.language.trim().is_empty() {
            return Err(anyhow!("language must not be empty"));
        }
        if self.upstream_timeout_secs == 0 {
            return Err(anyhow!("upstream_timeout_secs must be greater than zero"));
        }
        if self.search_limit == 0 {
            return Err(anyhow!("search_limit must be greater than zero"));
        }
        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }

    /// `None` when periodic cleanup is switched off.
    pub fn cleanup_interval(&self) -> Option<Duration> {
        (self.cleanup_interval_secs > 0).then(|| Duration::from_secs(self.cleanup_interval_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_service_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.language, "zh");
        assert_eq!(cfg.units, Units::Metric);
        assert!(cfg.cache_enabled);
        assert_eq!(cfg.cache_ttl(), Duration::from_secs(300));
        assert_eq!(cfg.upstream_timeout(), Duration::from_secs(10));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let cfg = Config::from_toml("language = \"en\"\nunits = \"imperial\"\n").unwrap();

        assert_eq!(cfg.language, "en");
        assert_eq!(cfg.units, Units::Imperial);
        assert_eq!(cfg.cache_ttl_secs, 300);
        assert_eq!(cfg.api_endpoint, DEFAULT_API_ENDPOINT);
    }

    #[test]
    fn unknown_units_are_rejected() {
        let err = Config::from_toml("units = \"kelvin\"\n").unwrap_err();
        assert!(format!("{err:#}").contains("kelvin"));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = Config::from_toml("upstream_timeout_secs = 0\n").unwrap_err();
        assert!(err.to_string().contains("upstream_timeout_secs"));
    }

    #[test]
    fn cleanup_interval_zero_disables_sweep() {
        let cfg = Config { cleanup_interval_secs: 0, ..Config::default() };
        assert_eq!(cfg.cleanup_interval(), None);
        assert_eq!(Config::default().cleanup_interval(), Some(Duration::from_secs(60)));
    }

    #[test]
    fn save_and_load_roundtrip_through_file() {
        let dir = std::env::temp_dir().join(format!("weatherd-config-{}", std::process::id()));
        let path = dir.join("config.toml");

        let cfg = Config { language: "en".into(), cache_ttl_secs: 42, ..Config::default() };
        cfg.save_to(&path).unwrap();
        let loaded = Config::load_from(&path).unwrap();
        let _ = fs::remove_dir_all(&dir);

        assert_eq!(loaded, cfg);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let path = std::env::temp_dir().join("weatherd-does-not-exist/config.toml");
        assert_eq!(Config::load_from(&path).unwrap(), Config::default());
    }
}
