use std::{
    io::Read,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use inquire::{Confirm, CustomType, Select, Text};
use weatherd_core::{Config, Units, WeatherRequest, WeatherResponse, WeatherService};

use crate::{console, output};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weatherd", version, about = "Weather request orchestrator with caching")]
pub struct Cli {
    /// Use this config file instead of the platform default.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Print the raw JSON response instead of a summary.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Per-request overrides of the configured defaults.
#[derive(Debug, Clone, Args)]
pub struct Overrides {
    /// Language for condition text, e.g. "en" or "zh".
    #[arg(long)]
    pub lang: Option<String>,

    /// Unit system: "metric" or "imperial".
    #[arg(long)]
    pub units: Option<Units>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Current conditions for a city.
    Current {
        city: String,

        /// Country name or ISO code used to disambiguate the city.
        #[arg(long, default_value = "")]
        country: String,

        #[command(flatten)]
        overrides: Overrides,
    },

    /// Daily forecast for a city.
    Forecast {
        city: String,

        #[arg(long, default_value = "")]
        country: String,

        /// Number of days; 0 means the default of 3, values above 16 are capped.
        #[arg(long, default_value_t = 3)]
        days: i32,

        #[command(flatten)]
        overrides: Overrides,
    },

    /// Suggest cities matching a name.
    Search { query: String },

    /// Current conditions at explicit coordinates.
    Geo {
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,

        #[arg(long, allow_negative_numbers = true)]
        lon: f64,

        #[command(flatten)]
        overrides: Overrides,
    },

    /// Process a JSON request envelope, e.g. '{"type":"search_city","query":"Paris"}'.
    Request {
        /// The request body, or "-" to read it from stdin.
        body: String,
    },

    /// Interactive console backed by one long-lived service.
    Console,

    /// Interactively edit and save the configuration.
    Configure,

    /// Show the active configuration.
    Config,
}

impl Command {
    fn into_request(self) -> Option<WeatherRequest> {
        let (mut request, overrides) = match self {
            Command::Current { city, country, overrides } => {
                (WeatherRequest::current(city, country), overrides)
            }
            Command::Forecast { city, country, days, overrides } => {
                (WeatherRequest::forecast(city, country, days), overrides)
            }
            Command::Geo { lat, lon, overrides } => (WeatherRequest::geo(lat, lon), overrides),
            Command::Search { query } => return Some(WeatherRequest::search(query)),
            _ => return None,
        };

        request.language = overrides.lang;
        request.units = overrides.units;
        Some(request)
    }
}

impl Cli {
    /// Returns `false` when a one-shot request came back unsuccessful.
    pub async fn run(self) -> Result<bool> {
        let Cli { config: config_path, json, command } = self;

        let config = match &config_path {
            Some(path) => Config::load_from(path)?,
            None => Config::load()?,
        };
        tracing::debug!(path = ?config_path, language = %config.language, "configuration loaded");

        match command {
            Command::Configure => {
                configure(config, config_path.as_deref())?;
                Ok(true)
            }
            Command::Config => {
                show_config(&config, config_path.as_deref(), json)?;
                Ok(true)
            }
            Command::Console => {
                let service = Arc::new(WeatherService::from_config(&config)?);
                console::run(service, config, config_path).await?;
                Ok(true)
            }
            Command::Request { body } => {
                let body = read_body(&body)?;
                let service = WeatherService::from_config(&config)?;
                let response = service.process_json(&body).await;
                println!("{}", serde_json::to_string_pretty(&response)?);
                Ok(response.success)
            }
            command => {
                let Some(request) = command.into_request() else {
                    return Ok(true);
                };
                let units = request.units.unwrap_or(config.units);
                let service = WeatherService::from_config(&config)?;
                let response = service.process(&request).await;
                print_response(&response, units, json)?;
                Ok(response.success)
            }
        }
    }
}

fn print_response(response: &WeatherResponse, units: Units, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(response)?);
    } else if response.success {
        println!("{}", output::render_response(response, units));
    } else {
        eprintln!("{}", output::render_response(response, units));
    }
    Ok(())
}

fn read_body(arg: &str) -> Result<String> {
    if arg != "-" {
        return Ok(arg.to_string());
    }

    let mut body = String::new();
    std::io::stdin().read_to_string(&mut body).context("Failed to read request from stdin")?;
    Ok(body)
}

fn configure(mut config: Config, path: Option<&Path>) -> Result<()> {
    config.language = Text::new("Language for condition text:")
        .with_default(&config.language)
        .with_help_message("zh for Chinese, anything else for English")
        .prompt()?;

    let cursor = if config.units == Units::Imperial { 1 } else { 0 };
    config.units = Select::new("Unit system:", vec![Units::Metric, Units::Imperial])
        .with_starting_cursor(cursor)
        .prompt()?;

    config.cache_enabled =
        Confirm::new("Cache weather lookups?").with_default(config.cache_enabled).prompt()?;

    if config.cache_enabled {
        config.cache_ttl_secs = CustomType::<u64>::new("Cache TTL in seconds:")
            .with_default(config.cache_ttl_secs)
            .with_error_message("Please enter a whole number of seconds")
            .prompt()?;
    }

    config.upstream_timeout_secs = CustomType::<u64>::new("Upstream timeout in seconds:")
        .with_default(config.upstream_timeout_secs)
        .with_error_message("Please enter a whole number of seconds")
        .prompt()?;

    config.validate()?;

    let saved = match path {
        Some(path) => {
            config.save_to(path)?;
            path.to_path_buf()
        }
        None => config.save()?,
    };
    println!("Configuration saved to {}", saved.display());

    Ok(())
}

fn show_config(config: &Config, path: Option<&Path>, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(config)?);
        return Ok(());
    }

    let path = match path {
        Some(path) => path.to_path_buf(),
        None => Config::config_file_path()?,
    };
    println!("Config file:       {}", path.display());
    println!("API endpoint:      {}", config.api_endpoint);
    println!("Geocoding:         {}", config.geocoding_endpoint);
    println!("Language:          {}", config.language);
    println!("Units:             {}", config.units);
    println!("Cache:             {}", if config.cache_enabled { "on" } else { "off" });
    println!("Cache TTL:         {}s", config.cache_ttl_secs);
    println!("Cleanup interval:  {}s", config.cleanup_interval_secs);
    println!("Upstream timeout:  {}s", config.upstream_timeout_secs);
    println!("Search limit:      {}", config.search_limit);

    Ok(())
}
