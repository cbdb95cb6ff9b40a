//! Interactive console: one command per line against a long-lived service.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::{Result, anyhow, bail};
use inquire::{InquireError, Text};
use weatherd_core::{Config, Units, WeatherRequest, WeatherService};

use crate::output;

const HELP: &str = "\
Commands:
  current <city>[, <country>]          current conditions
  forecast <city>[, <country>] [days]  daily forecast (default 3 days)
  search <query>                       city suggestions
  geo <lat> <lon>                      current conditions at coordinates
  stats                                request statistics
  lang <code>                          default language (zh, en, ...)
  units <metric|imperial>              default unit system
  cache <on|off>                       enable or disable the cache
  ttl <seconds>                        recreate the cache with a new TTL
  clear                                drop all cached entries
  cleanup                              drop expired cached entries
  config                               show active settings
  save                                 write current settings to the config file
  help                                 this text
  quit                                 leave the console";

#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Request(WeatherRequest),
    Stats,
    Language(String),
    Units(Units),
    Cache(bool),
    Ttl(Duration),
    Clear,
    Cleanup,
    Config,
    Save,
    Help,
    Quit,
}

impl ConsoleCommand {
    /// Parse one console line. Blank input yields `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();

        let command = match word.to_lowercase().as_str() {
            "current" | "now" => {
                let (city, country) = split_location(require(rest, "current <city>[, <country>]")?);
                ConsoleCommand::Request(WeatherRequest::current(city, country))
            }
            "forecast" => {
                let rest = require(rest, "forecast <city>[, <country>] [days]")?;
                let (location, days) = split_trailing_days(rest);
                let (city, country) = split_location(location);
                ConsoleCommand::Request(WeatherRequest::forecast(city, country, days))
            }
            "search" => {
                ConsoleCommand::Request(WeatherRequest::search(require(rest, "search <query>")?))
            }
            "geo" => {
                let mut parts = rest.split_whitespace();
                let (Some(lat), Some(lon), None) = (parts.next(), parts.next(), parts.next()) else {
                    bail!("usage: geo <lat> <lon>");
                };
                let lat: f64 = lat.parse().map_err(|_| anyhow!("invalid latitude '{lat}'"))?;
                let lon: f64 = lon.parse().map_err(|_| anyhow!("invalid longitude '{lon}'"))?;
                ConsoleCommand::Request(WeatherRequest::geo(lat, lon))
            }
            "stats" => ConsoleCommand::Stats,
            "lang" => ConsoleCommand::Language(require(rest, "lang <code>")?.to_string()),
            "units" => ConsoleCommand::Units(require(rest, "units <metric|imperial>")?.parse()?),
            "cache" => match rest.to_lowercase().as_str() {
                "on" => ConsoleCommand::Cache(true),
                "off" => ConsoleCommand::Cache(false),
                _ => bail!("usage: cache <on|off>"),
            },
            "ttl" => {
                let secs: u64 = require(rest, "ttl <seconds>")?
                    .parse()
                    .map_err(|_| anyhow!("ttl must be a whole number of seconds"))?;
                ConsoleCommand::Ttl(Duration::from_secs(secs))
            }
            "clear" => ConsoleCommand::Clear,
            "cleanup" => ConsoleCommand::Cleanup,
            "config" => ConsoleCommand::Config,
            "save" => ConsoleCommand::Save,
            "help" | "?" => ConsoleCommand::Help,
            "quit" | "exit" | "q" => ConsoleCommand::Quit,
            other => bail!("unknown command '{other}', type 'help' for a list"),
        };

        Ok(Some(command))
    }
}

fn require<'a>(rest: &'a str, usage: &str) -> Result<&'a str> {
    if rest.is_empty() { Err(anyhow!("usage: {usage}")) } else { Ok(rest) }
}

/// `"New York, US"` -> `("New York", "US")`; no comma means no country.
fn split_location(input: &str) -> (&str, &str) {
    match input.rsplit_once(',') {
        Some((city, country)) => (city.trim(), country.trim()),
        None => (input.trim(), ""),
    }
}

/// A trailing integer is the day count, unless it is the only token.
fn split_trailing_days(input: &str) -> (&str, i32) {
    match input.rsplit_once(char::is_whitespace) {
        Some((head, last)) => match last.parse::<i32>() {
            Ok(days) => (head.trim_end(), days),
            Err(_) => (input, 0),
        },
        None => (input, 0),
    }
}

/// Run the console until `quit`, end of input or Ctrl-C.
///
/// `save` writes to `config_path` when given, otherwise to the platform default.
pub async fn run(
    service: Arc<WeatherService>,
    mut config: Config,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let sweeper = config.cleanup_interval().map(|every| service.spawn_cleanup_task(every));

    println!("weatherd console, type 'help' for commands");

    loop {
        let line = tokio::task::spawn_blocking(|| Text::new("weatherd>").prompt()).await?;

        let line = match line {
            Ok(line) => line,
            Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => break,
            Err(err) => return Err(err.into()),
        };

        let command = match ConsoleCommand::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(err) => {
                eprintln!("{err}");
                continue;
            }
        };

        if !execute(&service, &mut config, config_path.as_deref(), command).await {
            break;
        }
    }

    if let Some(handle) = sweeper {
        handle.abort();
    }
    Ok(())
}

/// Returns `false` when the console should exit.
async fn execute(
    service: &WeatherService,
    config: &mut Config,
    config_path: Option<&Path>,
    command: ConsoleCommand,
) -> bool {
    match command {
        ConsoleCommand::Request(request) => {
            let units = request.units.unwrap_or_else(|| service.units());
            let response = service.process(&request).await;
            println!("{}", output::render_response(&response, units));
        }
        ConsoleCommand::Stats => {
            println!(
                "{}",
                output::render_statistics(&service.get_statistics(), service.cached_entries())
            );
        }
        ConsoleCommand::Language(language) => {
            service.set_language(language.clone());
            println!("Language set to {language}");
        }
        ConsoleCommand::Units(units) => {
            service.set_units(units);
            println!("Units set to {units}");
        }
        ConsoleCommand::Cache(enabled) => {
            service.set_cache_enabled(enabled);
            println!("Cache {}", if enabled { "enabled" } else { "disabled" });
        }
        ConsoleCommand::Ttl(ttl) => {
            service.set_cache_ttl(ttl);
            println!("Cache recreated with a {}s TTL", ttl.as_secs());
        }
        ConsoleCommand::Clear => println!("Removed {} entries", service.clear_cache()),
        ConsoleCommand::Cleanup => println!("Removed {} expired entries", service.cleanup_cache()),
        ConsoleCommand::Config => {
            println!("Language:  {}", service.language());
            println!("Units:     {}", service.units());
            println!(
                "Cache:     {} (ttl {}s)",
                if service.cache_enabled() { "on" } else { "off" },
                service.cache_ttl().as_secs()
            );
        }
        ConsoleCommand::Save => match save_settings(service, config, config_path) {
            Ok(path) => println!("Configuration saved to {}", path.display()),
            Err(err) => eprintln!("{err:#}"),
        },
        ConsoleCommand::Help => println!("{HELP}"),
        ConsoleCommand::Quit => return false,
    }
    true
}

/// Copy the runtime settings into `config`.
fn apply_settings(service: &WeatherService, config: &mut Config) {
    config.language = service.language();
    config.units = service.units();
    config.cache_enabled = service.cache_enabled();
    config.cache_ttl_secs = service.cache_ttl().as_secs();
}

fn save_settings(
    service: &WeatherService,
    config: &mut Config,
    path: Option<&Path>,
) -> Result<PathBuf> {
    apply_settings(service, config);
    config.validate()?;

    match path {
        Some(path) => {
            config.save_to(path)?;
            Ok(path.to_path_buf())
        }
        None => config.save(),
    }
}
