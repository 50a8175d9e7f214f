//! Command-line interface for the GlobalTrend weather client
//!
//! Parses arguments with clap (settings fall back to environment variables),
//! builds a `Config`, and dispatches to the weather client or the cache.

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Args, Parser, Subcommand};
use serde_json::json;
use thiserror::Error;

use crate::api::{self, DEFAULT_HOST, DEFAULT_PORT};
use crate::cache::CacheManager;
use crate::config::{
    default_cache_dir, Config, ConfigError, DEFAULT_BASE_URL, DEFAULT_CACHE_TTL_SECS,
    DEFAULT_TIMEOUT_SECS,
};
use crate::data::{ForecastFilter, WeatherClient};
use crate::display;
use crate::error::WeatherError;

/// Forecast entries per day (3-hour intervals)
const ENTRIES_PER_DAY: u8 = 8;

/// Error types for running a CLI command
#[derive(Debug, Error)]
pub enum CliError {
    /// Neither a city name nor a city id was given
    #[error("Please specify a city name or --id")]
    MissingLocation,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Weather(#[from] WeatherError),

    /// JSON output could not be produced
    #[error("Failed to serialize output: {0}")]
    Output(#[from] serde_json::Error),

    /// The HTTP API could not bind or stopped with an error
    #[error("Server error: {0}")]
    Server(#[from] std::io::Error),
}

/// GlobalTrend Weather CLI - current weather and forecasts from OpenWeather
#[derive(Parser, Debug)]
#[command(name = "globaltrend")]
#[command(about = "Current weather and forecasts from OpenWeather, with a local response cache")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// OpenWeather API key
    #[arg(long, env = "OPENWEATHER_API_KEY", hide_env_values = true, global = true)]
    pub api_key: Option<String>,

    /// OpenWeather API base URL
    #[arg(long, env = "OPENWEATHER_BASE_URL", default_value = DEFAULT_BASE_URL, global = true)]
    pub base_url: String,

    /// Directory for cached responses [default: XDG cache dir]
    #[arg(long, env = "CACHE_DIR", global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Seconds a cached response stays fresh
    #[arg(long, env = "CACHE_EXPIRY_SECONDS", default_value_t = DEFAULT_CACHE_TTL_SECS, global = true)]
    pub cache_ttl: u64,

    /// Upstream request timeout in seconds
    #[arg(long, env = "API_TIMEOUT", default_value_t = DEFAULT_TIMEOUT_SECS, global = true)]
    pub timeout: u64,

    /// Print the response as JSON instead of a table
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show current weather
    ///
    /// Examples:
    ///   globaltrend current London
    ///   globaltrend current New York
    ///   globaltrend current --id 2643743
    Current(Target),

    /// Show the forecast in 3-hour steps
    Forecast {
        #[command(flatten)]
        target: Target,

        /// Number of days (1-5)
        #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u8).range(1..=5))]
        days: u8,
    },

    /// Show forecast entries matching all given criteria
    Filter {
        #[command(flatten)]
        target: Target,

        /// Weather group to keep (e.g. Rain, Clear, Clouds)
        #[arg(long)]
        condition: Option<String>,

        /// Minimum temperature in Celsius
        #[arg(long, allow_negative_numbers = true)]
        min_temp: Option<f64>,

        /// Maximum temperature in Celsius
        #[arg(long, allow_negative_numbers = true)]
        max_temp: Option<f64>,

        /// Minimum humidity percentage
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
        min_humidity: Option<u8>,

        /// Maximum humidity percentage
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
        max_humidity: Option<u8>,

        /// Number of forecast entries to fetch (1-40)
        #[arg(long, default_value_t = 40, value_parser = clap::value_parser!(u8).range(1..=40))]
        cnt: u8,
    },

    /// Manage the response cache
    #[command(subcommand)]
    Cache(CacheCommand),

    /// Serve the weather API over HTTP until interrupted
    Serve {
        /// Address to bind
        #[arg(long, env = "API_HOST", default_value = DEFAULT_HOST)]
        host: String,

        /// Port to listen on
        #[arg(long, env = "API_PORT", default_value_t = DEFAULT_PORT)]
        port: u16,
    },
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheCommand {
    /// Delete every cached response
    Clear,
    /// Delete cached responses older than the TTL
    ClearExpired,
}

/// Which city a command is about
#[derive(Args, Debug)]
pub struct Target {
    /// City name; several words are joined with spaces
    #[arg(value_name = "CITY", required_unless_present = "id", conflicts_with = "id")]
    pub city: Vec<String>,

    /// OpenWeather city id
    #[arg(long)]
    pub id: Option<u64>,
}

/// A resolved city reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Name(String),
    Id(u64),
}

impl Target {
    /// Resolves the arguments into a single location
    pub fn location(&self) -> Result<Location, CliError> {
        if let Some(id) = self.id {
            return Ok(Location::Id(id));
        }

        let name = self.city.join(" ");
        let name = name.trim();
        if name.is_empty() {
            return Err(CliError::MissingLocation);
        }
        Ok(Location::Name(name.to_string()))
    }
}

impl Cli {
    /// Builds the runtime configuration from arguments and environment
    pub fn config(&self) -> Result<Config, ConfigError> {
        let cache_dir = match &self.cache_dir {
            Some(dir) => dir.clone(),
            None => default_cache_dir().ok_or(ConfigError::NoCacheDir)?,
        };

        Ok(Config {
            api_key: self.api_key.clone().unwrap_or_default(),
            base_url: self.base_url.clone(),
            timeout: Duration::from_secs(self.timeout),
            cache_dir,
            cache_ttl: Duration::from_secs(self.cache_ttl),
        })
    }
}

/// Runs the parsed command and returns the text to print
pub async fn run(cli: &Cli) -> Result<String, CliError> {
    let config = cli.config()?;

    match &cli.command {
        Command::Cache(command) => run_cache(*command, &config, cli.json),
        Command::Serve { host, port } => {
            let client = WeatherClient::new(&config)?;
            api::serve(client, (host.as_str(), *port)).await?;
            Ok("Server stopped".to_string())
        }
        Command::Current(target) => {
            let client = WeatherClient::new(&config)?;
            let response = match target.location()? {
                Location::Name(city) => client.current_weather(&city).await?,
                Location::Id(id) => client.current_weather_by_id(id).await?,
            };
            if cli.json {
                Ok(serde_json::to_string_pretty(&response)?)
            } else {
                Ok(display::render_current(&response))
            }
        }
        Command::Forecast { target, days } => {
            let client = WeatherClient::new(&config)?;
            let cnt = days * ENTRIES_PER_DAY;
            let response = match target.location()? {
                Location::Name(city) => client.forecast(&city, cnt).await?,
                Location::Id(id) => client.forecast_by_id(id, cnt).await?,
            };
            if cli.json {
                Ok(serde_json::to_string_pretty(&response)?)
            } else {
                Ok(display::render_forecast(&response, *days))
            }
        }
        Command::Filter {
            target,
            condition,
            min_temp,
            max_temp,
            min_humidity,
            max_humidity,
            cnt,
        } => {
            let client = WeatherClient::new(&config)?;
            let response = match target.location()? {
                Location::Name(city) => client.forecast(&city, *cnt).await?,
                Location::Id(id) => client.forecast_by_id(id, *cnt).await?,
            };
            let filter = ForecastFilter {
                condition: condition.clone(),
                min_temp: *min_temp,
                max_temp: *max_temp,
                min_humidity: *min_humidity,
                max_humidity: *max_humidity,
            };
            let items = filter.apply(&response.list);
            if cli.json {
                Ok(serde_json::to_string_pretty(&items)?)
            } else {
                Ok(display::render_filtered(&response.city.name, &items))
            }
        }
    }
}

fn run_cache(command: CacheCommand, config: &Config, as_json: bool) -> Result<String, CliError> {
    let cache = CacheManager::from_config(config);
    let (count, message) = match command {
        CacheCommand::Clear => {
            let count = cache.clear();
            (count, format!("Successfully cleared {} cache files", count))
        }
        CacheCommand::ClearExpired => {
            let count = cache.clear_expired();
            (count, format!("Successfully cleared {} expired cache files", count))
        }
    };

    if as_json {
        Ok(serde_json::to_string_pretty(
            &json!({ "message": message, "count": count }),
        )?)
    } else {
        Ok(message)
    }
}
