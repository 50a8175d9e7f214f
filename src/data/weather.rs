//! OpenWeather API client with a file-backed response cache
//!
//! `WeatherClient::fetch` is the single path to the provider: it serves fresh
//! cache entries without touching the network, otherwise issues exactly one
//! request, classifies failures into `WeatherError`, and caches successes.
//!
//! Concurrent fetches for the same key are not de-duplicated. Each one that
//! misses issues its own request and overwrites the entry; the last write wins.

use std::fmt;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, info};

use super::{FetchResult, ForecastResponse, WeatherResponse};
use crate::cache::{logical_key, CacheManager};
use crate::config::{Config, ConfigError};
use crate::error::WeatherError;

/// Endpoint for current weather
const WEATHER_ENDPOINT: &str = "weather";

/// Endpoint for the 5-day / 3-hour forecast
const FORECAST_ENDPOINT: &str = "forecast";

/// Unit system requested on every call (Celsius, m/s)
const UNITS: &str = "metric";

/// Client for fetching weather data from the OpenWeather API
#[derive(Clone)]
pub struct WeatherClient {
    /// HTTP client for making requests
    http_client: Client,
    /// Cache manager for persisting responses
    cache: CacheManager,
    /// Base URL the endpoint name is appended to
    base_url: String,
    /// Sent as `appid` on every request
    api_key: String,
    /// Upper bound for each upstream request
    timeout: Duration,
}

impl fmt::Debug for WeatherClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeatherClient")
            .field("cache", &self.cache)
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl WeatherClient {
    /// Creates a new WeatherClient from configuration
    ///
    /// Fails with `ConfigError::MissingApiKey` before any request can be made
    /// if the configuration carries no API key.
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        Self::with_client(Client::new(), config)
    }

    /// Creates a new WeatherClient with a custom HTTP client
    pub fn with_client(client: Client, config: &Config) -> Result<Self, ConfigError> {
        if !config.has_api_key() {
            return Err(ConfigError::MissingApiKey);
        }

        Ok(Self {
            http_client: client,
            cache: CacheManager::from_config(config),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            timeout: config.timeout,
        })
    }

    /// The cache this client reads and writes
    pub fn cache(&self) -> &CacheManager {
        &self.cache
    }

    /// Fetches `endpoint` with `params`, serving from the cache when possible
    ///
    /// # Arguments
    /// * `endpoint` - Provider endpoint name (e.g. "weather")
    /// * `params` - Identifying query parameters; credentials and units are added here
    /// * `cache_key` - Logical key under which the response is cached
    ///
    /// # Returns
    /// * `Ok(FetchResult)` - Cached payload with its original timestamp, or a fresh payload
    /// * `Err(WeatherError)` - The classified upstream failure; nothing is cached
    pub async fn fetch(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
        cache_key: &str,
    ) -> Result<FetchResult, WeatherError> {
        if let Some(entry) = self.cache.get(cache_key) {
            return Ok(FetchResult::from_cache(entry));
        }

        debug!(cache_key, "cache miss");
        let payload = self.request(endpoint, params).await?;
        self.cache.set(cache_key, &payload);

        Ok(FetchResult::fresh(payload))
    }

    /// Issues one upstream request and classifies the outcome
    async fn request(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Value, WeatherError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        info!(endpoint, location = describe_target(params), "requesting weather data");

        let response = self
            .http_client
            .get(&url)
            .query(params)
            .query(&[("appid", self.api_key.as_str()), ("units", UNITS)])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error(&e))?;

        classify_response(status, &body, params)
    }

    /// Maps a reqwest failure to `Timeout` or `NetworkFailure`
    fn transport_error(&self, error: &reqwest::Error) -> WeatherError {
        if error.is_timeout() {
            WeatherError::Timeout(format!(
                "Request timeout after {:?}: {}",
                self.timeout, error
            ))
        } else {
            WeatherError::NetworkFailure(format!("Network error occurred: {}", error))
        }
    }

    /// Current weather for a city name (e.g. "London", "New York")
    pub async fn current_weather(&self, city: &str) -> Result<WeatherResponse, WeatherError> {
        let params = [("q", city.to_string())];
        let key = logical_key(WEATHER_ENDPOINT, &params);
        WeatherResponse::assemble(self.fetch(WEATHER_ENDPOINT, &params, &key).await?)
    }

    /// Current weather for an OpenWeather city id
    pub async fn current_weather_by_id(&self, city_id: u64) -> Result<WeatherResponse, WeatherError> {
        let params = [("id", city_id.to_string())];
        let key = logical_key(WEATHER_ENDPOINT, &params);
        WeatherResponse::assemble(self.fetch(WEATHER_ENDPOINT, &params, &key).await?)
    }

    /// Forecast for a city name; `cnt` is the number of 3-hour entries (max 40)
    pub async fn forecast(&self, city: &str, cnt: u8) -> Result<ForecastResponse, WeatherError> {
        let params = [("q", city.to_string()), ("cnt", cnt.to_string())];
        let key = logical_key(FORECAST_ENDPOINT, &params);
        ForecastResponse::assemble(self.fetch(FORECAST_ENDPOINT, &params, &key).await?)
    }

    /// Forecast for an OpenWeather city id
    pub async fn forecast_by_id(&self, city_id: u64, cnt: u8) -> Result<ForecastResponse, WeatherError> {
        let params = [("id", city_id.to_string()), ("cnt", cnt.to_string())];
        let key = logical_key(FORECAST_ENDPOINT, &params);
        ForecastResponse::assemble(self.fetch(FORECAST_ENDPOINT, &params, &key).await?)
    }

    /// Deletes every cached response, returning how many were removed
    pub fn clear_cache(&self) -> usize {
        self.cache.clear()
    }

    /// Deletes expired cached responses, returning how many were removed
    pub fn clear_expired_cache(&self) -> usize {
        self.cache.clear_expired()
    }
}

/// Classifies a received response
///
/// 404 and 401 map to their own kinds, any other non-success status or a
/// body that is not JSON becomes `InvalidResponse`.
fn classify_response(
    status: StatusCode,
    body: &str,
    params: &[(&str, String)],
) -> Result<Value, WeatherError> {
    match status {
        StatusCode::NOT_FOUND => Err(WeatherError::NotFound(format!(
            "City not found: {}",
            describe_target(params)
        ))),
        StatusCode::UNAUTHORIZED => Err(WeatherError::Unauthorized("Invalid API key".to_string())),
        s if !s.is_success() => Err(WeatherError::InvalidResponse(format!(
            "API returned status code {}: {}",
            s.as_u16(),
            body
        ))),
        _ => serde_json::from_str(body).map_err(|e| {
            WeatherError::InvalidResponse(format!("Failed to parse JSON response: {}", e))
        }),
    }
}

/// The city name or id a request is about, for messages
fn describe_target<'a>(params: &'a [(&str, String)]) -> &'a str {
    params
        .iter()
        .find(|(name, _)| *name == "q")
        .or_else(|| params.iter().find(|(name, _)| *name == "id"))
        .map_or("unknown", |(_, value)| value.as_str())
}
