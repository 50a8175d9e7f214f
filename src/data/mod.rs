//! Core data models for the GlobalTrend weather client
//!
//! This module contains the OpenWeather response shapes, the raw result of a
//! cache-aware fetch, and the typed responses assembled from it.

pub mod filter;
pub mod weather;

pub use filter::ForecastFilter;
pub use weather::WeatherClient;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::cache::CacheEntry;
use crate::error::WeatherError;

/// Raw outcome of a fetch: the upstream JSON plus where it came from
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResult {
    /// The provider's JSON payload, untouched
    pub payload: Value,
    /// Whether the payload was served from the cache
    pub cached: bool,
    /// When the payload was originally cached; `None` for fresh payloads
    pub cached_at: Option<DateTime<Utc>>,
}

impl FetchResult {
    /// A payload that was just fetched from the provider
    pub fn fresh(payload: Value) -> Self {
        Self {
            payload,
            cached: false,
            cached_at: None,
        }
    }

    /// A payload served from a fresh cache entry
    pub fn from_cache(entry: CacheEntry) -> Self {
        Self {
            payload: entry.data,
            cached: true,
            cached_at: Some(entry.cached_at),
        }
    }
}

/// Geographic coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lon: f64,
    pub lat: f64,
}

/// Weather condition description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherDescription {
    /// Weather condition id
    pub id: u32,
    /// Group of weather parameters (Rain, Snow, Clouds etc.)
    pub main: String,
    /// Weather condition within the group
    pub description: String,
    /// Weather icon id
    pub icon: String,
}

/// Main weather parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MainData {
    /// Temperature in Celsius
    pub temp: f64,
    /// Feels-like temperature in Celsius
    pub feels_like: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    /// Atmospheric pressure in hPa
    pub pressure: u32,
    /// Relative humidity percentage (0-100)
    pub humidity: u8,
    pub sea_level: Option<u32>,
    pub grnd_level: Option<u32>,
}

/// Wind information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindData {
    /// Wind speed in m/s
    pub speed: f64,
    /// Wind direction in degrees
    pub deg: u16,
    /// Wind gust in m/s
    pub gust: Option<f64>,
}

/// Cloudiness percentage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudsData {
    pub all: u8,
}

/// Current weather for a single location, as returned by the `weather` endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherItem {
    pub coord: Coordinates,
    pub weather: Vec<WeatherDescription>,
    pub base: String,
    pub main: MainData,
    /// Visibility in meters
    pub visibility: Option<u32>,
    pub wind: WindData,
    pub clouds: CloudsData,
    /// Time of data calculation, unix seconds, UTC
    pub dt: i64,
    /// Shift in seconds from UTC
    pub timezone: i32,
    /// City id
    pub id: u64,
    /// City name
    pub name: String,
    pub cod: u16,
}

impl WeatherItem {
    /// Primary weather condition group, or "Unknown" if none was reported
    pub fn weather_main(&self) -> &str {
        primary_condition(&self.weather)
    }

    /// Time the observation was calculated
    pub fn observed_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.dt, 0)
    }
}

/// A single 3-hour forecast entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastItem {
    /// Forecast time, unix seconds, UTC
    pub dt: i64,
    pub main: MainData,
    pub weather: Vec<WeatherDescription>,
    pub clouds: CloudsData,
    pub wind: WindData,
    pub visibility: Option<u32>,
    /// Probability of precipitation (0.0-1.0)
    pub pop: f64,
    /// Forecast time as text, e.g. "2024-07-15 12:00:00"
    pub dt_txt: String,
}

impl ForecastItem {
    /// Primary weather condition group, or "Unknown" if none was reported
    pub fn weather_main(&self) -> &str {
        primary_condition(&self.weather)
    }

    /// Time the forecast applies to
    pub fn forecast_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.dt, 0)
    }
}

/// City information in a forecast response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityData {
    pub id: u64,
    pub name: String,
    pub coord: Coordinates,
    /// ISO country code
    pub country: String,
    #[serde(default)]
    pub population: u64,
    /// Shift in seconds from UTC
    pub timezone: i32,
    /// Sunrise time, unix seconds, UTC
    pub sunrise: i64,
    /// Sunset time, unix seconds, UTC
    pub sunset: i64,
}

/// Current weather plus cache metadata
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherResponse {
    pub data: WeatherItem,
    /// Whether data was retrieved from cache
    pub cached: bool,
    /// When the data was cached
    pub cached_at: Option<DateTime<Utc>>,
}

impl WeatherResponse {
    /// Wraps a fetch result, failing if the payload is not a `WeatherItem`
    pub fn assemble(result: FetchResult) -> Result<Self, WeatherError> {
        Ok(Self {
            data: parse_payload(result.payload)?,
            cached: result.cached,
            cached_at: result.cached_at,
        })
    }
}

/// Forecast data plus cache metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResponse {
    pub cod: String,
    #[serde(default)]
    pub message: i64,
    /// Number of forecast items
    pub cnt: u32,
    pub list: Vec<ForecastItem>,
    pub city: CityData,
    /// Whether data was retrieved from cache
    #[serde(default)]
    pub cached: bool,
    /// When the data was cached
    #[serde(default)]
    pub cached_at: Option<DateTime<Utc>>,
}

impl ForecastResponse {
    /// Wraps a fetch result, failing if the payload is not a forecast
    pub fn assemble(result: FetchResult) -> Result<Self, WeatherError> {
        let mut response: ForecastResponse = parse_payload(result.payload)?;
        response.cached = result.cached;
        response.cached_at = result.cached_at;
        Ok(response)
    }
}

fn primary_condition(weather: &[WeatherDescription]) -> &str {
    weather.first().map_or("Unknown", |w| w.main.as_str())
}

/// Converts a raw payload into a typed response
///
/// A mismatch means the provider's schema changed, or a cached payload was
/// written by an incompatible version, and is reported as `InvalidResponse`.
fn parse_payload<T: DeserializeOwned>(payload: Value) -> Result<T, WeatherError> {
    serde_json::from_value(payload)
        .map_err(|e| WeatherError::InvalidResponse(format!("Unexpected response shape: {}", e)))
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Sample OpenWeather payloads shared by tests

    use serde_json::{json, Value};

    pub fn current_weather(name: &str) -> Value {
        json!({
            "coord": { "lon": -0.1257, "lat": 51.5085 },
            "weather": [
                { "id": 803, "main": "Clouds", "description": "broken clouds", "icon": "04d" }
            ],
            "base": "stations",
            "main": {
                "temp": 14.2, "feels_like": 13.6, "temp_min": 12.9, "temp_max": 15.3,
                "pressure": 1012, "humidity": 77
            },
            "visibility": 10000,
            "wind": { "speed": 4.6, "deg": 240 },
            "clouds": { "all": 75 },
            "dt": 1721052000,
            "sys": { "country": "GB", "sunrise": 1721016000, "sunset": 1721074000 },
            "timezone": 3600,
            "id": 2643743,
            "name": name,
            "cod": 200
        })
    }

    pub fn forecast_item(dt: i64, temp: f64, humidity: u8, main: &str) -> Value {
        json!({
            "dt": dt,
            "main": {
                "temp": temp, "feels_like": temp, "temp_min": temp, "temp_max": temp,
                "pressure": 1010, "sea_level": 1010, "grnd_level": 1005, "humidity": humidity
            },
            "weather": [
                { "id": 500, "main": main, "description": main.to_lowercase(), "icon": "10d" }
            ],
            "clouds": { "all": 40 },
            "wind": { "speed": 3.1, "deg": 200, "gust": 5.2 },
            "visibility": 10000,
            "pop": 0.35,
            "dt_txt": "2024-07-15 12:00:00"
        })
    }

    pub fn forecast(name: &str, items: Vec<Value>) -> Value {
        json!({
            "cod": "200",
            "message": 0,
            "cnt": items.len(),
            "list": items,
            "city": {
                "id": 2643743,
                "name": name,
                "coord": { "lat": 51.5085, "lon": -0.1257 },
                "country": "GB",
                "population": 1000000,
                "timezone": 3600,
                "sunrise": 1721016000,
                "sunset": 1721074000
            }
        })
    }
}
