//! GlobalTrend weather client library
//!
//! Fetches OpenWeather data through a time-bound, file-backed response cache.
//! The binary in `main.rs` is a thin front end over these modules, either as a
//! one-shot CLI or as an HTTP API (`api`).

pub mod api;
pub mod cache;
pub mod cli;
pub mod config;
pub mod data;
pub mod display;
pub mod error;
pub mod logging;

pub use cache::CacheManager;
pub use config::{Config, ConfigError};
pub use data::{FetchResult, ForecastResponse, WeatherClient, WeatherResponse};
pub use error::WeatherError;
