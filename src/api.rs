//! HTTP API over the weather client
//!
//! Exposes the same operations as the CLI under `/weather`. Fetch failures are
//! answered with the status from `WeatherError::status_code` and a JSON body of
//! the form `{"detail": "<message>"}`.

use std::io;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::{TcpListener, ToSocketAddrs};
use tower_http::cors::CorsLayer;
use tracing::{debug, info};

use crate::data::{ForecastFilter, ForecastItem, ForecastResponse, WeatherClient, WeatherResponse};
use crate::error::WeatherError;

/// Default bind address for `serve`
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default port for `serve`
pub const DEFAULT_PORT: u16 = 8000;

/// Forecast entries returned when `cnt` is not given (5 days)
const DEFAULT_FORECAST_COUNT: u8 = 40;

/// Shared state handed to every handler
pub struct AppState {
    client: WeatherClient,
}

/// Errors returned by API handlers
#[derive(Debug)]
pub enum ApiError {
    /// The upstream fetch failed
    Weather(WeatherError),
    /// A path or query parameter is out of range
    Validation(String),
}

impl From<WeatherError> for ApiError {
    fn from(error: WeatherError) -> Self {
        ApiError::Weather(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::Weather(e) => (
                StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                e.to_string(),
            ),
            ApiError::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

/// Query parameters for the forecast endpoints
#[derive(Debug, Default, Deserialize)]
pub struct ForecastQuery {
    /// Number of 3-hour entries (1-40)
    pub cnt: Option<u8>,
}

/// Query parameters for the filtered forecast endpoint
#[derive(Debug, Default, Deserialize)]
pub struct FilterQuery {
    pub weather_condition: Option<String>,
    pub min_temp: Option<f64>,
    pub max_temp: Option<f64>,
    pub min_humidity: Option<u8>,
    pub max_humidity: Option<u8>,
    pub cnt: Option<u8>,
}

impl FilterQuery {
    fn filter(&self) -> Result<ForecastFilter, ApiError> {
        for (name, value) in [
            ("min_humidity", self.min_humidity),
            ("max_humidity", self.max_humidity),
        ] {
            if value.is_some_and(|v| v > 100) {
                return Err(ApiError::Validation(format!(
                    "{} must be between 0 and 100",
                    name
                )));
            }
        }

        Ok(ForecastFilter {
            condition: self.weather_condition.clone(),
            min_temp: self.min_temp,
            max_temp: self.max_temp,
            min_humidity: self.min_humidity,
            max_humidity: self.max_humidity,
        })
    }
}

/// Builds the application router around a configured client
pub fn router(client: WeatherClient) -> Router {
    let state = Arc::new(AppState { client });

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/weather/current/:city", get(current_weather))
        .route("/weather/current/id/:city_id", get(current_weather_by_id))
        .route("/weather/forecast/:city", get(forecast))
        .route("/weather/forecast/id/:city_id", get(forecast_by_id))
        .route("/weather/forecast/:city/filter", get(filtered_forecast))
        .route("/weather/cache/clear", delete(clear_cache))
        .route("/weather/cache/clear-expired", delete(clear_expired_cache))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

/// Binds `addr` and serves the API until Ctrl+C
pub async fn serve(client: WeatherClient, addr: impl ToSocketAddrs) -> io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;
    println!("Weather API listening on http://{}", local_addr);
    info!(addr = %local_addr, "weather API started");

    axum::serve(listener, router(client))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("weather API stopped");
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    debug!("received shutdown signal");
}

async fn root() -> Json<Value> {
    Json(json!({
        "message": "Welcome to GlobalTrend Weather API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "current_weather": "/weather/current/{city}",
            "current_weather_by_id": "/weather/current/id/{city_id}",
            "forecast": "/weather/forecast/{city}",
            "forecast_by_id": "/weather/forecast/id/{city_id}",
            "filtered_forecast": "/weather/forecast/{city}/filter"
        }
    }))
}

async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "cache_enabled": true,
        "cache_entries": state.client.cache().len()
    }))
}

async fn current_weather(
    State(state): State<Arc<AppState>>,
    Path(city): Path<String>,
) -> Result<Json<WeatherResponse>, ApiError> {
    let city = non_blank(&city)?;
    Ok(Json(state.client.current_weather(city).await?))
}

async fn current_weather_by_id(
    State(state): State<Arc<AppState>>,
    Path(city_id): Path<u64>,
) -> Result<Json<WeatherResponse>, ApiError> {
    let city_id = positive_id(city_id)?;
    Ok(Json(state.client.current_weather_by_id(city_id).await?))
}

async fn forecast(
    State(state): State<Arc<AppState>>,
    Path(city): Path<String>,
    Query(query): Query<ForecastQuery>,
) -> Result<Json<ForecastResponse>, ApiError> {
    let city = non_blank(&city)?;
    let cnt = forecast_count(query.cnt)?;
    Ok(Json(state.client.forecast(city, cnt).await?))
}

async fn forecast_by_id(
    State(state): State<Arc<AppState>>,
    Path(city_id): Path<u64>,
    Query(query): Query<ForecastQuery>,
) -> Result<Json<ForecastResponse>, ApiError> {
    let city_id = positive_id(city_id)?;
    let cnt = forecast_count(query.cnt)?;
    Ok(Json(state.client.forecast_by_id(city_id, cnt).await?))
}

async fn filtered_forecast(
    State(state): State<Arc<AppState>>,
    Path(city): Path<String>,
    Query(query): Query<FilterQuery>,
) -> Result<Json<Vec<ForecastItem>>, ApiError> {
    let city = non_blank(&city)?;
    let cnt = forecast_count(query.cnt)?;
    let filter = query.filter()?;

    let response = state.client.forecast(city, cnt).await?;
    Ok(Json(filter.apply(&response.list)))
}

async fn clear_cache(State(state): State<Arc<AppState>>) -> Json<Value> {
    let count = state.client.clear_cache();
    Json(json!({
        "message": format!("Successfully cleared {} cache files", count),
        "count": count
    }))
}

async fn clear_expired_cache(State(state): State<Arc<AppState>>) -> Json<Value> {
    let count = state.client.clear_expired_cache();
    Json(json!({
        "message": format!("Successfully cleared {} expired cache files", count),
        "count": count
    }))
}

fn non_blank(city: &str) -> Result<&str, ApiError> {
    let city = city.trim();
    if city.is_empty() {
        return Err(ApiError::Validation("city must not be empty".to_string()));
    }
    Ok(city)
}

fn positive_id(city_id: u64) -> Result<u64, ApiError> {
    if city_id == 0 {
        return Err(ApiError::Validation("city_id must be greater than 0".to_string()));
    }
    Ok(city_id)
}

fn forecast_count(cnt: Option<u8>) -> Result<u8, ApiError> {
    match cnt.unwrap_or(DEFAULT_FORECAST_COUNT) {
        cnt @ 1..=40 => Ok(cnt),
        _ => Err(ApiError::Validation("cnt must be between 1 and 40".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn error_parts(error: ApiError) -> (StatusCode, Value) {
        let response = error.into_response();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_weather_errors_map_to_status() {
        let cases = [
            (WeatherError::NotFound("City not found: X".into()), StatusCode::NOT_FOUND),
            (WeatherError::Unauthorized("Invalid API key".into()), StatusCode::UNAUTHORIZED),
            (WeatherError::Timeout("slow".into()), StatusCode::GATEWAY_TIMEOUT),
            (WeatherError::NetworkFailure("down".into()), StatusCode::SERVICE_UNAVAILABLE),
            (WeatherError::InvalidResponse("bad".into()), StatusCode::BAD_GATEWAY),
        ];

        for (error, expected) in cases {
            let message = error.to_string();
            let (status, body) = error_parts(error.into()).await;
            assert_eq!(status, expected);
            assert_eq!(body["detail"], message);
        }
    }

    #[tokio::test]
    async fn test_validation_error_is_unprocessable() {
        let (status, body) = error_parts(ApiError::Validation("cnt out of range".into())).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["detail"], "cnt out of range");
    }

    #[test]
    fn test_forecast_count_bounds() {
        assert_eq!(forecast_count(None).unwrap(), 40);
        assert_eq!(forecast_count(Some(1)).unwrap(), 1);
        assert!(forecast_count(Some(0)).is_err());
        assert!(forecast_count(Some(41)).is_err());
    }

    #[test]
    fn test_filter_query_rejects_humidity_over_100() {
        let query = FilterQuery {
            max_humidity: Some(101),
            ..Default::default()
        };
        assert!(matches!(query.filter(), Err(ApiError::Validation(_))));
    }

    #[test]
    fn test_path_guards() {
        assert!(non_blank("  ").is_err());
        assert_eq!(non_blank(" Paris ").unwrap(), "Paris");
        assert!(positive_id(0).is_err());
    }
}
