//! Error taxonomy for upstream weather fetches
//!
//! Every failed fetch surfaces exactly one `WeatherError`. Callers (the CLI, or
//! an HTTP layer) match on the variant rather than inspecting messages.

use thiserror::Error;

/// Errors that can occur when fetching weather data
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WeatherError {
    /// Connection could not be established or broke mid-request
    #[error("{0}")]
    NetworkFailure(String),

    /// No response arrived within the configured timeout
    #[error("{0}")]
    Timeout(String),

    /// Non-success status, or a body that is not the expected JSON shape
    #[error("{0}")]
    InvalidResponse(String),

    /// The provider rejected the API key
    #[error("{0}")]
    Unauthorized(String),

    /// The requested city or city id does not exist
    #[error("{0}")]
    NotFound(String),
}

impl WeatherError {
    /// HTTP status an API layer should answer with for this error
    pub fn status_code(&self) -> u16 {
        match self {
            WeatherError::NotFound(_) => 404,
            WeatherError::Unauthorized(_) => 401,
            WeatherError::Timeout(_) => 504,
            WeatherError::NetworkFailure(_) => 503,
            WeatherError::InvalidResponse(_) => 502,
        }
    }

    /// The human-readable message carried by the error
    pub fn message(&self) -> &str {
        match self {
            WeatherError::NetworkFailure(msg)
            | WeatherError::Timeout(msg)
            | WeatherError::InvalidResponse(msg)
            | WeatherError::Unauthorized(msg)
            | WeatherError::NotFound(msg) => msg,
        }
    }
}
