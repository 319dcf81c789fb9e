//! Application error types

use serde::Serialize;
use std::fmt;

/// Application-wide error type
///
/// Channel-level delivery failures never reach this type; the dispatcher
/// converts them into eviction plus a not-delivered outcome. These variants
/// cover startup and the admin HTTP surface only.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    /// Get HTTP status code for this error
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::Config(_) => 500,
        }
    }

    /// Get error code for API responses
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
        }
    }

    /// Create a validation error
    #[must_use]
    pub fn validation(msg: impl fmt::Display) -> Self {
        Self::Validation(msg.to_string())
    }
}

impl From<crate::config::ConfigError> for AppError {
    fn from(err: crate::config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

/// Error response structure for API responses
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl From<&AppError> for ErrorResponse {
    fn from(err: &AppError) -> Self {
        Self {
            code: err.error_code().to_string(),
            message: err.to_string(),
        }
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::Validation("test".to_string()).status_code(), 400);
        assert_eq!(AppError::Config("test".to_string()).status_code(), 500);
    }

    #[test]
    fn test_error_response() {
        let err = AppError::validation("message is required");
        let response = ErrorResponse::from(&err);

        assert_eq!(response.code, "VALIDATION_ERROR");
        assert_eq!(response.message, "Validation error: message is required");
    }

    #[test]
    fn test_config_error_conversion() {
        let err: AppError = crate::config::ConfigError::MissingVar("GATEWAY_PORT").into();
        assert_eq!(err.error_code(), "CONFIG_ERROR");
        assert!(err.to_string().contains("GATEWAY_PORT"));
    }
}
