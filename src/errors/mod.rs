//! Error handling module for the Inkwell backend.
//!
//! Provides centralized error types with mapping to HTTP status codes and response envelopes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::validation::FieldError;

/// Error codes as constants to avoid stringly-typed errors.
pub mod codes {
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const CONFLICT: &str = "CONFLICT";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
    pub const DATABASE_ERROR: &str = "DATABASE_ERROR";
    pub const UPSTREAM_ERROR: &str = "UPSTREAM_ERROR";
    pub const TIMEOUT: &str = "TIMEOUT";
}

/// Message shown in place of internal diagnostics in production.
const GENERIC_INTERNAL_MESSAGE: &str = "Internal server error";

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    /// Missing or malformed input, including bad identifiers
    Validation(String),
    /// Per-field validation failures
    InvalidFields(Vec<FieldError>),
    /// Resource not found
    NotFound(String),
    /// Uniqueness violation, duplicate like or unlike without a like
    Conflict(String),
    /// Content store failure
    Database(String),
    /// Media service failure
    Upstream(String),
    /// An external call exceeded its time budget; safe to retry
    Timeout(String),
    /// Internal server error
    Internal(String),
}

impl AppError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::InvalidFields(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Timeout(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Validation(_) | AppError::InvalidFields(_) => codes::VALIDATION_ERROR,
            AppError::NotFound(_) => codes::NOT_FOUND,
            AppError::Conflict(_) => codes::CONFLICT,
            AppError::Database(_) => codes::DATABASE_ERROR,
            AppError::Upstream(_) => codes::UPSTREAM_ERROR,
            AppError::Timeout(_) => codes::TIMEOUT,
            AppError::Internal(_) => codes::INTERNAL_ERROR,
        }
    }

    /// Get the error message.
    pub fn message(&self) -> String {
        match self {
            AppError::Validation(msg) => msg.clone(),
            AppError::InvalidFields(fields) => match fields.as_slice() {
                [single] => single.message.clone(),
                _ => "Validation failed".to_string(),
            },
            AppError::NotFound(msg) => msg.clone(),
            AppError::Conflict(msg) => msg.clone(),
            AppError::Database(msg) => msg.clone(),
            AppError::Upstream(msg) => msg.clone(),
            AppError::Timeout(msg) => msg.clone(),
            AppError::Internal(msg) => msg.clone(),
        }
    }

    /// Whether the message carries internal diagnostics.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            AppError::Database(_) | AppError::Upstream(_) | AppError::Internal(_)
        )
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error_code(), self.message())
    }
}

impl std::error::Error for AppError {}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                tracing::warn!("Unique constraint violation: {}", db_err);
                AppError::Conflict("A record with the same unique value already exists".to_string())
            }
            sqlx::Error::PoolTimedOut => {
                tracing::error!("Database pool timed out");
                AppError::Timeout("The database did not respond in time, please retry".to_string())
            }
            _ => {
                tracing::error!("Database error: {:?}", err);
                AppError::Database(format!("Database error: {}", err))
            }
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        tracing::error!("JSON error: {:?}", err);
        AppError::Internal(format!("JSON error: {}", err))
    }
}

/// Error details in the response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Error response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    pub error: ErrorDetails,
}

impl ErrorResponse {
    /// Build the envelope, hiding internal diagnostics unless `verbose`.
    pub fn new(error: &AppError, verbose: bool) -> Self {
        let (message, details) = match error {
            AppError::InvalidFields(fields) => (
                error.message(),
                serde_json::to_value(fields).ok(),
            ),
            e if e.is_internal() && !verbose => (GENERIC_INTERNAL_MESSAGE.to_string(), None),
            e if e.is_internal() => (
                GENERIC_INTERNAL_MESSAGE.to_string(),
                Some(serde_json::json!({ "diagnostic": e.message() })),
            ),
            e => (e.message(), None),
        };

        Self {
            success: false,
            message,
            error: ErrorDetails {
                code: error.error_code().to_string(),
                details,
            },
        }
    }
}

/// Wrapper type for errors that carry the diagnostics policy of the running instance.
#[derive(Debug)]
pub struct ApiError {
    pub error: AppError,
    pub verbose: bool,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.error.status_code();
        let body = ErrorResponse::new(&self.error, self.verbose);
        (status, Json(body)).into_response()
    }
}
