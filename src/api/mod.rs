//! REST API module.
//!
//! Every handler answers with the same envelope: `{success, message?, data?}`
//! on success and `{success, message, error}` on failure.

mod articles;
mod categories;
mod comments;
mod engagement;
mod health;
mod projects;

pub use articles::*;
pub use categories::*;
pub use comments::*;
pub use engagement::*;
pub use health::*;
pub use projects::*;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::errors::{ApiError, AppError};
use crate::AppState;

/// Success response envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    #[serde(skip)]
    pub status: StatusCode,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(status: StatusCode, data: Option<T>, message: Option<String>) -> Self {
        Self {
            status,
            success: true,
            message,
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

/// Response type that can be either success or error.
pub type ApiResult<T> = Result<ApiResponse<T>, ApiError>;

/// 200 with a payload.
pub fn success<T: Serialize>(data: T) -> ApiResult<T> {
    Ok(ApiResponse::new(StatusCode::OK, Some(data), None))
}

/// 201 with the created record.
pub fn created<T: Serialize>(data: T, message: &str) -> ApiResult<T> {
    Ok(ApiResponse::new(
        StatusCode::CREATED,
        Some(data),
        Some(message.to_string()),
    ))
}

/// 200 with a payload and a human-readable message.
pub fn success_with_message<T: Serialize>(data: T, message: &str) -> ApiResult<T> {
    Ok(ApiResponse::new(
        StatusCode::OK,
        Some(data),
        Some(message.to_string()),
    ))
}

/// 200 with only a message, for deletions.
pub fn done(message: &str) -> ApiResult<()> {
    Ok(ApiResponse::new(
        StatusCode::OK,
        None,
        Some(message.to_string()),
    ))
}

/// Create an error API response honouring the instance's diagnostics policy.
pub fn error<T: Serialize>(err: AppError, state: &AppState) -> ApiResult<T> {
    Err(ApiError {
        error: err,
        verbose: state.config.expose_diagnostics(),
    })
}

/// Map a handler outcome onto the envelope.
pub fn respond<T: Serialize>(result: Result<T, AppError>, state: &AppState) -> ApiResult<T> {
    match result {
        Ok(data) => success(data),
        Err(e) => error(e, state),
    }
}

/// Turn an extractor rejection (bad JSON, query or form) into a validation error.
pub fn rejected(rejection: impl std::fmt::Display) -> AppError {
    AppError::Validation(format!("Invalid request: {}", rejection))
}

/// Envelope for routes that do not exist.
pub async fn not_found() -> ApiError {
    ApiError {
        error: AppError::NotFound("Route not found".to_string()),
        verbose: false,
    }
}
