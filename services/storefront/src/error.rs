//! Custom error types for the storefront HTTP layer

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Custom error type for the storefront HTTP layer
#[derive(Error, Debug)]
pub enum ApiError {
    /// No valid admin session
    #[error("Unauthorized")]
    Unauthorized,

    /// Login rejected; deliberately says nothing about which field was wrong
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Bad request with message
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Caller exceeded its quota
    #[error("Too many requests, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// Feature not configured on this instance
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// An upstream service failed while handling the request
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Internal server error
    #[error("Internal server error")]
    InternalServerError,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            ApiError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "Invalid credentials".to_string())
            }
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::RateLimited { retry_after_secs } => {
                let body = Json(json!({
                    "error": "Too many requests, please wait before trying again",
                    "retryAfter": retry_after_secs,
                }));
                let mut response = (StatusCode::TOO_MANY_REQUESTS, body).into_response();
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(*retry_after_secs));
                return response;
            }
            ApiError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            ApiError::Upstream(_) => (
                StatusCode::BAD_GATEWAY,
                "Upstream service error".to_string(),
            ),
            ApiError::InternalServerError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;
