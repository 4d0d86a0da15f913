/// Unified error types for the live session reporting backend
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the service
#[derive(Error, Debug)]
pub enum AppError {
    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Authorization errors (permission denied)
    #[error("Not authorized: {0}")]
    Authorization(String),

    /// Validation errors
    ///
    /// The message is shown to the user verbatim, so it carries no prefix.
    #[error("{0}")]
    Validation(String),

    /// Workflow transition not allowed from the current state
    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    /// Rate limiting errors
    #[error("Rate limit exceeded")]
    RateLimitExceeded { retry_after: std::time::Duration },

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Conflict errors (e.g., duplicate account)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Upstream or database operation took too long
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JWT errors
    #[error("JWT error: {0}")]
    Jwt(String),
}

impl AppError {
    /// Stable error code used in response bodies and metrics labels
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Authentication(_) => "AuthenticationRequired",
            AppError::Authorization(_) => "Forbidden",
            AppError::Validation(_) => "InvalidRequest",
            AppError::InvalidStateTransition(_) => "InvalidStateTransition",
            AppError::NotFound(_) => "NotFound",
            AppError::Conflict(_) => "Conflict",
            AppError::RateLimitExceeded { .. } => "RateLimitExceeded",
            AppError::Timeout(_) => "Timeout",
            AppError::Jwt(_) => "AuthenticationRequired",
            AppError::Database(_) | AppError::Internal(_) | AppError::Io(_) => {
                "InternalServerError"
            }
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Authentication(_) | AppError::Jwt(_) => StatusCode::UNAUTHORIZED,
            AppError::Authorization(_) => StatusCode::FORBIDDEN,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidStateTransition(_) | AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::Database(_) | AppError::Internal(_) | AppError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// JSON error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Convert AppError to HTTP response
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Database(e) => {
                tracing::error!(error = %e, "database error while handling request");
                "Internal server error".to_string() // Don't leak details
            }
            AppError::Internal(e) => {
                tracing::error!(error = %e, "internal error while handling request");
                "Internal server error".to_string()
            }
            AppError::Io(e) => {
                tracing::error!(error = %e, "io error while handling request");
                "Internal server error".to_string()
            }
            AppError::RateLimitExceeded { .. } => "Rate limit exceeded".to_string(),
            _ => self.to_string(),
        };

        crate::metrics::record_error(self.code());

        let body = Json(ErrorResponse {
            error: self.code().to_string(),
            message,
        });

        let mut response = (status, body).into_response();
        if let AppError::RateLimitExceeded { retry_after } = self {
            if let Ok(value) = retry_after.as_secs().max(1).to_string().parse() {
                response.headers_mut().insert("Retry-After", value);
            }
        }
        response
    }
}

/// Result type alias for service operations
pub type AppResult<T> = Result<T, AppError>;
