//! Error handling module for the jokes backend.
//!
//! Provides the application error type with mapping to HTTP status codes and the
//! `{ error, details }` response body the front end expects.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    /// Requested document does not exist
    NotFound(String),
    /// Missing or empty required field on create
    Validation(String),
    /// Malformed request
    BadRequest(String),
    /// The store rejected a write carrying a stale revision
    Conflict(String),
    /// The store could not be reached
    Unavailable(String),
    /// Any other failure reported by the document store
    Store(String),
    /// Internal server error
    Internal(String),
}

impl AppError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short, client-facing summary for the `error` field.
    pub fn summary(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "not found",
            AppError::Validation(_) => "validation failed",
            AppError::BadRequest(_) => "bad request",
            AppError::Conflict(_) => "document update conflict",
            AppError::Unavailable(_) => "document store unavailable",
            AppError::Store(_) => "document store error",
            AppError::Internal(_) => "internal error",
        }
    }

    /// Get the error message.
    pub fn message(&self) -> &str {
        match self {
            AppError::NotFound(msg)
            | AppError::Validation(msg)
            | AppError::BadRequest(msg)
            | AppError::Conflict(msg)
            | AppError::Unavailable(msg)
            | AppError::Store(msg)
            | AppError::Internal(msg) => msg,
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.summary(), self.message())
    }
}

impl std::error::Error for AppError {}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        tracing::error!("Document store request error: {:?}", err);
        if err.is_connect() || err.is_timeout() {
            AppError::Unavailable(format!("Document store unreachable: {}", err))
        } else {
            AppError::Store(format!("Document store request failed: {}", err))
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("Database error: {:?}", err);
        AppError::Store(format!("Database error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        tracing::error!("JSON error: {:?}", err);
        AppError::Store(format!("Malformed document: {}", err))
    }
}

/// Error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: &AppError) -> Self {
        // Not-found carries no detail, matching what clients already handle.
        let details = match error {
            AppError::NotFound(_) => None,
            other => Some(other.message().to_string()),
        };

        Self {
            error: match error {
                AppError::NotFound(msg) => msg.clone(),
                other => other.summary().to_string(),
            },
            details,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse::new(&self);
        (status, Json(body)).into_response()
    }
}
