//! Error types for Postwall
//!
//! All errors in the application are converted to `AppError`,
//! which implements `IntoResponse` and renders an HTML error page.
//! The REST layer wraps it in `api::ApiError` for JSON bodies.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Application-wide error type
#[derive(Debug, Error)]
pub enum AppError {
    /// Resource not found (404)
    #[error("Resource not found")]
    NotFound,

    /// Authentication required (401)
    #[error("Authentication required")]
    Unauthorized,

    /// Access denied (403)
    #[error("Access denied")]
    Forbidden,

    /// Validation error (400)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Database error (500)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Media storage error (500)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration error (500)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Encryption/signing error (500)
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Internal server error (500)
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl AppError {
    /// HTTP status and metric label for this error
    pub fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::NotFound => (StatusCode::NOT_FOUND, "not_found"),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "forbidden"),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "validation"),
            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "database"),
            AppError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage"),
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config"),
            AppError::Encryption(_) => (StatusCode::INTERNAL_SERVER_ERROR, "encryption"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        }
    }

    /// Message safe to show to a client; server faults stay opaque
    pub fn public_message(&self) -> String {
        match self {
            AppError::Validation(msg) => msg.clone(),
            AppError::Database(_)
            | AppError::Storage(_)
            | AppError::Config(_)
            | AppError::Encryption(_)
            | AppError::Internal(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }

    pub(crate) fn record(&self) {
        let (status, kind) = self.status_and_kind();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        crate::metrics::ERRORS_TOTAL.with_label_values(&[kind]).inc();
    }
}

impl IntoResponse for AppError {
    /// Convert error to an HTML error page
    fn into_response(self) -> Response {
        self.record();
        let (status, _) = self.status_and_kind();
        let page = match status {
            StatusCode::NOT_FOUND => crate::web::render::not_found_page(None),
            s if s.is_server_error() => crate::web::render::server_error_page(),
            s => crate::web::render::error_page(s, &self.public_message()),
        };
        (status, page).into_response()
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
