//! Error types for Newsdesk
//!
//! All errors in the application are converted to `AppError`,
//! which implements `IntoResponse` and renders an HTML error page.
//! Handlers that own a form catch provider failures themselves and
//! turn them into flash messages instead.

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use thiserror::Error;

use crate::auth::ProviderError;

/// Application-wide error type
#[derive(Debug, Error)]
pub enum AppError {
    /// Resource not found (404)
    #[error("Resource not found")]
    NotFound,

    /// Authentication required (redirects to sign-in)
    #[error("Authentication required")]
    Unauthorized,

    /// Identity provider rejected the request
    #[error("{0}")]
    Provider(#[from] ProviderError),

    /// Table API returned a non-success status (502)
    #[error("Backend error ({status}): {message}")]
    Backend { status: u16, message: String },

    /// HTTP client error (502)
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Summarizer returned something unusable (502)
    #[error("Summarizer error: {0}")]
    Summarizer(String),

    /// Configuration error (500)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Cookie signing error (500)
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
    /// Short label used for the error metric
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::NotFound => "not_found",
            AppError::Unauthorized => "unauthorized",
            AppError::Provider(_) => "provider",
            AppError::Backend { .. } => "backend",
            AppError::HttpClient(_) => "http_client",
            AppError::Summarizer(_) => "summarizer",
            AppError::Config(_) => "config",
            AppError::Encryption(_) => "encryption",
            AppError::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for AppError {
    /// Convert error to HTTP response
    ///
    /// Maps each error variant to a status code and a static,
    /// user-facing message. Upstream details stay in the logs.
    fn into_response(self) -> Response {
        use crate::metrics::ERRORS_TOTAL;

        ERRORS_TOTAL.with_label_values(&[self.kind()]).inc();

        let (status, message) = match &self {
            AppError::Unauthorized => {
                return Redirect::to("/sign-in").into_response();
            }
            AppError::NotFound => (StatusCode::NOT_FOUND, "The page you requested was not found."),
            AppError::Provider(_) => (
                StatusCode::BAD_GATEWAY,
                "Authentication service is unavailable. Please try again.",
            ),
            AppError::Backend { .. } | AppError::HttpClient(_) | AppError::Summarizer(_) => {
                tracing::error!(error = %self, "Upstream request failed");
                (
                    StatusCode::BAD_GATEWAY,
                    "The news service is unavailable. Please try again.",
                )
            }
            AppError::Config(_) | AppError::Encryption(_) | AppError::Internal(_) => {
                tracing::error!(error = %self, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Something went wrong. Please try again.",
                )
            }
        };

        let page: Html<String> = crate::api::error_page(status, message);
        (status, page).into_response()
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variants_map_to_statuses() {
        let backend = AppError::Backend {
            status: 500,
            message: "boom".to_string(),
        };
        assert_eq!(backend.kind(), "backend");
        assert_eq!(backend.into_response().status(), StatusCode::BAD_GATEWAY);

        assert_eq!(
            AppError::NotFound.into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Config("missing key".to_string())
                .into_response()
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );

        let unauthorized = AppError::Unauthorized.into_response();
        assert_eq!(unauthorized.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            unauthorized.headers().get("location").unwrap(),
            "/sign-in"
        );
    }
}
