//! API error types and handling

use authgate_shared::StoreError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::auth::{cookie::CookieError, jwt::JwtError, oauth::OAuthError};

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    // Authentication errors
    /// Deliberately identical for unknown user and wrong password
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("Invalid or expired token")]
    InvalidToken,
    #[error("Authentication required")]
    Unauthorized,
    #[error("Insufficient permissions")]
    Forbidden,

    // Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    // Resource errors
    #[error("Resource not found")]
    NotFound,
    #[error("Resource already exists")]
    Conflict(String),

    // Upstream (OAuth provider) errors
    #[error("OAuth exchange failed")]
    OAuthExchangeFailed(StatusCode),
    #[error("OAuth profile is missing an email address")]
    InvalidProfile,
    #[error("OAuth provider unavailable")]
    UpstreamUnavailable,

    // Internal errors
    #[error("Database error: {0}")]
    Database(String),
    #[error("Internal server error")]
    Internal,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // Authentication
            ApiError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS", self.to_string()),
            ApiError::InvalidToken => (StatusCode::UNAUTHORIZED, "INVALID_TOKEN", self.to_string()),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", self.to_string()),
            ApiError::Forbidden => (StatusCode::FORBIDDEN, "FORBIDDEN", self.to_string()),

            // Validation
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),

            // Resources
            ApiError::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND", self.to_string()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),

            // Upstream: pass the provider's error status through when it sent one
            ApiError::OAuthExchangeFailed(upstream) => {
                let status = if upstream.is_client_error() || upstream.is_server_error() {
                    *upstream
                } else {
                    StatusCode::BAD_GATEWAY
                };
                (status, "OAUTH_EXCHANGE_FAILED", self.to_string())
            }
            ApiError::InvalidProfile => (StatusCode::BAD_GATEWAY, "INVALID_PROFILE", self.to_string()),
            ApiError::UpstreamUnavailable => (StatusCode::BAD_GATEWAY, "UPSTREAM_UNAVAILABLE", self.to_string()),

            // Internal: never echo the underlying cause
            ApiError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR", "Database error".to_string()),
            ApiError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", self.to_string()),
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate => ApiError::Conflict("Username already exists".to_string()),
            StoreError::NotFound => ApiError::NotFound,
            StoreError::Database(msg) => {
                tracing::error!(error = %msg, "Store error");
                ApiError::Database(msg)
            }
        }
    }
}

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired | JwtError::Invalid | JwtError::Validation(_) => {
                tracing::debug!(error = %err, "Rejected session token");
                ApiError::InvalidToken
            }
            JwtError::Encoding(msg) => {
                tracing::error!(error = %msg, "Failed to sign session token");
                ApiError::Internal
            }
        }
    }
}

impl From<OAuthError> for ApiError {
    fn from(err: OAuthError) -> Self {
        tracing::warn!(error = %err, "OAuth exchange aborted");
        match err {
            OAuthError::TokenRejected { status } | OAuthError::ProfileRejected { status } => {
                ApiError::OAuthExchangeFailed(status)
            }
            OAuthError::MissingAccessToken => ApiError::OAuthExchangeFailed(StatusCode::BAD_GATEWAY),
            OAuthError::InvalidProfile => ApiError::InvalidProfile,
            OAuthError::Timeout | OAuthError::Transport(_) => ApiError::UpstreamUnavailable,
            OAuthError::InvalidUrl(_) => ApiError::Internal,
        }
    }
}

impl From<CookieError> for ApiError {
    fn from(err: CookieError) -> Self {
        tracing::error!(error = %err, "Failed to build session cookie");
        ApiError::Internal
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
