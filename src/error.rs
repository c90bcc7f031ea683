// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid or expired ID token")]
    InvalidToken,

    #[error("CSRF token missing or mismatched")]
    CsrfMismatch,

    #[error("Authorization required: {0}")]
    Authorization(String),

    #[error("Upstream API error: {0}")]
    Upstream(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            // Page routes would redirect; the API surface rejects with 403.
            AppError::Unauthorized => (StatusCode::FORBIDDEN, "unauthorized", None),
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid_token", None),
            AppError::CsrfMismatch => (StatusCode::FORBIDDEN, "csrf_mismatch", None),
            // The front end must re-run the consent flow on this one.
            AppError::Authorization(msg) => (
                StatusCode::UNAUTHORIZED,
                "authorization_required",
                Some(msg.clone()),
            ),
            AppError::Upstream(msg) => {
                tracing::error!(error = %msg, "Upstream API error");
                (StatusCode::BAD_GATEWAY, "upstream_error", None)
            }
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
