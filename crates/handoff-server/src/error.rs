//! Error types for the server crate.
//!
//! Clients only learn the coarse category. Token failure kinds, vault miss
//! reasons and internal details stay in logs and the audit trail.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use handoff_token::{FailureKind, TokenError};
use serde::Serialize;
use thiserror::Error;

/// Errors that can occur while serving a request or starting the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The token was malformed, tampered with, or outside its window.
    #[error("token rejected: {0}")]
    Unauthorized(FailureKind),

    /// Vault handle unknown, consumed, or expired; or no artifact for the subject.
    #[error("not found")]
    NotFound,

    /// The request was missing or had an unusable parameter.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Failed to start the server.
    #[error("failed to start server: {0}")]
    StartupFailed(String),

    /// Anything else.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ServerError::NotFound => StatusCode::NOT_FOUND,
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::StartupFailed(_) | ServerError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// The message clients see. Fixed per category.
    fn public_message(&self) -> String {
        match self {
            ServerError::Unauthorized(_) => "Invalid or expired token".to_string(),
            ServerError::NotFound => "Artifact not found".to_string(),
            ServerError::BadRequest(msg) => msg.clone(),
            ServerError::StartupFailed(_) | ServerError::Internal(_) => {
                "Internal server error".to_string()
            }
        }
    }
}

impl From<TokenError> for ServerError {
    fn from(err: TokenError) -> Self {
        let kind = err.kind();
        if kind.is_unauthorized() {
            ServerError::Unauthorized(kind)
        } else {
            ServerError::Internal(err.to_string())
        }
    }
}

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub timestamp: String,
    pub status: u16,
    pub error: String,
    pub message: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "Request failed");
        }

        let body = ErrorBody {
            timestamp: chrono::Utc::now().to_rfc3339(),
            status: status.as_u16(),
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: self.public_message(),
        };

        (status, Json(body)).into_response()
    }
}
