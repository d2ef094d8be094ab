//! HTTP error type shared by all route handlers.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::db::StoreError;
use crate::identity::IdentityError;

pub const UNEXPECTED_ERROR: &str = "An unexpected error occurred. Please try again.";

/// Error body: `{ "error": "..." }` with an optional detail message.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Missing or malformed input, caught before touching the store.
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    /// A collaborator failed; the message is shown to the user as-is.
    #[error("{0}")]
    Failed(String),
    #[error("{0}")]
    Unavailable(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Identity(#[from] IdentityError),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(message.into())
    }

    pub fn not_found() -> Self {
        ApiError::NotFound("Not found".to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Failed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Store(StoreError::Duplicate(_)) => StatusCode::CONFLICT,
            ApiError::Store(StoreError::NotConfigured) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Store(StoreError::Database(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Identity(e) => e.status(),
        }
    }

    /// Text the client gets to see.
    fn public_message(&self) -> String {
        match self {
            ApiError::Store(StoreError::Database(_)) => UNEXPECTED_ERROR.to_string(),
            ApiError::Store(StoreError::NotConfigured) => "Database not available".to_string(),
            ApiError::Identity(e) => e.public_message(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = %status, error = %self, "request failed");
        }
        (
            status,
            Json(ErrorResponse {
                error: self.public_message(),
                message: None,
            }),
        )
            .into_response()
    }
}

/// Success body of the public forms: `{ "success": "..." }`.
#[derive(Debug, Serialize, Deserialize)]
pub struct FormSuccess {
    pub success: String,
}

impl FormSuccess {
    pub fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: message.into(),
        })
    }
}
