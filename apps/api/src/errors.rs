use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::resumes::extract::ExtractError;
use crate::resumes::store::StoreError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Unreadable PDF: {0}")]
    UnreadablePdf(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    /// The model replied with something that is not the expected JSON object.
    /// `raw` is `None` once it has been redacted for the client.
    #[error("Parse error: {message}")]
    Parse {
        message: String,
        raw: Option<String>,
    },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Drops the raw upstream text from a parse error.
    pub fn redact_raw(self) -> Self {
        match self {
            AppError::Parse { message, .. } => AppError::Parse { message, raw: None },
            other => other,
        }
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => AppError::NotFound(format!("Resume {id} not found")),
            StoreError::Invalid(msg) => AppError::Validation(msg),
            StoreError::Storage(msg) => AppError::Storage(msg),
            StoreError::Database(e) => AppError::Database(e),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(format!("Invalid request body: {}", rejection.body_text()))
    }
}

impl From<ExtractError> for AppError {
    fn from(e: ExtractError) -> Self {
        AppError::UnreadablePdf(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut raw = None;
        let (status, code, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Authentication required".to_string(),
            ),
            AppError::UnreadablePdf(msg) => {
                tracing::error!("PDF extraction failed: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "UNREADABLE_PDF",
                    "The resume PDF could not be read".to_string(),
                )
            }
            AppError::Upstream(msg) => {
                tracing::error!("Analysis upstream error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "UPSTREAM_ERROR",
                    "The analysis service is unavailable".to_string(),
                )
            }
            AppError::Parse { message, raw: text } => {
                tracing::error!("Failed to parse analysis reply: {message}");
                raw = text;
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "PARSE_ERROR",
                    "Failed to parse AI response".to_string(),
                )
            }
            AppError::Storage(msg) => {
                tracing::error!("Storage error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORAGE_ERROR",
                    "A storage error occurred".to_string(),
                )
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let mut error = json!({
            "code": code,
            "message": message
        });
        if let Some(raw) = raw {
            error["raw"] = json!(raw);
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}
