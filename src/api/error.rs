//! API error types with structured JSON responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::db::{DatabaseError, StoreError};
use crate::pipeline::PipelineError;

/// Structured error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

/// Upload problems caught before the pipeline runs.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Missing multipart field '{0}'")]
    MissingField(&'static str),
    #[error("File type not allowed: {0}")]
    DisallowedType(String),
    #[error("File too large: {size} bytes (limit {limit})")]
    TooLarge { size: usize, limit: usize },
    #[error("Uploaded file is empty")]
    Empty,
    #[error("Malformed multipart body: {0}")]
    Multipart(String),
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Classifier unavailable: {0}")]
    ClassifierUnavailable(String),
    #[error("History is disabled")]
    HistoryDisabled,
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::Validation(e) => (StatusCode::BAD_REQUEST, "VALIDATION", e.to_string()),
            ApiError::BadRequest(detail) => {
                (StatusCode::BAD_REQUEST, "VALIDATION", detail.clone())
            }
            ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, "NOT_FOUND", detail.clone()),
            ApiError::ClassifierUnavailable(detail) => {
                tracing::error!(detail, "Request rejected, classifier unavailable");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "CLASSIFIER_UNAVAILABLE",
                    "Document classifier is not loaded".to_string(),
                )
            }
            ApiError::HistoryDisabled => (
                StatusCode::SERVICE_UNAVAILABLE,
                "HISTORY_DISABLED",
                "History storage is not configured".to_string(),
            ),
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ErrorBody {
            error: ErrorDetail { code, message },
        };
        (status, Json(body)).into_response()
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::ClassifierUnavailable(reason) => ApiError::ClassifierUnavailable(reason),
            PipelineError::InvalidImage(reason) => {
                ApiError::BadRequest(format!("Uploaded file is not a readable image: {reason}"))
            }
            PipelineError::Classification(reason) => ApiError::Internal(reason),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Database(DatabaseError::NotFound { entity_type, id }) => {
                ApiError::NotFound(format!("{entity_type} {id} not found"))
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Internal(format!("pipeline task aborted: {err}"))
    }
}
