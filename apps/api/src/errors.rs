use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::alignment::orchestrator::AlignmentError;
use crate::ingest::extract::ExtractError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unprocessable entity: {0}")]
    UnprocessableEntity(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// A collaborator answered with something that could not be decoded.
    /// `raw` is returned to the caller for diagnosis.
    #[error("Malformed response: {message}")]
    MalformedResponse { message: String, raw: String },

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<AlignmentError> for AppError {
    fn from(err: AlignmentError) -> Self {
        match err {
            AlignmentError::MissingRequiredField { .. } | AlignmentError::InvalidIterationBudget => {
                AppError::Validation(err.to_string())
            }
            AlignmentError::AlreadyRunning(_) => AppError::Conflict(err.to_string()),
            AlignmentError::MalformedResponse { ref raw, .. } => AppError::MalformedResponse {
                raw: raw.clone(),
                message: err.to_string(),
            },
            AlignmentError::CollaboratorUnavailable { .. } => AppError::Llm(err.to_string()),
        }
    }
}

impl From<ExtractError> for AppError {
    fn from(err: ExtractError) -> Self {
        if err.is_unsupported() {
            AppError::Validation(err.to_string())
        } else {
            AppError::UnprocessableEntity(err.to_string())
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut raw_payload = None;
        let (status, code, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg),
            AppError::UnprocessableEntity(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "UNPROCESSABLE_ENTITY",
                msg,
            ),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            AppError::MalformedResponse { message, raw } => {
                tracing::error!("{message}; raw payload: {raw}");
                raw_payload = Some(raw);
                (StatusCode::BAD_GATEWAY, "MALFORMED_RESPONSE", message)
            }
            AppError::Llm(msg) => {
                tracing::error!("LLM error: {msg}");
                (StatusCode::BAD_GATEWAY, "LLM_ERROR", msg)
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
        if let Some(raw) = raw_payload {
            error["raw"] = json!(raw);
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}
