//! Application error type shared by services and HTTP handlers.

use crate::db::snapshot::SnapshotError;
use crate::db::StoreError;
use crate::domain::models::EvaluationStatus;
use crate::domain::workflow::WorkflowError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },

    #[error("persistence error: {0}")]
    Persistence(#[from] StoreError),

    #[error("not signed in")]
    Unauthorized,

    #[error("too many attempts, try again later")]
    RateLimited,

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("cannot move evaluation from {from} to {to}")]
    InvalidTransition {
        from: EvaluationStatus,
        to: EvaluationStatus,
    },

    #[error("evaluation has been approved by an admin and is read-only")]
    ReadOnly,

    #[error("snapshot rejected: {0}")]
    Snapshot(String),
}

impl AppError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound { kind, id: id.into() }
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::Forbidden(reason.into())
    }

    /// Empty lists pass; anything else becomes a `Validation` error.
    pub fn check(errors: Vec<String>) -> Result<(), AppError> {
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(errors))
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::InvalidTransition { .. } | Self::ReadOnly => StatusCode::CONFLICT,
            Self::Snapshot(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<WorkflowError> for AppError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::InvalidTransition { from, to } => AppError::InvalidTransition { from, to },
            WorkflowError::ReadOnly => AppError::ReadOnly,
            WorkflowError::Forbidden(action) => AppError::Forbidden(action.to_string()),
            WorkflowError::UnknownGoal(_) => AppError::Validation(vec![err.to_string()]),
        }
    }
}

impl From<SnapshotError> for AppError {
    fn from(err: SnapshotError) -> Self {
        match err {
            SnapshotError::Store(store) => AppError::Persistence(store),
            other => AppError::Snapshot(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Self::Persistence(err) => {
                tracing::error!(error = %err, "persistence failure");
                json!({ "error": "storage operation failed" })
            }
            Self::Validation(errors) => json!({ "error": "validation failed", "details": errors }),
            other => json!({ "error": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}
