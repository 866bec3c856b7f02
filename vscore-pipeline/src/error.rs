//! Error types for vscore-pipeline
//!
//! [`PipelineError`] is internal to a refresh run; the orchestrator turns it
//! into a structured [`crate::models::RefreshResult`]. [`ApiError`] is what
//! HTTP handlers return.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::models::Diagnostics;

/// Failure of one refresh run
#[derive(Debug, Error)]
pub enum PipelineError {
    /// No household survived the eligibility filters
    #[error("No eligible households after filtering (inactive or missing decile/national rank)")]
    EmptyInput { diagnostics: Diagnostics },

    /// Clustering could not run on the feature matrix
    #[error("Clustering failed: {0}")]
    Clustering(#[from] crate::clustering::ClusteringError),

    /// Every persistence batch failed; the live table was left untouched
    #[error("All {batches} persistence batches failed; previous results kept")]
    PersistenceFailed { batches: usize },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error(transparent)]
    Common(#[from] vscore_common::Error),
}

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Failure to start or complete a coordinated refresh
#[derive(Debug, Error)]
pub enum RefreshError {
    /// Another refresh holds the single-writer lock
    #[error("A refresh is already running")]
    AlreadyRunning,

    #[error("Refresh task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Conflict (409) - a refresh is already running
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Common error: {0}")]
    Common(#[from] vscore_common::Error),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
}

impl From<RefreshError> for ApiError {
    fn from(err: RefreshError) -> Self {
        match err {
            RefreshError::AlreadyRunning => ApiError::Conflict(err.to_string()),
            RefreshError::Task(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
            ApiError::Database(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "DATABASE_ERROR",
                err.to_string(),
            ),
            ApiError::Common(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "COMMON_ERROR",
                err.to_string(),
            ),
            ApiError::Pipeline(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "PIPELINE_ERROR",
                err.to_string(),
            ),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
