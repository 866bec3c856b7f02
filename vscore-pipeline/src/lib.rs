//! vscore-pipeline library interface
//!
//! The vulnerability scoring pipeline plus the HTTP service that triggers
//! it. Exposed as a library for the binary and for integration tests.

pub mod api;
pub mod clustering;
pub mod db;
pub mod error;
pub mod features;
pub mod models;
pub mod orchestrator;
pub mod penalty;
pub mod period;
pub mod scoring;
pub mod utils;

pub use crate::error::{ApiError, ApiResult, PipelineError, RefreshError};
pub use crate::orchestrator::{refresh_vulnerability_scores, RefreshCoordinator, RefreshOptions};

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Single-writer refresh gate and last result
    pub coordinator: RefreshCoordinator,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: SqlitePool) -> Self {
        Self {
            db,
            coordinator: RefreshCoordinator::new(),
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::refresh_routes())
        .merge(api::snapshot_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
