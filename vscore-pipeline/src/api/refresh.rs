//! Refresh trigger API
//!
//! POST /refresh, GET /refresh/last

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};

use crate::error::{ApiError, ApiResult};
use crate::models::RefreshResult;
use crate::orchestrator::RefreshOptions;
use crate::AppState;

/// POST /refresh
///
/// Runs a refresh and returns its structured result. A failed run is still a
/// 200 with `status: "error"`; only a concurrent trigger is rejected (409).
pub async fn trigger_refresh(State(state): State<AppState>) -> ApiResult<Json<RefreshResult>> {
    let result = state
        .coordinator
        .trigger(state.db.clone(), RefreshOptions::default())
        .await?;

    Ok(Json(result))
}

/// GET /refresh/last
pub async fn last_refresh(State(state): State<AppState>) -> ApiResult<Json<RefreshResult>> {
    state
        .coordinator
        .last_result()
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("No refresh has run since startup".to_string()))
}

pub fn refresh_routes() -> Router<AppState> {
    Router::new()
        .route("/refresh", post(trigger_refresh))
        .route("/refresh/last", get(last_refresh))
}
