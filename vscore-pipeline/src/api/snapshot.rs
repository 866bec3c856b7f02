//! GET /snapshot/current

use axum::{extract::State, routing::get, Json, Router};

use crate::db::load_current_snapshot;
use crate::error::{ApiError, ApiResult};
use crate::models::ModelSnapshot;
use crate::AppState;

/// Snapshot behind the live result table
pub async fn current_snapshot(State(state): State<AppState>) -> ApiResult<Json<ModelSnapshot>> {
    load_current_snapshot(&state.db)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("No model snapshot has been published".to_string()))
}

pub fn snapshot_routes() -> Router<AppState> {
    Router::new().route("/snapshot/current", get(current_snapshot))
}
