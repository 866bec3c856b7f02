//! Upstream household and region browsing

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::db::{self, HouseholdRow};
use crate::error::{ApiError, ApiResult};
use crate::pagination::{calculate_pagination, PageParams, Pagination, DEFAULT_LIMIT};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct HouseholdQuery {
    /// Region name; absent or `ALL` for every region
    pub region: Option<String>,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    DEFAULT_LIMIT
}

#[derive(Debug, Serialize)]
pub struct HouseholdListResponse {
    pub data: Vec<HouseholdRow>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct RegionName {
    pub name: String,
}

/// GET /api/households
pub async fn list_households(
    State(state): State<AppState>,
    Query(query): Query<HouseholdQuery>,
) -> ApiResult<Json<HouseholdListResponse>> {
    let params = PageParams {
        page: query.page,
        limit: query.limit,
    };
    params.validate().map_err(ApiError::BadRequest)?;

    let region = db::RecordFilter::new(query.region.as_deref(), None).region;

    let total_items = db::count_households(&state.db, region.as_deref()).await?;
    let data = db::list_households(&state.db, region.as_deref(), params.limit, params.offset()).await?;

    Ok(Json(HouseholdListResponse {
        data,
        pagination: calculate_pagination(total_items, &params),
    }))
}

/// GET /api/regions
pub async fn list_regions(State(state): State<AppState>) -> ApiResult<Json<Vec<RegionName>>> {
    let names = db::list_region_names(&state.db).await?;
    Ok(Json(names.into_iter().map(|name| RegionName { name }).collect()))
}

pub fn household_routes() -> Router<AppState> {
    Router::new()
        .route("/api/households", get(list_households))
        .route("/api/regions", get(list_regions))
}
