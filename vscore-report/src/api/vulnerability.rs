//! Scored household listing

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::db::{self, ListingRow, RecordFilter};
use crate::error::{ApiError, ApiResult};
use crate::pagination::{calculate_pagination, PageParams, Pagination, DEFAULT_LIMIT};
use crate::AppState;

/// Query parameters for `GET /api/vulnerability`
#[derive(Debug, Deserialize)]
pub struct ListingQuery {
    /// Exact region name; absent or `ALL` for every region
    pub region: Option<String>,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
    /// Substring of household id, head name or region
    pub search: Option<String>,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    DEFAULT_LIMIT
}

#[derive(Debug, Serialize)]
pub struct ListingResponse {
    pub data: Vec<ListingRow>,
    pub pagination: Pagination,
}

/// GET /api/vulnerability
pub async fn list_vulnerability(
    State(state): State<AppState>,
    Query(query): Query<ListingQuery>,
) -> ApiResult<Json<ListingResponse>> {
    let params = PageParams {
        page: query.page,
        limit: query.limit,
    };
    params.validate().map_err(ApiError::BadRequest)?;

    let filter = RecordFilter::new(query.region.as_deref(), query.search.as_deref());

    let total_items = db::count_records(&state.db, &filter).await?;
    let data = db::list_records(&state.db, &filter, params.limit, params.offset()).await?;

    Ok(Json(ListingResponse {
        data,
        pagination: calculate_pagination(total_items, &params),
    }))
}

/// GET /api/vulnerability/regions
pub async fn list_scored_regions(State(state): State<AppState>) -> ApiResult<Json<Vec<String>>> {
    Ok(Json(db::distinct_regions(&state.db).await?))
}

pub fn vulnerability_routes() -> Router<AppState> {
    Router::new()
        .route("/api/vulnerability", get(list_vulnerability))
        .route("/api/vulnerability/regions", get(list_scored_regions))
}
