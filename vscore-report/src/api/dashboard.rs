//! Dashboard aggregates: label counts and the per-region rollup
//!
//! The region index weights each household by tier (1 = very vulnerable,
//! 3 = not vulnerable) and divides by the maximum possible weight, so it
//! runs from 1/3 (everyone very vulnerable) to 1 (nobody vulnerable).

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use vscore_common::Severity;

use crate::db::{self, RegionCounts, RecordFilter};
use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    pub region: Option<String>,
}

/// Counts per severity label
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub total: i64,
    pub very_vulnerable: i64,
    pub vulnerable: i64,
    pub not_vulnerable: i64,
    /// Region the counts are restricted to; `ALL` when unfiltered
    pub region_filter: String,
}

/// One row of the per-region rollup
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionSummary {
    pub region: String,
    pub very_vulnerable: i64,
    pub vulnerable: i64,
    pub not_vulnerable: i64,
    pub total: i64,
    pub region_index: f64,
}

impl From<RegionCounts> for RegionSummary {
    fn from(counts: RegionCounts) -> Self {
        Self {
            region_index: region_index(
                counts.very_vulnerable,
                counts.vulnerable,
                counts.not_vulnerable,
            ),
            region: counts.region,
            very_vulnerable: counts.very_vulnerable,
            vulnerable: counts.vulnerable,
            not_vulnerable: counts.not_vulnerable,
            total: counts.total,
        }
    }
}

/// `(vv·1 + v·2 + nv·3) / (total·3)` rounded to 4 decimals; 0 for an
/// empty region
pub fn region_index(very_vulnerable: i64, vulnerable: i64, not_vulnerable: i64) -> f64 {
    let total = very_vulnerable + vulnerable + not_vulnerable;
    if total <= 0 {
        return 0.0;
    }

    let weighted = very_vulnerable * Severity::VeryVulnerable.index_weight()
        + vulnerable * Severity::Vulnerable.index_weight()
        + not_vulnerable * Severity::NotVulnerable.index_weight();
    let max_weight = total * Severity::NotVulnerable.index_weight();

    let index = weighted as f64 / max_weight as f64;
    (index * 10_000.0).round() / 10_000.0
}

/// GET /api/dashboard
pub async fn dashboard_stats(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> ApiResult<Json<DashboardStats>> {
    let filter = RecordFilter::new(query.region.as_deref(), None);
    let counts = db::label_counts(&state.db, filter.region.as_deref()).await?;

    let mut stats = DashboardStats {
        total: 0,
        very_vulnerable: 0,
        vulnerable: 0,
        not_vulnerable: 0,
        region_filter: filter
            .region
            .unwrap_or_else(|| db::vulnerability::ALL_REGIONS.to_string()),
    };

    for row in counts {
        stats.total += row.count;
        match row.severity_label.parse::<Severity>() {
            Ok(Severity::VeryVulnerable) => stats.very_vulnerable += row.count,
            Ok(Severity::Vulnerable) => stats.vulnerable += row.count,
            Ok(Severity::NotVulnerable) => stats.not_vulnerable += row.count,
            Err(_) => tracing::warn!(label = %row.severity_label, "Unknown severity label"),
        }
    }

    Ok(Json(stats))
}

/// GET /api/dashboard/regions
pub async fn region_rollup(State(state): State<AppState>) -> ApiResult<Json<Vec<RegionSummary>>> {
    let rows = db::region_rollup(&state.db).await?;
    Ok(Json(rows.into_iter().map(RegionSummary::from).collect()))
}

pub fn dashboard_routes() -> Router<AppState> {
    Router::new()
        .route("/api/dashboard", get(dashboard_stats))
        .route("/api/dashboard/regions", get(region_rollup))
}
