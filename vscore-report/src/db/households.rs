//! Queries against the upstream household and region tables

use serde::Serialize;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

/// One upstream household with its region name
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct HouseholdRow {
    pub household_id: String,
    pub family_card_no: Option<String>,
    pub head_name: Option<String>,
    pub address: Option<String>,
    pub region: Option<String>,
    pub national_rank: Option<i64>,
    pub inactive: Option<i64>,
}

fn push_region_filter(builder: &mut QueryBuilder<'_, Sqlite>, region: Option<&str>) {
    if let Some(region) = region {
        builder.push(" WHERE r.name = ").push_bind(region.to_string());
    }
}

pub async fn count_households(pool: &SqlitePool, region: Option<&str>) -> Result<i64, sqlx::Error> {
    let mut builder = QueryBuilder::<Sqlite>::new(
        "SELECT COUNT(*) FROM households h LEFT JOIN regions r ON r.region_id = h.region_id",
    );
    push_region_filter(&mut builder, region);

    builder.build_query_scalar::<i64>().fetch_one(pool).await
}

/// One page of households ordered by identifier
pub async fn list_households(
    pool: &SqlitePool,
    region: Option<&str>,
    limit: i64,
    offset: i64,
) -> Result<Vec<HouseholdRow>, sqlx::Error> {
    let mut builder = QueryBuilder::<Sqlite>::new(
        r#"
        SELECT
            h.household_id,
            h.family_card_no,
            h.head_name,
            h.address,
            r.name AS region,
            h.national_rank,
            h.inactive
        FROM households h
        LEFT JOIN regions r ON r.region_id = h.region_id
        "#,
    );
    push_region_filter(&mut builder, region);
    builder
        .push(" ORDER BY h.household_id ASC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);

    builder.build_query_as::<HouseholdRow>().fetch_all(pool).await
}

/// Every region name, ascending
pub async fn list_region_names(pool: &SqlitePool) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar("SELECT name FROM regions ORDER BY name ASC")
        .fetch_all(pool)
        .await
}
