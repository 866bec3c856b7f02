//! Queries against the `vulnerability_records` result table

use serde::Serialize;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use vscore_common::Severity;

use super::contains_pattern;

/// Region value meaning "no region filter"
pub const ALL_REGIONS: &str = "ALL";

/// Display name for records with no region
pub const UNNAMED_REGION: &str = "Unnamed Region";

/// Listing filter shared by the count and page queries
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    pub region: Option<String>,
    pub search: Option<String>,
}

impl RecordFilter {
    /// Build a filter from raw query parameters; blank values and the `ALL`
    /// region are dropped.
    pub fn new(region: Option<&str>, search: Option<&str>) -> Self {
        let region = region
            .map(str::trim)
            .filter(|r| !r.is_empty() && !r.eq_ignore_ascii_case(ALL_REGIONS))
            .map(str::to_string);
        let search = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        Self { region, search }
    }

    fn push_where(&self, builder: &mut QueryBuilder<'_, Sqlite>) {
        builder.push(" WHERE 1 = 1");

        if let Some(region) = &self.region {
            builder.push(" AND v.region = ").push_bind(region.clone());
        }

        if let Some(search) = &self.search {
            let pattern = contains_pattern(search);
            builder
                .push(" AND (v.household_id LIKE ")
                .push_bind(pattern.clone())
                .push(r" ESCAPE '\' OR h.head_name LIKE ")
                .push_bind(pattern.clone())
                .push(r" ESCAPE '\' OR v.region LIKE ")
                .push_bind(pattern)
                .push(r" ESCAPE '\')");
        }
    }
}

/// One listing row: the scored record plus household identity columns
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ListingRow {
    pub household_id: String,
    pub family_card_no: String,
    pub head_name: String,
    pub address: String,
    pub region: Option<String>,
    pub cluster_id: i64,
    pub severity_label: String,
    pub base_score: i64,
    pub final_score: i64,
    pub income_decile: f64,
    pub national_rank: i64,
    pub dependents: i64,
    pub asset_high: f64,
    pub asset_medium: f64,
    pub asset_low: f64,
    pub bpnt_period: Option<String>,
    pub pkh_period: Option<String>,
    pub bpnt_penalty: i64,
    pub pkh_penalty: i64,
    pub total_penalty: i64,
}

const LISTING_COLUMNS: &str = r#"
    SELECT
        v.household_id,
        IFNULL(h.family_card_no, '-') AS family_card_no,
        IFNULL(h.head_name, 'Incomplete Data') AS head_name,
        IFNULL(h.address, '-') AS address,
        v.region,
        v.cluster_id,
        v.severity_label,
        v.base_score,
        v.final_score,
        v.income_decile,
        v.national_rank,
        v.dependents,
        v.asset_high,
        v.asset_medium,
        v.asset_low,
        v.bpnt_penalty,
        v.pkh_penalty,
        v.total_penalty,
        v.bpnt_period,
        v.pkh_period
    FROM vulnerability_records v
    LEFT JOIN households h ON h.household_id = v.household_id
"#;

/// Number of records matching `filter`
pub async fn count_records(pool: &SqlitePool, filter: &RecordFilter) -> Result<i64, sqlx::Error> {
    let mut builder = QueryBuilder::<Sqlite>::new(
        "SELECT COUNT(*) FROM vulnerability_records v \
         LEFT JOIN households h ON h.household_id = v.household_id",
    );
    filter.push_where(&mut builder);

    builder.build_query_scalar::<i64>().fetch_one(pool).await
}

/// One page of records, highest final score first
pub async fn list_records(
    pool: &SqlitePool,
    filter: &RecordFilter,
    limit: i64,
    offset: i64,
) -> Result<Vec<ListingRow>, sqlx::Error> {
    let mut builder = QueryBuilder::<Sqlite>::new(LISTING_COLUMNS);
    filter.push_where(&mut builder);
    builder
        .push(" ORDER BY v.final_score DESC, v.household_id ASC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);

    builder.build_query_as::<ListingRow>().fetch_all(pool).await
}

/// Distinct non-null regions present in the result table
pub async fn distinct_regions(pool: &SqlitePool) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT DISTINCT region FROM vulnerability_records \
         WHERE region IS NOT NULL AND region != '' ORDER BY region",
    )
    .fetch_all(pool)
    .await
}

/// Record count for one severity label
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct LabelCount {
    pub severity_label: String,
    pub count: i64,
}

/// Records per severity label, optionally for one region
pub async fn label_counts(
    pool: &SqlitePool,
    region: Option<&str>,
) -> Result<Vec<LabelCount>, sqlx::Error> {
    let mut builder = QueryBuilder::<Sqlite>::new(
        "SELECT severity_label, COUNT(*) AS count FROM vulnerability_records",
    );
    if let Some(region) = region {
        builder.push(" WHERE region = ").push_bind(region.to_string());
    }
    builder.push(" GROUP BY severity_label");

    builder.build_query_as::<LabelCount>().fetch_all(pool).await
}

/// Per-region record counts by severity
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct RegionCounts {
    pub region: String,
    pub total: i64,
    pub very_vulnerable: i64,
    pub vulnerable: i64,
    pub not_vulnerable: i64,
}

/// Counts per region, NULL regions grouped under [`UNNAMED_REGION`],
/// ordered by region name
pub async fn region_rollup(pool: &SqlitePool) -> Result<Vec<RegionCounts>, sqlx::Error> {
    let sql = format!(
        r#"
        SELECT
            IFNULL(region, '{unnamed}') AS region,
            COUNT(*) AS total,
            SUM(CASE WHEN severity_label = '{vv}' THEN 1 ELSE 0 END) AS very_vulnerable,
            SUM(CASE WHEN severity_label = '{v}' THEN 1 ELSE 0 END) AS vulnerable,
            SUM(CASE WHEN severity_label = '{nv}' THEN 1 ELSE 0 END) AS not_vulnerable
        FROM vulnerability_records
        GROUP BY IFNULL(region, '{unnamed}')
        ORDER BY region ASC
        "#,
        unnamed = UNNAMED_REGION,
        vv = Severity::VeryVulnerable.as_str(),
        v = Severity::Vulnerable.as_str(),
        nv = Severity::NotVulnerable.as_str(),
    );

    sqlx::query_as::<_, RegionCounts>(&sql).fetch_all(pool).await
}
