//! Household source query
//!
//! Reads one row per household from the upstream record store with every
//! aggregate the feature extractor needs. The pipeline never writes these
//! tables.

use sqlx::SqlitePool;
use tracing::info;
use vscore_common::Result;

use crate::features::{HouseholdRow, ASSET_TYPES_HIGH, ASSET_TYPES_LOW, ASSET_TYPES_MEDIUM};

fn id_list(ids: &[i64]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// SELECT producing [`HouseholdRow`] columns
///
/// Latest program period is the label on the highest history `id`.
/// Decile is averaged over all history rows; `COALESCE` turns a household
/// with no decile history into 0 so the validity filter drops it. Sums are
/// cast to REAL since integer amounts would otherwise come back as INTEGER.
fn household_query() -> String {
    format!(
        r#"
        SELECT
            h.household_id AS household_id,
            r.name AS region,
            CAST(COALESCE(
                (SELECT AVG(d.decile) FROM decile_history d WHERE d.household_id = h.household_id),
                0.0
            ) AS REAL) AS income_decile,
            h.national_rank AS national_rank,
            (SELECT COUNT(*) FROM household_members m WHERE m.household_id = h.household_id) AS dependents,
            (SELECT CAST(SUM(a.amount) AS REAL) FROM household_assets a
                WHERE a.household_id = h.household_id AND a.asset_type_id IN ({high})) AS asset_high,
            (SELECT CAST(SUM(a.amount) AS REAL) FROM household_assets a
                WHERE a.household_id = h.household_id AND a.asset_type_id IN ({medium})) AS asset_medium,
            (SELECT CAST(SUM(a.amount) AS REAL) FROM household_assets a
                WHERE a.household_id = h.household_id AND a.asset_type_id IN ({low})) AS asset_low,
            (SELECT b.period_label FROM bpnt_history b
                WHERE b.household_id = h.household_id ORDER BY b.id DESC LIMIT 1) AS bpnt_period,
            (SELECT p.period_label FROM pkh_history p
                WHERE p.household_id = h.household_id ORDER BY p.id DESC LIMIT 1) AS pkh_period,
            h.inactive AS inactive
        FROM households h
        LEFT JOIN regions r ON r.region_id = h.region_id
        ORDER BY h.household_id
        "#,
        high = id_list(&ASSET_TYPES_HIGH),
        medium = id_list(&ASSET_TYPES_MEDIUM),
        low = id_list(&ASSET_TYPES_LOW),
    )
}

/// Load every household with its raw aggregates
pub async fn load_households(pool: &SqlitePool) -> Result<Vec<HouseholdRow>> {
    let rows: Vec<HouseholdRow> = sqlx::query_as(&household_query())
        .fetch_all(pool)
        .await?;

    info!(rows = rows.len(), "Loaded households from record store");
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_lists_every_asset_tier() {
        let sql = household_query();
        assert!(sql.contains("IN (3, 7, 9, 11, 13)"));
        assert!(sql.contains("IN (2, 4, 8, 14)"));
        assert!(sql.contains("IN (1, 5, 6, 10, 12)"));
    }
}
