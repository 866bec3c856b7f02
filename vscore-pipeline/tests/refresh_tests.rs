//! End-to-end refresh tests against a temporary SQLite database

mod helpers;

use std::collections::BTreeMap;
use std::time::Duration;

use helpers::{count_rows, create_test_db, seed_population, table_exists};
use sqlx::SqlitePool;
use vscore_common::db::{get_setting_raw, set_setting, VulnerabilityRecord, CURRENT_SNAPSHOT_KEY};
use vscore_common::Severity;
use vscore_pipeline::db::{load_current_snapshot, prepare_shadow};
use vscore_pipeline::models::RefreshStatus;
use vscore_pipeline::period::YearMonth;
use vscore_pipeline::{refresh_vulnerability_scores, RefreshCoordinator, RefreshError, RefreshOptions};

fn options() -> RefreshOptions {
    RefreshOptions {
        reference_month: Some(YearMonth::new(2024, 6)),
        settings: None,
    }
}

/// Create the shadow table up front with an insert trigger that aborts
/// whenever `condition` holds for the incoming row
async fn reject_shadow_rows(pool: &SqlitePool, condition: &str) {
    prepare_shadow(pool).await.unwrap();
    sqlx::query(&format!(
        "CREATE TRIGGER reject_rows BEFORE INSERT ON vulnerability_records_shadow \
         WHEN {} BEGIN SELECT RAISE(ABORT, 'row rejected'); END",
        condition
    ))
    .execute(pool)
    .await
    .unwrap();
}

async fn records(pool: &SqlitePool) -> BTreeMap<String, VulnerabilityRecord> {
    let rows: Vec<VulnerabilityRecord> = sqlx::query_as("SELECT * FROM vulnerability_records")
        .fetch_all(pool)
        .await
        .unwrap();
    rows.into_iter().map(|r| (r.household_id.clone(), r)).collect()
}

#[tokio::test]
async fn test_refresh_scores_every_eligible_household() {
    let (_dir, pool) = create_test_db().await;
    seed_population(&pool).await;

    let result = refresh_vulnerability_scores(&pool, &options()).await;

    assert_eq!(result.status, RefreshStatus::Success, "{}", result.message);
    assert_eq!(result.rows_processed, 9);
    assert_eq!(result.diagnostics.total_loaded, 11);
    assert_eq!(result.diagnostics.after_active_filter, 10);
    assert_eq!(result.diagnostics.after_validity_filter, 9);
    assert!(result.failed_batches.is_empty());

    let metrics = result.metrics.unwrap();
    assert_eq!(metrics.n_clusters, 3);
    assert!(metrics.silhouette.is_some());

    let rows = records(&pool).await;
    assert_eq!(rows.len(), 9);
    assert!(!rows.contains_key("X1"));
    assert!(!rows.contains_key("X2"));

    for id in ["P1", "P2", "P3"] {
        assert_eq!(rows[id].severity, Severity::VeryVulnerable, "{}", id);
        assert_eq!(rows[id].region.as_deref(), Some("Sukamaju"));
    }
    for id in ["M1", "M2", "M3"] {
        assert_eq!(rows[id].severity, Severity::Vulnerable, "{}", id);
    }
    for id in ["R1", "R2", "R3"] {
        assert_eq!(rows[id].severity, Severity::NotVulnerable, "{}", id);
    }

    for row in rows.values() {
        assert_eq!(row.final_score, row.base_score - row.total_penalty);
        assert_eq!(row.snapshot_id, result.snapshot_id.map(|id| id.to_string()));
    }

    assert!(!table_exists(&pool, "vulnerability_records_shadow").await);
}

#[tokio::test]
async fn test_refresh_applies_recency_penalty() {
    let (_dir, pool) = create_test_db().await;
    seed_population(&pool).await;

    refresh_vulnerability_scores(&pool, &options()).await;
    let rows = records(&pool).await;

    let p1 = &rows["P1"];
    assert_eq!(p1.bpnt_period.as_deref(), Some("BPNT JAN 2024"));
    assert_eq!(p1.pkh_period.as_deref(), Some("PKH MEI 2020"));
    assert_eq!(p1.bpnt_penalty, 40);
    assert_eq!(p1.pkh_penalty, 0);
    assert_eq!(p1.total_penalty, 40);
    assert_eq!(p1.base_score, 90);
    assert_eq!(p1.final_score, 50);

    let p2 = &rows["P2"];
    assert_eq!(p2.bpnt_period, None);
    assert_eq!(p2.total_penalty, 0);
    assert_eq!(p2.final_score, 90);
}

#[tokio::test]
async fn test_refresh_copies_raw_features() {
    let (_dir, pool) = create_test_db().await;
    seed_population(&pool).await;

    refresh_vulnerability_scores(&pool, &options()).await;
    let rows = records(&pool).await;

    let r1 = &rows["R1"];
    assert_eq!(r1.income_decile, 9.0);
    assert_eq!(r1.national_rank, 91);
    assert_eq!(r1.dependents, 1);
    assert_eq!(r1.asset_high, 550_000_000.0);
    assert_eq!(r1.asset_medium, 0.0);
    assert_eq!(r1.asset_low, 0.0);

    let m2 = &rows["M2"];
    assert_eq!(m2.asset_medium, 25_000_000.0);
    assert_eq!(m2.dependents, 3);
}

#[tokio::test]
async fn test_empty_input_leaves_previous_results() {
    let (_dir, pool) = create_test_db().await;
    seed_population(&pool).await;

    let first = refresh_vulnerability_scores(&pool, &options()).await;
    assert_eq!(first.status, RefreshStatus::Success);
    let before = records(&pool).await;
    let pointer_before = get_setting_raw(&pool, CURRENT_SNAPSHOT_KEY).await.unwrap();

    sqlx::query("UPDATE households SET inactive = 1")
        .execute(&pool)
        .await
        .unwrap();

    let second = refresh_vulnerability_scores(&pool, &options()).await;

    assert_eq!(second.status, RefreshStatus::Error);
    assert_eq!(second.rows_processed, 0);
    assert_eq!(second.diagnostics.total_loaded, 11);
    assert_eq!(second.diagnostics.after_active_filter, 0);
    assert_eq!(second.diagnostics.after_validity_filter, 0);
    assert!(second.snapshot_id.is_none());

    assert_eq!(records(&pool).await, before);
    assert_eq!(get_setting_raw(&pool, CURRENT_SNAPSHOT_KEY).await.unwrap(), pointer_before);
}

#[tokio::test]
async fn test_empty_database_reports_error() {
    let (_dir, pool) = create_test_db().await;

    let result = refresh_vulnerability_scores(&pool, &options()).await;

    assert_eq!(result.status, RefreshStatus::Error);
    assert_eq!(result.diagnostics.total_loaded, 0);
    assert_eq!(count_rows(&pool, "vulnerability_records").await, 0);
    assert!(load_current_snapshot(&pool).await.unwrap().is_none());
}

#[tokio::test]
async fn test_rerun_is_equivalent() {
    let (_dir, pool) = create_test_db().await;
    seed_population(&pool).await;

    refresh_vulnerability_scores(&pool, &options()).await;
    let first: BTreeMap<String, (Severity, i64)> = records(&pool)
        .await
        .into_iter()
        .map(|(id, r)| (id, (r.severity, r.final_score)))
        .collect();

    refresh_vulnerability_scores(&pool, &options()).await;
    let second: BTreeMap<String, (Severity, i64)> = records(&pool)
        .await
        .into_iter()
        .map(|(id, r)| (id, (r.severity, r.final_score)))
        .collect();

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_snapshot_published_with_swap() {
    let (_dir, pool) = create_test_db().await;
    seed_population(&pool).await;

    let first = refresh_vulnerability_scores(&pool, &options()).await;
    let snapshot = load_current_snapshot(&pool).await.unwrap().unwrap();

    assert_eq!(Some(snapshot.snapshot_id), first.snapshot_id);
    assert_eq!(snapshot.reference_month, YearMonth::new(2024, 6));
    assert_eq!(snapshot.feature_names.len(), 6);
    assert_eq!(snapshot.bounds.len(), 6);
    assert_eq!(snapshot.bounds[0].min, 1.0);
    assert_eq!(snapshot.bounds[0].max, 9.0);
    assert_eq!(snapshot.centroids.len(), 3);
    assert_eq!(snapshot.labels.len(), 3);
    assert_eq!(snapshot.household_count, 9);
    assert_eq!(snapshot.params.seed, 42);

    let second = refresh_vulnerability_scores(&pool, &options()).await;
    let current = load_current_snapshot(&pool).await.unwrap().unwrap();

    assert_ne!(first.snapshot_id, second.snapshot_id);
    assert_eq!(Some(current.snapshot_id), second.snapshot_id);
    assert_eq!(count_rows(&pool, "model_snapshots").await, 2);
}

#[tokio::test]
async fn test_snapshot_retention() {
    let (_dir, pool) = create_test_db().await;
    seed_population(&pool).await;
    set_setting(&pool, "snapshot_retention_count", "2").await.unwrap();

    let mut last = None;
    for _ in 0..4 {
        last = refresh_vulnerability_scores(&pool, &options()).await.snapshot_id;
    }

    assert_eq!(count_rows(&pool, "model_snapshots").await, 2);
    let current = load_current_snapshot(&pool).await.unwrap().unwrap();
    assert_eq!(Some(current.snapshot_id), last);
}

#[tokio::test]
async fn test_small_batches_still_succeed() {
    let (_dir, pool) = create_test_db().await;
    seed_population(&pool).await;
    set_setting(&pool, "refresh_batch_size", "2").await.unwrap();

    let result = refresh_vulnerability_scores(&pool, &options()).await;

    assert_eq!(result.status, RefreshStatus::Success);
    assert_eq!(result.rows_processed, 9);
    assert_eq!(count_rows(&pool, "vulnerability_records").await, 9);
}

#[tokio::test]
async fn test_fewer_than_three_households_single_cluster() {
    let (_dir, pool) = create_test_db().await;

    let mut a = helpers::HouseholdSeed::new("A");
    a.deciles = vec![3];
    a.national_rank = Some(20);
    helpers::seed_household(&pool, &a).await;

    let mut b = helpers::HouseholdSeed::new("B");
    b.deciles = vec![7];
    b.national_rank = Some(70);
    helpers::seed_household(&pool, &b).await;

    let result = refresh_vulnerability_scores(&pool, &options()).await;

    assert_eq!(result.status, RefreshStatus::Success);
    let metrics = result.metrics.unwrap();
    assert_eq!(metrics.n_clusters, 1);
    assert_eq!(metrics.silhouette, None);

    let rows = records(&pool).await;
    assert_eq!(rows["A"].severity, Severity::VeryVulnerable);
    assert_eq!(rows["B"].severity, Severity::VeryVulnerable);
    assert_eq!(rows["A"].region, None);
}

#[tokio::test]
async fn test_concurrent_trigger_rejected() {
    let (_dir, pool) = create_test_db().await;
    seed_population(&pool).await;

    let coordinator = RefreshCoordinator::new();
    let (first, second) = tokio::join!(
        coordinator.trigger(pool.clone(), options()),
        coordinator.trigger(pool.clone(), options()),
    );

    assert_eq!(first.unwrap().status, RefreshStatus::Success);
    assert!(matches!(second, Err(RefreshError::AlreadyRunning)));
    assert!(!coordinator.is_running());

    let last = coordinator.last_result().await.unwrap();
    assert_eq!(last.status, RefreshStatus::Success);

    // lock released after the run
    let again = coordinator.trigger(pool.clone(), options()).await.unwrap();
    assert_eq!(again.status, RefreshStatus::Success);
}

#[tokio::test]
async fn test_rejected_batch_gives_partial_result() {
    let (_dir, pool) = create_test_db().await;
    seed_population(&pool).await;
    set_setting(&pool, "refresh_batch_size", "3").await.unwrap();
    reject_shadow_rows(&pool, "NEW.household_id = 'M2'").await;

    let result = refresh_vulnerability_scores(&pool, &options()).await;

    assert_eq!(result.status, RefreshStatus::Partial, "{}", result.message);
    assert_eq!(result.rows_processed, 6);
    assert_eq!(result.failed_batches.len(), 1);
    // households are scored in id order: M1..M3 form the first batch
    assert_eq!(result.failed_batches[0].batch_index, 0);
    assert_eq!(result.failed_batches[0].start_row, 0);
    assert_eq!(result.failed_batches[0].row_count, 3);
    assert!(result.message.contains("6 of 9"), "{}", result.message);
    assert!(result.message.contains("1 of 3"), "{}", result.message);

    let current = load_current_snapshot(&pool).await.unwrap().unwrap();
    assert_eq!(result.snapshot_id, Some(current.snapshot_id));

    let rows = records(&pool).await;
    assert_eq!(rows.len(), 6);
    assert!(rows.keys().all(|id| !id.starts_with('M')));
}

#[tokio::test]
async fn test_every_batch_rejected_keeps_previous_results() {
    let (_dir, pool) = create_test_db().await;
    seed_population(&pool).await;

    let first = refresh_vulnerability_scores(&pool, &options()).await;
    assert_eq!(first.status, RefreshStatus::Success);
    let before = records(&pool).await;
    let pointer = get_setting_raw(&pool, CURRENT_SNAPSHOT_KEY).await.unwrap();

    set_setting(&pool, "refresh_batch_size", "4").await.unwrap();
    reject_shadow_rows(&pool, "1").await;

    let result = refresh_vulnerability_scores(&pool, &options()).await;

    assert_eq!(result.status, RefreshStatus::Error);
    assert_eq!(result.rows_processed, 0);
    assert_eq!(result.failed_batches.len(), 3);
    assert_eq!(result.snapshot_id, None);
    assert!(result.message.contains("All 3 persistence batches failed"), "{}", result.message);

    assert!(!table_exists(&pool, "vulnerability_records_shadow").await);
    assert_eq!(get_setting_raw(&pool, CURRENT_SNAPSHOT_KEY).await.unwrap(), pointer);
    assert_eq!(count_rows(&pool, "model_snapshots").await, 1);

    let after = records(&pool).await;
    assert_eq!(after.len(), 9);
    for (id, record) in &before {
        assert_eq!(after[id].snapshot_id, record.snapshot_id);
        assert_eq!(after[id].final_score, record.final_score);
    }
}

#[tokio::test]
async fn test_coordinator_tracks_last_error() {
    let (_dir, pool) = create_test_db().await;
    let coordinator = RefreshCoordinator::new();

    let failed = coordinator.trigger(pool.clone(), options()).await.unwrap();
    assert_eq!(failed.status, RefreshStatus::Error);
    assert_eq!(coordinator.last_error().await, Some(failed.message));

    seed_population(&pool).await;
    let ok = coordinator.trigger(pool.clone(), options()).await.unwrap();
    assert_eq!(ok.status, RefreshStatus::Success);
    assert_eq!(coordinator.last_error().await, None);
}

#[tokio::test]
async fn test_abandoned_trigger_still_records_error() {
    let (_dir, pool) = create_test_db().await;
    let coordinator = RefreshCoordinator::new();

    // caller gives up right after the run is spawned
    let waited = tokio::time::timeout(
        Duration::ZERO,
        coordinator.trigger(pool.clone(), options()),
    )
    .await;
    assert!(waited.is_err());

    for _ in 0..500 {
        if coordinator.last_result().await.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let last = coordinator.last_result().await.unwrap();
    assert_eq!(last.status, RefreshStatus::Error);
    assert_eq!(coordinator.last_error().await, Some(last.message));
}
