//! Model snapshot storage
//!
//! Snapshots are stored as JSON artifacts in `model_snapshots` and are never
//! updated after insert.

use chrono::SecondsFormat;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;
use vscore_common::db::{get_setting_raw, CURRENT_SNAPSHOT_KEY};

use crate::error::PipelineResult;
use crate::models::ModelSnapshot;

/// Insert a snapshot on an existing connection (used inside the swap transaction)
pub async fn insert_snapshot(conn: &mut SqliteConnection, snapshot: &ModelSnapshot) -> PipelineResult<()> {
    let artifact = serde_json::to_string(snapshot)?;

    sqlx::query("INSERT INTO model_snapshots (snapshot_id, created_at, artifact) VALUES (?, ?, ?)")
        .bind(snapshot.snapshot_id.to_string())
        .bind(snapshot.created_at.to_rfc3339_opts(SecondsFormat::Micros, true))
        .bind(artifact)
        .execute(conn)
        .await?;

    debug!(snapshot_id = %snapshot.snapshot_id, "Model snapshot stored");
    Ok(())
}

/// Load a snapshot by id
pub async fn load_snapshot(pool: &SqlitePool, snapshot_id: &str) -> PipelineResult<Option<ModelSnapshot>> {
    let artifact: Option<String> =
        sqlx::query_scalar("SELECT artifact FROM model_snapshots WHERE snapshot_id = ?")
            .bind(snapshot_id)
            .fetch_optional(pool)
            .await?;

    match artifact {
        Some(json) => Ok(Some(serde_json::from_str(&json)?)),
        None => Ok(None),
    }
}

/// Id of the snapshot behind the live result table
pub async fn current_snapshot_id(pool: &SqlitePool) -> PipelineResult<Option<Uuid>> {
    let raw = get_setting_raw(pool, CURRENT_SNAPSHOT_KEY).await?;
    Ok(raw.and_then(|value| Uuid::parse_str(value.trim()).ok()))
}

/// Snapshot behind the live result table, if any refresh has completed
pub async fn load_current_snapshot(pool: &SqlitePool) -> PipelineResult<Option<ModelSnapshot>> {
    match current_snapshot_id(pool).await? {
        Some(id) => load_snapshot(pool, &id.to_string()).await,
        None => Ok(None),
    }
}

/// Delete all but the `keep` most recent snapshots
///
/// The current snapshot is never deleted, even when it is not among the
/// most recent.
pub async fn prune_snapshots(pool: &SqlitePool, keep: usize) -> PipelineResult<u64> {
    let current = current_snapshot_id(pool)
        .await?
        .map(|id| id.to_string())
        .unwrap_or_default();

    let result = sqlx::query(
        r#"
        DELETE FROM model_snapshots
        WHERE snapshot_id != ?
          AND snapshot_id NOT IN (
              SELECT snapshot_id FROM model_snapshots
              ORDER BY created_at DESC, rowid DESC
              LIMIT ?
          )
        "#,
    )
    .bind(current)
    .bind(keep.max(1) as i64)
    .execute(pool)
    .await?;

    let deleted = result.rows_affected();
    if deleted > 0 {
        info!(deleted, keep, "Pruned old model snapshots");
    }
    Ok(deleted)
}
