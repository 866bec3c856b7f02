//! Result table persistence
//!
//! A refresh never touches `vulnerability_records` until every row has been
//! written elsewhere:
//! 1. [`prepare_shadow`] creates `vulnerability_records_shadow` if missing
//!    and clears any rows left behind by an interrupted run
//! 2. [`write_shadow`] inserts rows in fixed-size batches, one transaction
//!    per batch; a failed batch is rolled back, recorded and skipped
//! 3. [`swap_shadow`] replaces the live table in a single transaction
//!    (drop live, rename shadow, recreate indexes, store the snapshot and
//!    move the current-snapshot pointer)
//!
//! Readers therefore see either the previous result set or the new one.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::{error, info};
use vscore_common::db::{
    result_index_ddl, result_table_ddl, VulnerabilityRecord, CURRENT_SNAPSHOT_KEY, RESULT_TABLE,
    SHADOW_TABLE, VULNERABILITY_RECORD_COLUMNS,
};
use vscore_common::Result;

use super::snapshots::insert_snapshot;
use crate::error::PipelineResult;
use crate::models::{FailedBatch, ModelSnapshot};
use crate::utils::retry_on_lock;

/// Outcome of writing every batch into the shadow table
#[derive(Debug, Clone, Default)]
pub struct ShadowWrite {
    pub rows_written: usize,
    pub batches: usize,
    pub failed: Vec<FailedBatch>,
}

impl ShadowWrite {
    pub fn all_failed(&self) -> bool {
        self.batches > 0 && self.failed.len() == self.batches
    }
}

fn insert_sql(table: &str) -> String {
    let placeholders = vec!["?"; VULNERABILITY_RECORD_COLUMNS.len()].join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table,
        VULNERABILITY_RECORD_COLUMNS.join(", "),
        placeholders
    )
}

/// Ensure the shadow table exists and is empty
pub async fn prepare_shadow(pool: &SqlitePool) -> Result<()> {
    sqlx::query(&result_table_ddl(SHADOW_TABLE))
        .execute(pool)
        .await?;
    sqlx::query(&format!("DELETE FROM {}", SHADOW_TABLE))
        .execute(pool)
        .await?;

    info!(table = SHADOW_TABLE, "Shadow result table prepared");
    Ok(())
}

/// Remove the shadow table without touching the live one
pub async fn discard_shadow(pool: &SqlitePool) -> Result<()> {
    sqlx::query(&format!("DROP TABLE IF EXISTS {}", SHADOW_TABLE))
        .execute(pool)
        .await?;
    Ok(())
}

/// Insert one batch into the shadow table inside its own transaction
pub async fn insert_batch(pool: &SqlitePool, records: &[VulnerabilityRecord]) -> Result<usize> {
    let sql = insert_sql(SHADOW_TABLE);
    let mut tx = pool.begin().await?;

    for record in records {
        sqlx::query(&sql)
            .bind(&record.household_id)
            .bind(record.cluster_id)
            .bind(record.severity.as_str())
            .bind(record.base_score)
            .bind(record.final_score)
            .bind(&record.region)
            .bind(record.income_decile)
            .bind(record.national_rank)
            .bind(record.dependents)
            .bind(record.asset_high)
            .bind(record.asset_medium)
            .bind(record.asset_low)
            .bind(&record.bpnt_period)
            .bind(&record.pkh_period)
            .bind(record.bpnt_penalty)
            .bind(record.pkh_penalty)
            .bind(record.total_penalty)
            .bind(&record.snapshot_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(records.len())
}

/// Write all records into the shadow table, `batch_size` rows at a time
///
/// Never fails as a whole: each failed batch is logged and reported in
/// [`ShadowWrite::failed`].
pub async fn write_shadow(
    pool: &SqlitePool,
    records: &[VulnerabilityRecord],
    batch_size: usize,
    max_lock_wait_ms: u64,
) -> ShadowWrite {
    let batch_size = batch_size.max(1);
    let mut outcome = ShadowWrite::default();

    for (batch_index, chunk) in records.chunks(batch_size).enumerate() {
        outcome.batches += 1;
        let start_row = batch_index * batch_size;

        match retry_on_lock("result batch insert", max_lock_wait_ms, || {
            insert_batch(pool, chunk)
        })
        .await
        {
            Ok(rows) => {
                outcome.rows_written += rows;
                info!(batch_index, rows, "Result batch committed");
            }
            Err(err) => {
                error!(
                    batch_index,
                    start_row,
                    rows = chunk.len(),
                    error = %err,
                    "Result batch failed, skipping"
                );
                outcome.failed.push(FailedBatch {
                    batch_index,
                    start_row,
                    row_count: chunk.len(),
                    error: err.to_string(),
                });
            }
        }
    }

    outcome
}

async fn swap_in_transaction(conn: &mut SqliteConnection, snapshot: &ModelSnapshot) -> PipelineResult<()> {
    sqlx::query(&format!("DROP TABLE IF EXISTS {}", RESULT_TABLE))
        .execute(&mut *conn)
        .await?;
    sqlx::query(&format!("ALTER TABLE {} RENAME TO {}", SHADOW_TABLE, RESULT_TABLE))
        .execute(&mut *conn)
        .await?;
    for statement in result_index_ddl() {
        sqlx::query(statement).execute(&mut *conn).await?;
    }

    insert_snapshot(&mut *conn, snapshot).await?;

    sqlx::query(
        "INSERT OR REPLACE INTO settings (key, value, updated_at) VALUES (?, ?, CURRENT_TIMESTAMP)",
    )
    .bind(CURRENT_SNAPSHOT_KEY)
    .bind(snapshot.snapshot_id.to_string())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Atomically replace the live result table with the shadow table
///
/// On error the transaction rolls back and the live table is unchanged.
pub async fn swap_shadow(pool: &SqlitePool, snapshot: &ModelSnapshot) -> PipelineResult<()> {
    let mut tx = pool.begin().await?;
    swap_in_transaction(&mut tx, snapshot).await?;
    tx.commit().await?;

    info!(snapshot_id = %snapshot.snapshot_id, "Result table swapped in");
    Ok(())
}
