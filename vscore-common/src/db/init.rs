//! Database initialization
//!
//! Creates every table the services touch if it does not exist yet:
//! - upstream source tables (owned by the record store, never written by the pipeline)
//! - `vulnerability_records`, the pipeline's result table
//! - `settings` and `model_snapshots`
//!
//! All statements are idempotent; calling [`init_database`] on an existing
//! database only fills in missing tables and NULL/missing settings.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Live result table read by the report service
pub const RESULT_TABLE: &str = "vulnerability_records";

/// Staging table the pipeline fills before swapping it into place
pub const SHADOW_TABLE: &str = "vulnerability_records_shadow";

/// Pool size for read-write service pools
const MAX_CONNECTIONS: u32 = 8;

/// Initialize database connection and create tables if needed
///
/// Runs in two phases: a single-connection bootstrap pool creates the schema
/// and default settings, then the service pool is opened with the busy
/// timeout and acquire timeout read back from `settings`.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let base_options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal);

    let bootstrap = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(base_options.clone().busy_timeout(Duration::from_millis(5000)))
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    init_schema(&bootstrap).await?;
    crate::db::settings::init_default_settings(&bootstrap).await?;

    let lock_retry_ms: u64 =
        crate::db::settings::get_setting(&bootstrap, "db_lock_retry_ms", 250).await?;
    let max_lock_wait_ms: u64 =
        crate::db::settings::get_setting(&bootstrap, "db_max_lock_wait_ms", 5000).await?;
    bootstrap.close().await;

    // WAL lets report readers keep reading the old result table while a
    // refresh is writing the shadow table.
    let pool = SqlitePoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .min_connections(1)
        .acquire_timeout(Duration::from_millis(max_lock_wait_ms.max(lock_retry_ms)))
        .connect_with(base_options.busy_timeout(Duration::from_millis(lock_retry_ms)))
        .await?;

    info!(
        "Database pool ready: {} connections, busy_timeout={}ms",
        MAX_CONNECTIONS, lock_retry_ms
    );

    Ok(pool)
}

/// Create all tables and indexes (idempotent)
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    // Upstream record store
    create_regions_table(pool).await?;
    create_households_table(pool).await?;
    create_history_tables(pool).await?;

    // Pipeline-owned
    crate::db::settings::create_settings_table(pool).await?;
    create_model_snapshots_table(pool).await?;
    create_result_table(pool).await?;

    Ok(())
}

async fn create_regions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS regions (
            region_id INTEGER PRIMARY KEY,
            name TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_households_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS households (
            household_id TEXT PRIMARY KEY,
            family_card_no TEXT,
            head_name TEXT,
            address TEXT,
            region_id INTEGER REFERENCES regions(region_id),
            national_rank INTEGER,
            inactive INTEGER
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_households_region ON households(region_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Per-household history tables; every one is keyed by `household_id`
async fn create_history_tables(pool: &SqlitePool) -> Result<()> {
    let statements = [
        r#"
        CREATE TABLE IF NOT EXISTS decile_history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            household_id TEXT NOT NULL REFERENCES households(household_id) ON DELETE CASCADE,
            decile INTEGER NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS household_members (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            household_id TEXT NOT NULL REFERENCES households(household_id) ON DELETE CASCADE,
            name TEXT
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS household_assets (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            household_id TEXT NOT NULL REFERENCES households(household_id) ON DELETE CASCADE,
            asset_type_id INTEGER NOT NULL,
            amount REAL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS bpnt_history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            household_id TEXT NOT NULL REFERENCES households(household_id) ON DELETE CASCADE,
            period_label TEXT
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS pkh_history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            household_id TEXT NOT NULL REFERENCES households(household_id) ON DELETE CASCADE,
            period_label TEXT
        )
        "#,
    ];

    for statement in statements {
        sqlx::query(statement).execute(pool).await?;
    }

    for table in [
        "decile_history",
        "household_members",
        "household_assets",
        "bpnt_history",
        "pkh_history",
    ] {
        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS idx_{table}_household ON {table}(household_id)"
        ))
        .execute(pool)
        .await?;
    }

    Ok(())
}

async fn create_model_snapshots_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS model_snapshots (
            snapshot_id TEXT PRIMARY KEY,
            created_at TEXT NOT NULL,
            artifact TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_result_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(&result_table_ddl(RESULT_TABLE))
        .execute(pool)
        .await?;

    for statement in result_index_ddl() {
        sqlx::query(statement).execute(pool).await?;
    }

    Ok(())
}

/// `CREATE TABLE` statement for a result table with the given name
///
/// Used for both the live table and the shadow table so the two always
/// share one column layout.
pub fn result_table_ddl(table: &str) -> String {
    format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table} (
            household_id TEXT PRIMARY KEY,
            cluster_id INTEGER NOT NULL,
            severity_label TEXT NOT NULL
                CHECK (severity_label IN ('Very Vulnerable', 'Vulnerable', 'Not Vulnerable')),
            base_score INTEGER NOT NULL,
            final_score INTEGER NOT NULL,
            region TEXT,
            income_decile REAL NOT NULL,
            national_rank INTEGER NOT NULL,
            dependents INTEGER NOT NULL,
            asset_high REAL NOT NULL,
            asset_medium REAL NOT NULL,
            asset_low REAL NOT NULL,
            bpnt_period TEXT,
            pkh_period TEXT,
            bpnt_penalty INTEGER NOT NULL DEFAULT 0,
            pkh_penalty INTEGER NOT NULL DEFAULT 0,
            total_penalty INTEGER NOT NULL CHECK (total_penalty BETWEEN 0 AND 80),
            snapshot_id TEXT
        )
        "#
    )
}

/// Index statements for the live result table
pub fn result_index_ddl() -> [&'static str; 3] {
    [
        "CREATE INDEX IF NOT EXISTS idx_vulnerability_records_region ON vulnerability_records(region)",
        "CREATE INDEX IF NOT EXISTS idx_vulnerability_records_final_score ON vulnerability_records(final_score DESC)",
        "CREATE INDEX IF NOT EXISTS idx_vulnerability_records_label ON vulnerability_records(severity_label)",
    ]
}
