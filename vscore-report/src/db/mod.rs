//! Database access layer for vscore-report
//!
//! Every connection is read-only; the pipeline is the only writer.

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;

pub mod households;
pub mod vulnerability;

pub use households::{count_households, list_households, list_region_names, HouseholdRow};
pub use vulnerability::{
    count_records, distinct_regions, label_counts, list_records, region_rollup, LabelCount,
    ListingRow, RecordFilter, RegionCounts,
};

const MAX_CONNECTIONS: u32 = 4;

/// Connect to the database in read-only mode
///
/// Not opened `immutable`: the pipeline swaps the result table under WAL
/// and readers must see the new one.
pub async fn connect_readonly(db_path: &Path) -> Result<SqlitePool> {
    if !db_path.exists() {
        anyhow::bail!(
            "Database not found: {}\nRun vscore-pipeline first to initialize the database.",
            db_path.display()
        );
    }

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .read_only(true)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .connect_with(options)
        .await
        .context("Failed to connect to database in read-only mode")?;

    Ok(pool)
}

/// Escape character used with every search `LIKE`
pub(crate) const LIKE_ESCAPE: char = '\\';

/// SQL `LIKE` pattern for a literal substring match
///
/// `%` and `_` in the term match themselves; pair with `ESCAPE '\'`.
pub(crate) fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for ch in term.chars() {
        if matches!(ch, '%' | '_') || ch == LIKE_ESCAPE {
            pattern.push(LIKE_ESCAPE);
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_database_is_an_error() {
        let dir = TempDir::new().unwrap();
        let result = connect_readonly(&dir.path().join("absent.db")).await;

        let message = result.unwrap_err().to_string();
        assert!(message.contains("Database not found"));
    }

    #[tokio::test]
    async fn test_readonly_connection_rejects_writes() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("vscore.db");
        let writer = vscore_common::db::init_database(&db_path).await.unwrap();

        let pool = connect_readonly(&db_path).await.unwrap();
        let result = sqlx::query("CREATE TABLE _test (id INTEGER)")
            .execute(&pool)
            .await;
        assert!(result.is_err(), "write succeeded on a read-only connection");

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM vulnerability_records")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);

        writer.close().await;
    }

    #[test]
    fn test_contains_pattern() {
        assert_eq!(contains_pattern("Suka"), "%Suka%");
    }

    #[test]
    fn test_contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("50%"), r"%50\%%");
        assert_eq!(contains_pattern("H_1"), r"%H\_1%");
        assert_eq!(contains_pattern(r"a\b"), r"%a\\b%");
    }
}
