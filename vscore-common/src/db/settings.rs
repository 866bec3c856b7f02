//! Runtime settings stored in the `settings` table
//!
//! Database-first configuration: every tuning value has a built-in default
//! that is written on first run, and a NULL value is reset to its default.

use crate::{Error, Result};
use sqlx::SqlitePool;
use std::str::FromStr;
use tracing::{info, warn};

/// Pointer to the snapshot that produced the live result table
pub const CURRENT_SNAPSHOT_KEY: &str = "current_model_snapshot";

/// Default values for every runtime setting
pub const DEFAULT_SETTINGS: &[(&str, &str)] = &[
    ("refresh_batch_size", "1000"),
    ("kmeans_n_init", "10"),
    ("kmeans_max_iterations", "300"),
    ("kmeans_tolerance", "0.0001"),
    ("kmeans_seed", "42"),
    ("silhouette_sample_limit", "5000"),
    ("snapshot_retention_count", "10"),
    ("db_max_lock_wait_ms", "5000"),
    ("db_lock_retry_ms", "250"),
];

/// Create the settings table
pub async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Initialize or repair default settings
pub async fn init_default_settings(pool: &SqlitePool) -> Result<()> {
    for (key, default_value) in DEFAULT_SETTINGS {
        ensure_setting(pool, key, default_value).await?;
    }

    info!("Default settings initialized");
    Ok(())
}

/// Ensure a setting exists; a missing row is created and a NULL value reset
async fn ensure_setting(pool: &SqlitePool, key: &str, default_value: &str) -> Result<()> {
    let value: Option<Option<String>> =
        sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(pool)
            .await?;

    match value {
        None => {
            // INSERT OR IGNORE: both services may initialize concurrently
            sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES (?, ?)")
                .bind(key)
                .bind(default_value)
                .execute(pool)
                .await?;
            info!("Initialized setting '{}' with default value: {}", key, default_value);
        }
        Some(None) => {
            sqlx::query("UPDATE settings SET value = ?, updated_at = CURRENT_TIMESTAMP WHERE key = ?")
                .bind(default_value)
                .bind(key)
                .execute(pool)
                .await?;
            warn!("Setting '{}' was NULL, reset to default: {}", key, default_value);
        }
        Some(Some(_)) => {}
    }

    Ok(())
}

/// Raw setting value, if present and non-NULL
pub async fn get_setting_raw(pool: &SqlitePool, key: &str) -> Result<Option<String>> {
    let value: Option<Option<String>> =
        sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(pool)
            .await?;

    Ok(value.flatten())
}

/// Typed setting with a fallback used when the row is missing or unparseable
pub async fn get_setting<T>(pool: &SqlitePool, key: &str, default: T) -> Result<T>
where
    T: FromStr,
{
    match get_setting_raw(pool, key).await? {
        Some(raw) => match raw.trim().parse::<T>() {
            Ok(value) => Ok(value),
            Err(_) => {
                warn!("Setting '{}' has invalid value '{}', using default", key, raw);
                Ok(default)
            }
        },
        None => Ok(default),
    }
}

/// Insert or replace a setting
pub async fn set_setting(pool: &SqlitePool, key: &str, value: &str) -> Result<()> {
    if key.trim().is_empty() {
        return Err(Error::InvalidInput("Setting key must not be empty".to_string()));
    }

    sqlx::query(
        "INSERT OR REPLACE INTO settings (key, value, updated_at) VALUES (?, ?, CURRENT_TIMESTAMP)",
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;

    Ok(())
}
