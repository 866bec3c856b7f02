//! Runtime tuning read from the `settings` table
//!
//! Values are read at the start of every refresh, so edits to the table
//! take effect on the next run without a restart.

use sqlx::SqlitePool;
use vscore_common::db::get_setting;
use vscore_common::Result;

use crate::clustering::{ClusteringOptions, KMeansParams};

/// Tuning values for one refresh run
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    pub refresh_batch_size: usize,
    pub kmeans_n_init: usize,
    pub kmeans_max_iterations: usize,
    pub kmeans_tolerance: f64,
    pub kmeans_seed: u64,
    pub silhouette_sample_limit: usize,
    pub snapshot_retention_count: usize,
    pub db_max_lock_wait_ms: u64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        let params = KMeansParams::default();
        Self {
            refresh_batch_size: 1000,
            kmeans_n_init: params.n_init,
            kmeans_max_iterations: params.max_iterations,
            kmeans_tolerance: params.tolerance,
            kmeans_seed: params.seed,
            silhouette_sample_limit: 5000,
            snapshot_retention_count: 10,
            db_max_lock_wait_ms: 5000,
        }
    }
}

impl PipelineSettings {
    /// Read every value, falling back to the default for missing or invalid rows
    pub async fn load(pool: &SqlitePool) -> Result<Self> {
        let d = Self::default();
        Ok(Self {
            refresh_batch_size: get_setting(pool, "refresh_batch_size", d.refresh_batch_size)
                .await?
                .max(1),
            kmeans_n_init: get_setting(pool, "kmeans_n_init", d.kmeans_n_init).await?.max(1),
            kmeans_max_iterations: get_setting(pool, "kmeans_max_iterations", d.kmeans_max_iterations)
                .await?
                .max(1),
            kmeans_tolerance: get_setting(pool, "kmeans_tolerance", d.kmeans_tolerance).await?,
            kmeans_seed: get_setting(pool, "kmeans_seed", d.kmeans_seed).await?,
            silhouette_sample_limit: get_setting(
                pool,
                "silhouette_sample_limit",
                d.silhouette_sample_limit,
            )
            .await?,
            snapshot_retention_count: get_setting(
                pool,
                "snapshot_retention_count",
                d.snapshot_retention_count,
            )
            .await?
            .max(1),
            db_max_lock_wait_ms: get_setting(pool, "db_max_lock_wait_ms", d.db_max_lock_wait_ms)
                .await?,
        })
    }

    pub fn clustering_options(&self) -> ClusteringOptions {
        ClusteringOptions {
            n_init: self.kmeans_n_init,
            max_iterations: self.kmeans_max_iterations,
            tolerance: self.kmeans_tolerance,
            seed: self.kmeans_seed,
            silhouette_sample_limit: self.silhouette_sample_limit,
        }
    }
}
