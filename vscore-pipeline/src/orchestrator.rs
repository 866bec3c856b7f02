//! Refresh orchestration
//!
//! Sequences one refresh run:
//! load → extract → cluster → rank → score → shadow write → swap → prune.
//!
//! [`refresh_vulnerability_scores`] never returns an error: every failure is
//! folded into the returned [`RefreshResult`]. Nothing is written to the live
//! result table until every upstream step has succeeded.
//!
//! [`RefreshCoordinator`] adds the single-writer rule on top: a second
//! trigger while a run is in flight is rejected, not queued.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::clustering::{self, KMeansParams};
use crate::db::{self, PipelineSettings};
use crate::error::{PipelineError, PipelineResult, RefreshError};
use crate::features::{extract_features, FEATURE_NAMES};
use crate::models::{Diagnostics, ModelSnapshot, RefreshResult, RefreshStatus};
use crate::period::YearMonth;
use crate::scoring::{rank_clusters, score_households};

/// Per-run overrides; everything defaults to the database settings and the
/// current calendar month
#[derive(Debug, Clone, Default)]
pub struct RefreshOptions {
    /// Reference month for recency penalties
    pub reference_month: Option<YearMonth>,
    /// Use these settings instead of reading the `settings` table
    pub settings: Option<PipelineSettings>,
}

/// Run one full refresh
pub async fn refresh_vulnerability_scores(pool: &SqlitePool, options: &RefreshOptions) -> RefreshResult {
    let started_at = Utc::now();
    let mut diagnostics = Diagnostics::default();

    info!("Vulnerability refresh started");

    match run(pool, options, started_at, &mut diagnostics).await {
        Ok(result) => {
            info!(
                status = ?result.status,
                rows = result.rows_processed,
                failed_batches = result.failed_batches.len(),
                "Vulnerability refresh finished"
            );
            result
        }
        Err(err) => {
            if let PipelineError::EmptyInput { diagnostics: counts } = &err {
                diagnostics = *counts;
                warn!(
                    total_loaded = counts.total_loaded,
                    after_active_filter = counts.after_active_filter,
                    "Vulnerability refresh skipped: no eligible households"
                );
            } else {
                error!(error = %err, "Vulnerability refresh failed");
            }
            RefreshResult::error(err.to_string(), diagnostics, started_at)
        }
    }
}

async fn run(
    pool: &SqlitePool,
    options: &RefreshOptions,
    started_at: DateTime<Utc>,
    diagnostics: &mut Diagnostics,
) -> PipelineResult<RefreshResult> {
    let settings = match &options.settings {
        Some(settings) => settings.clone(),
        None => PipelineSettings::load(pool).await?,
    };
    let reference_month = options.reference_month.unwrap_or_else(YearMonth::now);

    let rows = db::load_households(pool).await?;
    let extraction = extract_features(rows)?;
    *diagnostics = extraction.diagnostics;

    // k-means is CPU-bound
    let matrix = extraction.matrix();
    let clustering_options = settings.clustering_options();
    let outcome = tokio::task::spawn_blocking(move || clustering::cluster(&matrix, &clustering_options))
        .await??;

    let labels = rank_clusters(&extraction.households, &outcome.labels);
    let snapshot_id = Uuid::new_v4();
    let records = score_households(
        &extraction.households,
        &outcome.labels,
        &labels,
        reference_month,
        snapshot_id,
    );

    let snapshot = ModelSnapshot {
        snapshot_id,
        created_at: Utc::now(),
        reference_month,
        feature_names: FEATURE_NAMES.iter().map(|name| name.to_string()).collect(),
        bounds: outcome.scaler.bounds.clone(),
        centroids: outcome.centroids.iter().map(|c| c.to_vec()).collect(),
        labels,
        metrics: outcome.metrics,
        params: KMeansParams {
            n_clusters: outcome.metrics.n_clusters,
            n_init: settings.kmeans_n_init,
            max_iterations: settings.kmeans_max_iterations,
            tolerance: settings.kmeans_tolerance,
            seed: settings.kmeans_seed,
        },
        household_count: records.len(),
    };

    db::prepare_shadow(pool).await?;
    let written = db::write_shadow(
        pool,
        &records,
        settings.refresh_batch_size,
        settings.db_max_lock_wait_ms,
    )
    .await;

    if written.all_failed() {
        discard_shadow_quietly(pool).await;
        let message = PipelineError::PersistenceFailed {
            batches: written.batches,
        }
        .to_string();
        error!(batches = written.batches, "{}", message);

        return Ok(RefreshResult {
            status: RefreshStatus::Error,
            rows_processed: 0,
            message,
            diagnostics: *diagnostics,
            failed_batches: written.failed,
            metrics: Some(outcome.metrics),
            snapshot_id: None,
            started_at,
            finished_at: Utc::now(),
        });
    }

    if let Err(err) = db::swap_shadow(pool, &snapshot).await {
        discard_shadow_quietly(pool).await;
        return Err(err);
    }

    if let Err(err) = db::prune_snapshots(pool, settings.snapshot_retention_count).await {
        warn!(error = %err, "Snapshot pruning failed; continuing");
    }

    let (status, message) = if written.failed.is_empty() {
        (
            RefreshStatus::Success,
            format!("Scored {} households", written.rows_written),
        )
    } else {
        (
            RefreshStatus::Partial,
            format!(
                "Scored {} of {} households; {} of {} batches failed",
                written.rows_written,
                records.len(),
                written.failed.len(),
                written.batches
            ),
        )
    };

    Ok(RefreshResult {
        status,
        rows_processed: written.rows_written,
        message,
        diagnostics: *diagnostics,
        failed_batches: written.failed,
        metrics: Some(outcome.metrics),
        snapshot_id: Some(snapshot_id),
        started_at,
        finished_at: Utc::now(),
    })
}

async fn discard_shadow_quietly(pool: &SqlitePool) {
    if let Err(err) = db::discard_shadow(pool).await {
        warn!(error = %err, "Failed to drop shadow result table");
    }
}

/// Serializes refresh triggers and remembers the last result
#[derive(Clone, Default)]
pub struct RefreshCoordinator {
    gate: Arc<Mutex<()>>,
    last_result: Arc<RwLock<Option<RefreshResult>>>,
    last_error: Arc<RwLock<Option<String>>>,
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run a refresh unless one is already in flight
    ///
    /// The run executes on its own task, so it completes even if the caller
    /// stops waiting.
    pub async fn trigger(
        &self,
        pool: SqlitePool,
        options: RefreshOptions,
    ) -> Result<RefreshResult, RefreshError> {
        let guard = self
            .gate
            .clone()
            .try_lock_owned()
            .map_err(|_| RefreshError::AlreadyRunning)?;

        let last_result = self.last_result.clone();
        let last_error = self.last_error.clone();
        let handle = tokio::spawn(async move {
            let result = refresh_vulnerability_scores(&pool, &options).await;
            *last_error.write().await = result
                .status
                .is_error()
                .then(|| result.message.clone());
            *last_result.write().await = Some(result.clone());
            drop(guard);
            result
        });

        Ok(handle.await?)
    }

    pub fn is_running(&self) -> bool {
        self.gate.try_lock().is_err()
    }

    /// Result of the most recent completed run in this process
    pub async fn last_result(&self) -> Option<RefreshResult> {
        self.last_result.read().await.clone()
    }

    /// Message of the last failed run, cleared by the next run that is not an error
    pub async fn last_error(&self) -> Option<String> {
        self.last_error.read().await.clone()
    }
}
