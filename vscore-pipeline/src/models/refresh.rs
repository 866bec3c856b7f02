//! Refresh run results
//!
//! A run never faults to its caller: every outcome, including empty input
//! and unexpected errors, is reported as a [`RefreshResult`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Row counts after each filter stage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    /// Households read from the record store
    pub total_loaded: usize,
    /// Remaining after dropping inactive households
    pub after_active_filter: usize,
    /// Remaining after dropping zero decile / zero national rank
    pub after_validity_filter: usize,
}

/// Overall outcome of a refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshStatus {
    /// Every batch persisted and the result set was swapped in
    Success,
    /// Some batches failed; the persisted ones were swapped in
    Partial,
    /// Nothing changed; previous results remain live
    Error,
}

impl RefreshStatus {
    pub fn is_error(&self) -> bool {
        matches!(self, RefreshStatus::Error)
    }
}

/// One persistence batch that failed to commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedBatch {
    pub batch_index: usize,
    /// Offset of the batch's first row in the scored set
    pub start_row: usize,
    pub row_count: usize,
    pub error: String,
}

/// Clustering quality of the winning fit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClusterMetrics {
    /// Within-cluster sum of squared distances (scaled space)
    pub inertia: f64,
    /// Mean silhouette coefficient; absent when undefined or skipped
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub silhouette: Option<f64>,
    pub n_clusters: usize,
}

/// Structured result of `refresh_vulnerability_scores`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshResult {
    pub status: RefreshStatus,
    /// Rows now live in the result table
    pub rows_processed: usize,
    pub message: String,
    pub diagnostics: Diagnostics,
    #[serde(default)]
    pub failed_batches: Vec<FailedBatch>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub metrics: Option<ClusterMetrics>,
    /// Snapshot that became current; absent when nothing was swapped
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub snapshot_id: Option<Uuid>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RefreshResult {
    /// Failed run with no persistence side effect
    pub fn error(
        message: impl Into<String>,
        diagnostics: Diagnostics,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            status: RefreshStatus::Error,
            rows_processed: 0,
            message: message.into(),
            diagnostics,
            failed_batches: Vec::new(),
            metrics: None,
            snapshot_id: None,
            started_at,
            finished_at: Utc::now(),
        }
    }
}
