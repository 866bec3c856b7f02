//! Versioned model snapshot
//!
//! Every refresh writes a new, immutable snapshot describing exactly how its
//! scores were produced: the per-run normalization bounds, centroids in
//! scaled space, and which cluster received which label. Snapshots are never
//! updated in place; the `current_model_snapshot` setting points at the one
//! backing the live result table.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vscore_common::Severity;

use super::ClusterMetrics;
use crate::clustering::{FeatureBounds, KMeansParams};
use crate::period::YearMonth;

/// Label assigned to one cluster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterLabel {
    pub cluster_id: usize,
    pub severity: Severity,
    pub base_score: i64,
    /// Mean income-rank decile of the cluster's members (ranking key)
    pub mean_income_decile: f64,
    pub size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSnapshot {
    pub snapshot_id: Uuid,
    pub created_at: DateTime<Utc>,
    /// Clock month the recency penalties were computed against
    pub reference_month: YearMonth,
    pub feature_names: Vec<String>,
    /// Per-feature bounds, in `feature_names` order
    pub bounds: Vec<FeatureBounds>,
    pub centroids: Vec<Vec<f64>>,
    pub labels: Vec<ClusterLabel>,
    pub metrics: ClusterMetrics,
    pub params: KMeansParams,
    pub household_count: usize,
}

impl ModelSnapshot {
    /// Label for a cluster id, if that cluster exists in this snapshot
    pub fn label_for(&self, cluster_id: usize) -> Option<&ClusterLabel> {
        self.labels.iter().find(|l| l.cluster_id == cluster_id)
    }
}
