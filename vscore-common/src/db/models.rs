//! Database models

use crate::Severity;
use serde::{Deserialize, Serialize};

/// One row of `vulnerability_records`
///
/// `final_score == base_score - total_penalty` and
/// `total_penalty == bpnt_penalty + pkh_penalty` hold for every row the
/// pipeline writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct VulnerabilityRecord {
    pub household_id: String,
    pub cluster_id: i64,
    #[sqlx(rename = "severity_label", try_from = "String")]
    pub severity: Severity,
    pub base_score: i64,
    pub final_score: i64,
    pub region: Option<String>,
    pub income_decile: f64,
    pub national_rank: i64,
    pub dependents: i64,
    pub asset_high: f64,
    pub asset_medium: f64,
    pub asset_low: f64,
    pub bpnt_period: Option<String>,
    pub pkh_period: Option<String>,
    pub bpnt_penalty: i64,
    pub pkh_penalty: i64,
    pub total_penalty: i64,
    pub snapshot_id: Option<String>,
}

/// Column list in insert order, shared by the writer and by tests
pub const VULNERABILITY_RECORD_COLUMNS: [&str; 18] = [
    "household_id",
    "cluster_id",
    "severity_label",
    "base_score",
    "final_score",
    "region",
    "income_decile",
    "national_rank",
    "dependents",
    "asset_high",
    "asset_medium",
    "asset_low",
    "bpnt_period",
    "pkh_period",
    "bpnt_penalty",
    "pkh_penalty",
    "total_penalty",
    "snapshot_id",
];
