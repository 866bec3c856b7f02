//! Feature extraction
//!
//! Turns raw household rows into the six-field feature vector used for
//! clustering. Two filters apply, in order:
//! 1. active: `inactive` is NULL or 0
//! 2. valid: income-rank decile > 0 and national rank > 0, since a zero in
//!    either is indistinguishable from "no data" and would stretch the
//!    normalization range
//!
//! Nullable aggregates (dependents, asset sums) default to 0.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{PipelineError, PipelineResult};
use crate::models::Diagnostics;

/// Feature column names, in matrix column order
pub const FEATURE_NAMES: [&str; 6] = [
    "income_decile",
    "national_rank",
    "dependents",
    "asset_high",
    "asset_medium",
    "asset_low",
];

/// Number of features per household
pub const FEATURE_COUNT: usize = FEATURE_NAMES.len();

/// Asset type ids per value tier
pub const ASSET_TYPES_HIGH: [i64; 5] = [3, 7, 9, 11, 13];
pub const ASSET_TYPES_MEDIUM: [i64; 4] = [2, 4, 8, 14];
pub const ASSET_TYPES_LOW: [i64; 5] = [1, 5, 6, 10, 12];

/// One household as loaded from the record store, before filtering
#[derive(Debug, Clone, Default, PartialEq, sqlx::FromRow)]
pub struct HouseholdRow {
    pub household_id: String,
    pub region: Option<String>,
    pub income_decile: Option<f64>,
    pub national_rank: Option<i64>,
    pub dependents: Option<i64>,
    pub asset_high: Option<f64>,
    pub asset_medium: Option<f64>,
    pub asset_low: Option<f64>,
    pub bpnt_period: Option<String>,
    pub pkh_period: Option<String>,
    pub inactive: Option<i64>,
}

impl HouseholdRow {
    pub fn is_active(&self) -> bool {
        self.inactive.unwrap_or(0) == 0
    }

    pub fn has_valid_rank(&self) -> bool {
        self.income_decile.unwrap_or(0.0) > 0.0 && self.national_rank.unwrap_or(0) > 0
    }
}

/// Raw (unscaled) feature values for one household
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub income_decile: f64,
    pub national_rank: i64,
    pub dependents: i64,
    pub asset_high: f64,
    pub asset_medium: f64,
    pub asset_low: f64,
}

impl FeatureVector {
    /// Values in [`FEATURE_NAMES`] order
    pub fn to_array(&self) -> [f64; FEATURE_COUNT] {
        [
            self.income_decile,
            self.national_rank as f64,
            self.dependents as f64,
            self.asset_high,
            self.asset_medium,
            self.asset_low,
        ]
    }
}

/// A household that passed both filters
#[derive(Debug, Clone, PartialEq)]
pub struct EligibleHousehold {
    pub household_id: String,
    pub region: Option<String>,
    pub features: FeatureVector,
    pub bpnt_period: Option<String>,
    pub pkh_period: Option<String>,
}

impl From<HouseholdRow> for EligibleHousehold {
    fn from(row: HouseholdRow) -> Self {
        Self {
            features: FeatureVector {
                income_decile: row.income_decile.unwrap_or(0.0),
                national_rank: row.national_rank.unwrap_or(0),
                dependents: row.dependents.unwrap_or(0).max(0),
                asset_high: row.asset_high.unwrap_or(0.0),
                asset_medium: row.asset_medium.unwrap_or(0.0),
                asset_low: row.asset_low.unwrap_or(0.0),
            },
            household_id: row.household_id,
            region: row.region.filter(|r| !r.trim().is_empty()),
            bpnt_period: row.bpnt_period.filter(|p| !p.trim().is_empty()),
            pkh_period: row.pkh_period.filter(|p| !p.trim().is_empty()),
        }
    }
}

/// Eligible households plus the counts after each filter stage
#[derive(Debug, Clone)]
pub struct Extraction {
    pub households: Vec<EligibleHousehold>,
    pub diagnostics: Diagnostics,
}

impl Extraction {
    /// Feature matrix in household order
    pub fn matrix(&self) -> Vec<[f64; FEATURE_COUNT]> {
        self.households
            .iter()
            .map(|h| h.features.to_array())
            .collect()
    }
}

/// Filter raw rows and build feature vectors
///
/// Returns [`PipelineError::EmptyInput`] when nothing survives filtering.
pub fn extract_features(rows: Vec<HouseholdRow>) -> PipelineResult<Extraction> {
    let total_loaded = rows.len();

    let active: Vec<HouseholdRow> = rows.into_iter().filter(HouseholdRow::is_active).collect();
    let after_active_filter = active.len();

    let households: Vec<EligibleHousehold> = active
        .into_iter()
        .filter(HouseholdRow::has_valid_rank)
        .map(EligibleHousehold::from)
        .collect();

    let diagnostics = Diagnostics {
        total_loaded,
        after_active_filter,
        after_validity_filter: households.len(),
    };

    info!(
        total_loaded,
        after_active_filter,
        after_validity_filter = diagnostics.after_validity_filter,
        "Feature extraction complete"
    );

    if households.is_empty() {
        return Err(PipelineError::EmptyInput { diagnostics });
    }

    Ok(Extraction {
        households,
        diagnostics,
    })
}
