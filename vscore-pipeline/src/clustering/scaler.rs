//! Per-column min-max normalization
//!
//! Each column maps to [0, 1] using the batch's own minimum and maximum. A
//! column that is constant across the batch maps to 0 for every row.

use serde::{Deserialize, Serialize};

/// Fitted normalization bounds for one feature column
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureBounds {
    pub min: f64,
    pub max: f64,
}

impl FeatureBounds {
    pub fn range(&self) -> f64 {
        self.max - self.min
    }

    pub fn scale(&self, value: f64) -> f64 {
        let range = self.range();
        if range > 0.0 {
            (value - self.min) / range
        } else {
            0.0
        }
    }
}

/// Min-max scaler fitted on one batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    /// One entry per feature column
    pub bounds: Vec<FeatureBounds>,
}

impl MinMaxScaler {
    /// Fit bounds on `rows`; `None` for an empty matrix
    pub fn fit<const D: usize>(rows: &[[f64; D]]) -> Option<Self> {
        let first = rows.first()?;
        let mut bounds: Vec<FeatureBounds> = first
            .iter()
            .map(|&v| FeatureBounds { min: v, max: v })
            .collect();

        for row in &rows[1..] {
            for (bound, &value) in bounds.iter_mut().zip(row.iter()) {
                bound.min = bound.min.min(value);
                bound.max = bound.max.max(value);
            }
        }

        Some(Self { bounds })
    }

    pub fn transform_row<const D: usize>(&self, row: &[f64; D]) -> [f64; D] {
        let mut scaled = [0.0; D];
        for ((out, value), bound) in scaled.iter_mut().zip(row.iter()).zip(self.bounds.iter()) {
            *out = bound.scale(*value);
        }
        scaled
    }

    pub fn transform<const D: usize>(&self, rows: &[[f64; D]]) -> Vec<[f64; D]> {
        rows.iter().map(|row| self.transform_row(row)).collect()
    }

    /// Fit and transform in one step
    pub fn fit_transform<const D: usize>(rows: &[[f64; D]]) -> Option<(Self, Vec<[f64; D]>)> {
        let scaler = Self::fit(rows)?;
        let scaled = scaler.transform(rows);
        Some((scaler, scaled))
    }
}
