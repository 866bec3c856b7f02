//! Clustering engine
//!
//! Min-max scaling followed by seeded k-means. The cluster count is 3 when
//! at least three households are eligible and 1 otherwise. Quality metrics
//! come along with the fit: inertia always, silhouette when there are more
//! than three points and at least two populated clusters.

pub mod kmeans;
pub mod metrics;
pub mod scaler;

use thiserror::Error;
use tracing::{info, warn};

pub use kmeans::KMeansParams;
pub use scaler::{FeatureBounds, MinMaxScaler};

use crate::features::FEATURE_COUNT;
use crate::models::ClusterMetrics;

/// Cluster count used when enough households are eligible
pub const TARGET_CLUSTERS: usize = 3;

#[derive(Debug, Error)]
pub enum ClusteringError {
    #[error("Feature matrix is empty")]
    EmptyInput,

    #[error("Cannot form {clusters} clusters from {points} points")]
    TooFewPoints { points: usize, clusters: usize },

    #[error("Feature matrix contains a non-finite value")]
    NonFiniteValue,
}

/// Tunables for one clustering pass
#[derive(Debug, Clone)]
pub struct ClusteringOptions {
    pub n_init: usize,
    pub max_iterations: usize,
    pub tolerance: f64,
    pub seed: u64,
    /// Silhouette is computed on an evenly strided sample above this size
    pub silhouette_sample_limit: usize,
}

impl Default for ClusteringOptions {
    fn default() -> Self {
        let params = KMeansParams::default();
        Self {
            n_init: params.n_init,
            max_iterations: params.max_iterations,
            tolerance: params.tolerance,
            seed: params.seed,
            silhouette_sample_limit: 5000,
        }
    }
}

/// Cluster assignment for the whole batch
#[derive(Debug, Clone)]
pub struct ClusteringOutcome {
    pub scaler: MinMaxScaler,
    /// Centroids in scaled feature space
    pub centroids: Vec<[f64; FEATURE_COUNT]>,
    /// Cluster id per input row
    pub labels: Vec<usize>,
    pub metrics: ClusterMetrics,
}

/// k for a batch of `n` eligible households
pub fn cluster_count(n: usize) -> usize {
    if n >= TARGET_CLUSTERS {
        TARGET_CLUSTERS
    } else {
        1
    }
}

/// Scale `matrix` and partition it
pub fn cluster(
    matrix: &[[f64; FEATURE_COUNT]],
    options: &ClusteringOptions,
) -> Result<ClusteringOutcome, ClusteringError> {
    let (scaler, scaled) = MinMaxScaler::fit_transform(matrix).ok_or(ClusteringError::EmptyInput)?;

    let params = KMeansParams {
        n_clusters: cluster_count(scaled.len()),
        n_init: options.n_init,
        max_iterations: options.max_iterations,
        tolerance: options.tolerance,
        seed: options.seed,
    };
    let fit = kmeans::fit(&scaled, &params)?;

    let silhouette = if scaled.len() > TARGET_CLUSTERS {
        sampled_silhouette(&scaled, &fit.labels, options.silhouette_sample_limit)
    } else {
        None
    };

    if scaled.len() > TARGET_CLUSTERS && silhouette.is_none() {
        warn!("Silhouette undefined: fewer than two populated clusters");
    }

    info!(
        households = scaled.len(),
        n_clusters = params.n_clusters,
        inertia = fit.inertia,
        silhouette = ?silhouette,
        iterations = fit.iterations,
        "Clustering complete"
    );

    Ok(ClusteringOutcome {
        scaler,
        centroids: fit.centroids,
        labels: fit.labels,
        metrics: ClusterMetrics {
            inertia: fit.inertia,
            silhouette,
            n_clusters: params.n_clusters,
        },
    })
}

fn sampled_silhouette(
    points: &[[f64; FEATURE_COUNT]],
    labels: &[usize],
    limit: usize,
) -> Option<f64> {
    if limit == 0 || points.len() <= limit {
        return metrics::silhouette_score(points, labels);
    }

    let step = points.len().div_ceil(limit);
    let (sample_points, sample_labels): (Vec<_>, Vec<_>) = points
        .iter()
        .zip(labels.iter())
        .step_by(step)
        .map(|(p, l)| (*p, *l))
        .unzip();

    metrics::silhouette_score(&sample_points, &sample_labels)
}
