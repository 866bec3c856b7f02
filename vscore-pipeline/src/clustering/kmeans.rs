//! Seeded k-means (Lloyd's algorithm with k-means++ initialization)
//!
//! Each restart draws its initial centroids from one seeded RNG stream, so
//! a given (points, params) pair always produces the same result. The
//! restart with the lowest inertia (within-cluster sum of squares) wins;
//! ties keep the earlier restart.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::ClusteringError;

/// Parameters for one k-means fit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KMeansParams {
    pub n_clusters: usize,
    /// Independent restarts; the lowest-inertia result is kept
    pub n_init: usize,
    pub max_iterations: usize,
    /// Relative centroid-shift tolerance (scaled by mean feature variance)
    pub tolerance: f64,
    pub seed: u64,
}

impl Default for KMeansParams {
    fn default() -> Self {
        Self {
            n_clusters: 3,
            n_init: 10,
            max_iterations: 300,
            tolerance: 1e-4,
            seed: 42,
        }
    }
}

/// Result of a k-means fit
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansFit<const D: usize> {
    pub centroids: Vec<[f64; D]>,
    /// Cluster index per input point
    pub labels: Vec<usize>,
    pub inertia: f64,
    /// Lloyd iterations used by the winning restart
    pub iterations: usize,
}

pub fn squared_distance<const D: usize>(a: &[f64; D], b: &[f64; D]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Index and squared distance of the nearest centroid
fn nearest<const D: usize>(point: &[f64; D], centroids: &[[f64; D]]) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (index, centroid) in centroids.iter().enumerate() {
        let distance = squared_distance(point, centroid);
        if distance < best.1 {
            best = (index, distance);
        }
    }
    best
}

fn assign<const D: usize>(points: &[[f64; D]], centroids: &[[f64; D]]) -> (Vec<usize>, f64) {
    let mut inertia = 0.0;
    let labels = points
        .iter()
        .map(|point| {
            let (index, distance) = nearest(point, centroids);
            inertia += distance;
            index
        })
        .collect();
    (labels, inertia)
}

/// k-means++ seeding: each next centroid is drawn with probability
/// proportional to its squared distance from the closest chosen centroid.
fn init_plus_plus<const D: usize>(points: &[[f64; D]], k: usize, rng: &mut StdRng) -> Vec<[f64; D]> {
    let mut centroids = Vec::with_capacity(k);
    centroids.push(points[rng.gen_range(0..points.len())]);

    let mut closest: Vec<f64> = points
        .iter()
        .map(|p| squared_distance(p, &centroids[0]))
        .collect();

    while centroids.len() < k {
        let total: f64 = closest.iter().sum();

        let chosen = if total > 0.0 {
            let target = rng.gen::<f64>() * total;
            let mut cumulative = 0.0;
            let mut chosen = points.len() - 1;
            for (index, weight) in closest.iter().enumerate() {
                cumulative += weight;
                if cumulative >= target && *weight > 0.0 {
                    chosen = index;
                    break;
                }
            }
            chosen
        } else {
            // every point coincides with a chosen centroid
            rng.gen_range(0..points.len())
        };

        let centroid = points[chosen];
        for (distance, point) in closest.iter_mut().zip(points.iter()) {
            *distance = distance.min(squared_distance(point, &centroid));
        }
        centroids.push(centroid);
    }

    centroids
}

/// Recompute centroids as member means; an empty cluster is re-seeded at
/// the point farthest from its current centroid.
fn update_centroids<const D: usize>(
    points: &[[f64; D]],
    labels: &[usize],
    previous: &[[f64; D]],
) -> Vec<[f64; D]> {
    let k = previous.len();
    let mut sums = vec![[0.0; D]; k];
    let mut counts = vec![0usize; k];

    for (point, &label) in points.iter().zip(labels.iter()) {
        counts[label] += 1;
        for (sum, value) in sums[label].iter_mut().zip(point.iter()) {
            *sum += value;
        }
    }

    let mut centroids = Vec::with_capacity(k);
    for (sum, &count) in sums.iter().zip(counts.iter()) {
        if count > 0 {
            centroids.push(sum.map(|s| s / count as f64));
        } else {
            centroids.push([f64::NAN; D]);
        }
    }

    if counts.iter().any(|&c| c == 0) {
        let mut by_distance: Vec<(usize, f64)> = points
            .iter()
            .zip(labels.iter())
            .enumerate()
            .map(|(i, (point, &label))| (i, squared_distance(point, &previous[label])))
            .collect();
        by_distance.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

        let mut donors = by_distance.into_iter().map(|(i, _)| i);
        for (index, &count) in counts.iter().enumerate() {
            if count == 0 {
                centroids[index] = donors
                    .next()
                    .map(|i| points[i])
                    .unwrap_or(previous[index]);
            }
        }
    }

    centroids
}

/// Mean per-feature variance, used to make the tolerance scale-free
fn mean_variance<const D: usize>(points: &[[f64; D]]) -> f64 {
    let n = points.len() as f64;
    let mut total = 0.0;
    for column in 0..D {
        let mean = points.iter().map(|p| p[column]).sum::<f64>() / n;
        total += points.iter().map(|p| (p[column] - mean).powi(2)).sum::<f64>() / n;
    }
    if D == 0 {
        0.0
    } else {
        total / D as f64
    }
}

fn run_once<const D: usize>(
    points: &[[f64; D]],
    params: &KMeansParams,
    tolerance: f64,
    rng: &mut StdRng,
) -> KMeansFit<D> {
    let mut centroids = init_plus_plus(points, params.n_clusters, rng);
    let (mut labels, mut inertia) = assign(points, &centroids);
    let mut iterations = 0;

    for iteration in 1..=params.max_iterations.max(1) {
        let next = update_centroids(points, &labels, &centroids);
        let shift: f64 = next
            .iter()
            .zip(centroids.iter())
            .map(|(a, b)| squared_distance(a, b))
            .sum();
        centroids = next;

        let (next_labels, next_inertia) = assign(points, &centroids);
        let changed = next_labels != labels;
        labels = next_labels;
        inertia = next_inertia;
        iterations = iteration;

        if !changed || shift <= tolerance {
            break;
        }
    }

    KMeansFit {
        centroids,
        labels,
        inertia,
        iterations,
    }
}

/// Fit k-means on `points`
pub fn fit<const D: usize>(
    points: &[[f64; D]],
    params: &KMeansParams,
) -> Result<KMeansFit<D>, ClusteringError> {
    if points.is_empty() {
        return Err(ClusteringError::EmptyInput);
    }
    if params.n_clusters == 0 || params.n_clusters > points.len() {
        return Err(ClusteringError::TooFewPoints {
            points: points.len(),
            clusters: params.n_clusters,
        });
    }
    if points.iter().flatten().any(|v| !v.is_finite()) {
        return Err(ClusteringError::NonFiniteValue);
    }

    let tolerance = params.tolerance * mean_variance(points);
    let mut rng = StdRng::seed_from_u64(params.seed);
    let mut best: Option<KMeansFit<D>> = None;

    for restart in 0..params.n_init.max(1) {
        let candidate = run_once(points, params, tolerance, &mut rng);
        debug!(
            restart,
            inertia = candidate.inertia,
            iterations = candidate.iterations,
            "k-means restart finished"
        );

        let better = best
            .as_ref()
            .map_or(true, |current| candidate.inertia < current.inertia);
        if better {
            best = Some(candidate);
        }
    }

    best.ok_or(ClusteringError::EmptyInput)
}
