//! Cluster quality metrics

use super::kmeans::squared_distance;

/// Mean silhouette coefficient over all points (Euclidean distance)
///
/// `None` when fewer than two clusters are populated, since the
/// coefficient is undefined there. A point alone in its cluster scores 0.
pub fn silhouette_score<const D: usize>(points: &[[f64; D]], labels: &[usize]) -> Option<f64> {
    if points.is_empty() || points.len() != labels.len() {
        return None;
    }

    let k = labels.iter().copied().max()? + 1;
    let mut sizes = vec![0usize; k];
    for &label in labels {
        sizes[label] += 1;
    }
    if sizes.iter().filter(|&&s| s > 0).count() < 2 {
        return None;
    }

    let mut total = 0.0;
    let mut sums = vec![0.0; k];

    for (i, point) in points.iter().enumerate() {
        let own = labels[i];
        if sizes[own] < 2 {
            continue;
        }

        sums.iter_mut().for_each(|s| *s = 0.0);
        for (j, other) in points.iter().enumerate() {
            if i != j {
                sums[labels[j]] += squared_distance(point, other).sqrt();
            }
        }

        let a = sums[own] / (sizes[own] - 1) as f64;
        let b = (0..k)
            .filter(|&c| c != own && sizes[c] > 0)
            .map(|c| sums[c] / sizes[c] as f64)
            .fold(f64::INFINITY, f64::min);

        let denominator = a.max(b);
        if denominator > 0.0 {
            total += (b - a) / denominator;
        }
    }

    Some(total / points.len() as f64)
}
