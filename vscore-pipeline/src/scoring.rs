//! Scoring & labeling
//!
//! Clusters carry no inherent order. They are ranked by the mean
//! income-rank decile of their members (ascending, ties by cluster id), and
//! the ranking is mapped onto the fixed severity tiers. Each household's
//! final score is its tier's base score minus its recency penalty, with no
//! floor or ceiling.

use std::collections::BTreeMap;

use tracing::info;
use uuid::Uuid;
use vscore_common::db::VulnerabilityRecord;
use vscore_common::Severity;

use crate::features::EligibleHousehold;
use crate::models::ClusterLabel;
use crate::penalty::RecencyPenalty;
use crate::period::{parse_period, YearMonth};

/// Rank populated clusters and assign their severity tiers
///
/// `assignments[i]` is the cluster of `households[i]`.
pub fn rank_clusters(households: &[EligibleHousehold], assignments: &[usize]) -> Vec<ClusterLabel> {
    let mut totals: BTreeMap<usize, (f64, usize)> = BTreeMap::new();
    for (household, &cluster_id) in households.iter().zip(assignments.iter()) {
        let entry = totals.entry(cluster_id).or_insert((0.0, 0));
        entry.0 += household.features.income_decile;
        entry.1 += 1;
    }

    let mut means: Vec<(usize, f64, usize)> = totals
        .into_iter()
        .map(|(cluster_id, (sum, size))| (cluster_id, sum / size as f64, size))
        .collect();
    means.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));

    means
        .into_iter()
        .enumerate()
        .map(|(rank, (cluster_id, mean_income_decile, size))| {
            let severity = Severity::for_rank(rank);
            ClusterLabel {
                cluster_id,
                severity,
                base_score: severity.base_score(),
                mean_income_decile,
                size,
            }
        })
        .collect()
}

/// Build one result row per household
pub fn score_households(
    households: &[EligibleHousehold],
    assignments: &[usize],
    labels: &[ClusterLabel],
    now: YearMonth,
    snapshot_id: Uuid,
) -> Vec<VulnerabilityRecord> {
    let by_cluster: BTreeMap<usize, Severity> =
        labels.iter().map(|l| (l.cluster_id, l.severity)).collect();
    let snapshot = snapshot_id.to_string();

    let records: Vec<VulnerabilityRecord> = households
        .iter()
        .zip(assignments.iter())
        .map(|(household, &cluster_id)| {
            let severity = by_cluster
                .get(&cluster_id)
                .copied()
                .unwrap_or(Severity::NotVulnerable);
            let penalty = RecencyPenalty::compute(
                parse_period(household.bpnt_period.as_deref()),
                parse_period(household.pkh_period.as_deref()),
                now,
            );
            let base_score = severity.base_score();
            let features = &household.features;

            VulnerabilityRecord {
                household_id: household.household_id.clone(),
                cluster_id: cluster_id as i64,
                severity,
                base_score,
                final_score: base_score - penalty.total(),
                region: household.region.clone(),
                income_decile: features.income_decile,
                national_rank: features.national_rank,
                dependents: features.dependents,
                asset_high: features.asset_high,
                asset_medium: features.asset_medium,
                asset_low: features.asset_low,
                bpnt_period: household.bpnt_period.clone(),
                pkh_period: household.pkh_period.clone(),
                bpnt_penalty: penalty.bpnt,
                pkh_penalty: penalty.pkh,
                total_penalty: penalty.total(),
                snapshot_id: Some(snapshot.clone()),
            }
        })
        .collect();

    let penalized = records.iter().filter(|r| r.total_penalty > 0).count();
    info!(
        households = records.len(),
        penalized,
        reference_month = %now,
        "Scoring complete"
    );

    records
}
