//! Exemplar selection
//!
//! Picks, per cluster, the names that characterize it and the artifacts that
//! best represent it. Every core name is an exemplar name; an extra name is
//! one when enough of the cluster's artifacts carry it. Artifacts are then
//! scored against the exemplar names (lower is better):
//!
//! ```text
//! score = 1000 × missing exemplar names + 100 × unexplained names + 1 × known non-exemplar names
//! ```
//!
//! Every artifact reaching the minimum score is an exemplar.

use crate::artifact::{ArtifactCollection, ArtifactId};
use crate::cluster::{Cluster, ClusterCollection};
use crate::decision_log::{self, DecisionLog};
use crate::error::Result;
use crate::trie::{NameId, NameTrie};
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeSet;
use tracing::{info, warn};

/// Penalty per exemplar name the artifact lacks
pub const MISSING_WEIGHT: u64 = 1000;

/// Penalty per artifact name that belongs to no part of the cluster
pub const OUTSIDE_WEIGHT: u64 = 100;

/// Penalty per artifact name that is in the cluster but not an exemplar name
pub const EXTRA_WEIGHT: u64 = 1;

/// How one artifact's names relate to a cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ArtifactScore {
    pub artifact: ArtifactId,
    pub exemplar_count: usize,
    pub extra_count: usize,
    pub outside_count: usize,
    pub score: u64,
}

impl ArtifactScore {
    fn new(
        artifact: ArtifactId,
        total_exemplars: usize,
        exemplar_count: usize,
        extra_count: usize,
        outside_count: usize,
    ) -> Self {
        let missing = total_exemplars.saturating_sub(exemplar_count) as u64;
        Self {
            artifact,
            exemplar_count,
            extra_count,
            outside_count,
            score: MISSING_WEIGHT * missing
                + EXTRA_WEIGHT * extra_count as u64
                + OUTSIDE_WEIGHT * outside_count as u64,
        }
    }
}

/// Exemplar names of a cluster
///
/// Core names always qualify; an extra name qualifies when the share of the
/// cluster's artifacts carrying it reaches `threshold`. Returns the names
/// and the share of every extra name.
pub fn exemplar_names(
    cluster: &Cluster,
    trie: &NameTrie,
    threshold: f64,
) -> Result<(BTreeSet<NameId>, Vec<(NameId, f64)>)> {
    let mut names = cluster.core_names().clone();
    let mut rates = Vec::with_capacity(cluster.extra_names().len());
    let total = cluster.jars().len();
    if total == 0 {
        return Ok((names, rates));
    }

    for name in cluster.extra_names() {
        let shared = cluster.jars().intersection_size(trie.get(*name)?.jars());
        let rate = shared as f64 / total as f64;
        if rate >= threshold {
            names.insert(*name);
        }
        rates.push((*name, rate));
    }
    Ok((names, rates))
}

/// Score every artifact of the cluster against a set of exemplar names
pub fn score_artifacts(
    cluster: &Cluster,
    names: &BTreeSet<NameId>,
    artifacts: &ArtifactCollection,
) -> Result<Vec<ArtifactScore>> {
    let mut scores = Vec::with_capacity(cluster.jars().len());
    for id in cluster.jars() {
        let (mut exemplar, mut extra, mut outside) = (0, 0, 0);
        for name in artifacts.get(id)?.names() {
            if names.contains(name) {
                exemplar += 1;
            } else if cluster.contains_name(*name) {
                extra += 1;
            } else {
                outside += 1;
            }
        }
        scores.push(ArtifactScore::new(id, names.len(), exemplar, extra, outside));
    }
    Ok(scores)
}

/// Annotate every cluster with its exemplar names and exemplar artifacts
///
/// Previous annotations are replaced, so running this twice gives the same
/// result. Clusters without artifacts are skipped with a warning. Returns the
/// number of clusters annotated.
pub fn select_exemplars(
    clusters: &mut ClusterCollection,
    trie: &NameTrie,
    artifacts: &ArtifactCollection,
    threshold: f64,
    log: &mut DecisionLog,
) -> Result<usize> {
    let mut annotated = 0;
    for cluster in clusters.iter_mut() {
        cluster.clear_exemplars();
        if cluster.jars().is_empty() {
            warn!(cluster = %cluster.id(), "Skipping exemplar selection for cluster without artifacts");
            continue;
        }

        let (names, rates) = exemplar_names(cluster, trie, threshold)?;
        let scores = score_artifacts(cluster, &names, artifacts)?;
        let best = scores.iter().map(|s| s.score).min().unwrap_or(0);
        let exemplars: Vec<ArtifactId> = scores
            .iter()
            .filter(|s| s.score == best)
            .map(|s| s.artifact)
            .collect();

        if log.is_enabled() {
            let rates: Vec<_> = rates
                .iter()
                .map(|(name, rate)| json!({ "name": name, "rate": rate }))
                .collect();
            log.record(
                decision_log::EXEMPLAR,
                "select",
                &cluster.id().to_string(),
                json!({
                    "cluster": cluster.id(),
                    "jars": cluster.jars().len(),
                    "exemplar_names": names.len(),
                    "extra_rates": rates,
                }),
                json!({ "exemplars": exemplars, "best": best, "scores": scores }),
            );
        }

        cluster.set_exemplars(names, exemplars);
        annotated += 1;
    }

    info!(clusters = annotated, threshold, "Selected exemplars");
    Ok(annotated)
}
