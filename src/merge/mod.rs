//! Stage 2: global similarity merge
//!
//! Clusters are visited from the largest footprint down. Each candidate is
//! offered to the accepted core clusters in order and joins the first one
//! that carries all of its artifacts and that the configured strategy
//! accepts; otherwise it becomes a core itself. Absorbed names become the
//! core's extra names and never change its footprint.

mod entropy;
mod strategy;

pub use entropy::{entropy_decision, package_entropy, EntropyDecision};
pub use strategy::{
    jaccard_package, path_similarity, prefix_similarity, related_subpackage, Aggregate,
    MergeDecision, MergeStrategy, Measure,
};

use crate::cluster::{Cluster, ClusterCollection};
use crate::decision_log::{self, DecisionLog};
use crate::error::Result;
use crate::trie::NameTrie;
use serde_json::json;
use tracing::{debug, info};

/// Reduce a Stage-1 collection with one strategy
///
/// Ties in footprint size are broken by cluster id, so the result only
/// depends on the input.
pub fn merge_clusters(
    clusters: ClusterCollection,
    strategy: &MergeStrategy,
    trie: &NameTrie,
    log: &mut DecisionLog,
) -> Result<ClusterCollection> {
    let mut sorted = clusters.into_vec();
    let before = sorted.len();
    sorted.sort_by(|a, b| {
        b.jars()
            .len()
            .cmp(&a.jars().len())
            .then_with(|| a.id().cmp(&b.id()))
    });

    let mut cores: Vec<Cluster> = Vec::new();
    'candidates: for candidate in sorted {
        for core in cores.iter_mut() {
            if !candidate.jars().is_subset(core.jars()) {
                continue;
            }

            let decision = strategy.evaluate(core, &candidate, trie)?;
            if log.is_enabled() {
                record_decision(log, strategy, core, &candidate, &decision);
            }
            if decision.accepted {
                debug!(
                    core = %core.id(),
                    candidate = %candidate.id(),
                    method = %strategy.method(),
                    "Merged cluster"
                );
                core.absorb(candidate);
                continue 'candidates;
            }
        }
        cores.push(candidate);
    }

    info!(
        method = %strategy.method(),
        threshold = ?strategy.threshold(),
        before,
        after = cores.len(),
        "Stage 2: merged clusters"
    );
    Ok(cores.into())
}

fn record_decision(
    log: &mut DecisionLog,
    strategy: &MergeStrategy,
    core: &Cluster,
    candidate: &Cluster,
    decision: &MergeDecision,
) {
    let method = strategy.method();
    let subject = format!("{}<-{}", core.id(), candidate.id());
    log.record(
        decision_log::MERGE,
        method.as_str(),
        &subject,
        json!({
            "core": core.id(),
            "candidate": candidate.id(),
            "core_jars": core.jars().len(),
            "candidate_jars": candidate.jars().len(),
            "core_names": core.core_names().len() + core.extra_names().len(),
            "candidate_names": candidate.core_names().len(),
        }),
        json!(decision),
    );
}

/// Descending merge thresholds, in percent
///
/// Starts at 100 and steps down by `decrement` while the value stays strictly
/// above `minimum`.
#[derive(Debug, Clone)]
pub struct ThresholdSweep {
    next: Option<u32>,
    minimum: u32,
    decrement: u32,
}

impl ThresholdSweep {
    pub fn new(minimum: u32, decrement: u32) -> Self {
        Self {
            next: (100 > minimum).then_some(100),
            minimum,
            decrement,
        }
    }
}

impl Iterator for ThresholdSweep {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        let current = self.next?;
        self.next = match current.checked_sub(self.decrement) {
            Some(next) if self.decrement > 0 && next > self.minimum => Some(next),
            _ => None,
        };
        Some(current)
    }
}

#[cfg(test)]
mod tests;
