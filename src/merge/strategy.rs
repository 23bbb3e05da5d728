use super::entropy::{entropy_decision, package_entropy, EntropyDecision};
use crate::cluster::Cluster;
use crate::config::{EntropyLimits, MergeMethod, SiftConfig};
use crate::error::Result;
use crate::trie::{NameId, NameTrie};
use fnv::FnvHashSet;
use serde::Serialize;

/// Stage-2 merge strategy, chosen once per run
///
/// Every strategy answers the same question: given a core cluster and a
/// candidate whose artifacts are all carried by the core, should the
/// candidate's names be folded into the core?
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MergeStrategy {
    /// Fraction of candidate packages equal to, or nested under, a core package
    RelatedSubpackage { threshold: f64 },
    /// Jaccard similarity of the two package sets
    JaccardPackage { threshold: f64 },
    /// Per candidate name, the best common package prefix against the core
    MaxPathSimilarity { threshold: f64 },
    /// Per candidate name, the mean common package prefix against the core
    AvgPathSimilarity { threshold: f64 },
    /// Entropy deltas of the package trees
    Entropy(EntropyLimits),
}

/// Outcome of one strategy evaluation
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MergeDecision {
    pub accepted: bool,
    pub measure: Measure,
}

/// The value a decision was based on
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Measure {
    Similarity { score: f64, threshold: f64 },
    Entropy(EntropyDecision),
}

impl MergeStrategy {
    pub fn new(method: MergeMethod, threshold: f64, limits: EntropyLimits) -> Self {
        match method {
            MergeMethod::RelatedSubpackage => MergeStrategy::RelatedSubpackage { threshold },
            MergeMethod::JaccardPackage => MergeStrategy::JaccardPackage { threshold },
            MergeMethod::MaxPathSimilarity => MergeStrategy::MaxPathSimilarity { threshold },
            MergeMethod::AvgPathSimilarity => MergeStrategy::AvgPathSimilarity { threshold },
            MergeMethod::Entropy => MergeStrategy::Entropy(limits),
        }
    }

    pub fn from_config(config: &SiftConfig) -> Self {
        Self::new(config.merge_method, config.merge_threshold, config.entropy)
    }

    pub fn method(&self) -> MergeMethod {
        match self {
            MergeStrategy::RelatedSubpackage { .. } => MergeMethod::RelatedSubpackage,
            MergeStrategy::JaccardPackage { .. } => MergeMethod::JaccardPackage,
            MergeStrategy::MaxPathSimilarity { .. } => MergeMethod::MaxPathSimilarity,
            MergeStrategy::AvgPathSimilarity { .. } => MergeMethod::AvgPathSimilarity,
            MergeStrategy::Entropy(_) => MergeMethod::Entropy,
        }
    }

    /// Threshold of threshold-driven strategies
    pub fn threshold(&self) -> Option<f64> {
        match *self {
            MergeStrategy::RelatedSubpackage { threshold }
            | MergeStrategy::JaccardPackage { threshold }
            | MergeStrategy::MaxPathSimilarity { threshold }
            | MergeStrategy::AvgPathSimilarity { threshold } => Some(threshold),
            MergeStrategy::Entropy(_) => None,
        }
    }

    pub fn should_merge(&self, core: &Cluster, candidate: &Cluster, trie: &NameTrie) -> Result<bool> {
        Ok(self.evaluate(core, candidate, trie)?.accepted)
    }

    /// Score a candidate against a core cluster
    ///
    /// Callers guarantee `candidate.jars() ⊆ core.jars()`.
    pub fn evaluate(&self, core: &Cluster, candidate: &Cluster, trie: &NameTrie) -> Result<MergeDecision> {
        let (score, threshold) = match *self {
            MergeStrategy::RelatedSubpackage { threshold } => {
                (related_subpackage(core, candidate, trie)?, threshold)
            }
            MergeStrategy::JaccardPackage { threshold } => {
                (jaccard_package(core, candidate, trie)?, threshold)
            }
            MergeStrategy::MaxPathSimilarity { threshold } => {
                (path_similarity(core, candidate, trie, Aggregate::Max)?, threshold)
            }
            MergeStrategy::AvgPathSimilarity { threshold } => {
                (path_similarity(core, candidate, trie, Aggregate::Mean)?, threshold)
            }
            MergeStrategy::Entropy(limits) => {
                let smaller = package_entropy(candidate.all_names(), trie)?;
                let larger = package_entropy(core.all_names(), trie)?;
                let joint = package_entropy(core.all_names().chain(candidate.all_names()), trie)?;
                let decision = entropy_decision(smaller, larger, joint, &limits);
                return Ok(MergeDecision {
                    accepted: decision.merge,
                    measure: Measure::Entropy(decision),
                });
            }
        };

        Ok(MergeDecision {
            accepted: score >= threshold,
            measure: Measure::Similarity { score, threshold },
        })
    }
}

fn packages<I>(names: I, trie: &NameTrie) -> Result<FnvHashSet<NameId>>
where
    I: IntoIterator<Item = NameId>,
{
    let mut packages = FnvHashSet::default();
    for name in names {
        packages.insert(trie.package_of(name)?);
    }
    Ok(packages)
}

/// Share of the candidate's core names whose package is, or lies under, a
/// package of the core cluster's core names
pub fn related_subpackage(core: &Cluster, candidate: &Cluster, trie: &NameTrie) -> Result<f64> {
    let core_packages = packages(core.core_names().iter().copied(), trie)?;

    let mut total = 0usize;
    let mut related = 0usize;
    for name in candidate.core_names() {
        total += 1;
        let mut current = Some(trie.package_of(*name)?);
        while let Some(package) = current {
            if core_packages.contains(&package) {
                related += 1;
                break;
            }
            current = trie.get(package)?.parent();
        }
    }

    if total == 0 {
        return Ok(0.0);
    }
    Ok(related as f64 / total as f64)
}

/// Jaccard similarity of the package sets of all names of both clusters
pub fn jaccard_package(core: &Cluster, candidate: &Cluster, trie: &NameTrie) -> Result<f64> {
    let core_packages = packages(core.all_names(), trie)?;
    let candidate_packages = packages(candidate.all_names(), trie)?;

    let shared = core_packages.intersection(&candidate_packages).count();
    let union = core_packages.len() + candidate_packages.len() - shared;
    if union == 0 {
        return Ok(0.0);
    }
    Ok(shared as f64 / union as f64)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    /// Best score over the core names
    Max,
    /// Mean of the running means over the core names
    Mean,
}

/// Package chain of a name, top-level package first
fn package_chain(name: NameId, trie: &NameTrie) -> Result<Vec<NameId>> {
    trie.ancestry(trie.package_of(name)?)
}

/// Common-prefix length of two chains over the length of the first
///
/// An empty first chain (a top-level name) only matches another top-level name.
pub fn prefix_similarity(candidate: &[NameId], other: &[NameId]) -> f64 {
    if candidate.is_empty() {
        return if other.is_empty() { 1.0 } else { 0.0 };
    }
    let common = candidate
        .iter()
        .zip(other.iter())
        .take_while(|(a, b)| a == b)
        .count();
    common as f64 / candidate.len() as f64
}

/// Mean over candidate names of their prefix similarity against the core
///
/// Per candidate name, `Max` takes the best score over the core cluster's
/// names. `Mean` averages the running mean taken after each core name, so
/// core names visited early weigh more.
pub fn path_similarity(
    core: &Cluster,
    candidate: &Cluster,
    trie: &NameTrie,
    aggregate: Aggregate,
) -> Result<f64> {
    let mut core_chains = Vec::new();
    for name in core.all_names() {
        core_chains.push(package_chain(name, trie)?);
    }
    if core_chains.is_empty() {
        return Ok(0.0);
    }

    let mut total = 0.0;
    let mut count = 0usize;
    for name in candidate.all_names() {
        let chain = package_chain(name, trie)?;
        let scores = core_chains.iter().map(|other| prefix_similarity(&chain, other));
        let score = match aggregate {
            Aggregate::Max => scores.fold(0.0, f64::max),
            Aggregate::Mean => {
                let (mut sum, mut running) = (0.0, 0.0);
                for (seen, score) in scores.enumerate() {
                    sum += score;
                    running += sum / (seen + 1) as f64;
                }
                running / core_chains.len() as f64
            }
        };
        total += score;
        count += 1;
    }

    if count == 0 {
        return Ok(0.0);
    }
    Ok(total / count as f64)
}
