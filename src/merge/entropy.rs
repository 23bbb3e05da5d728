//! Package-tree entropy
//!
//! Measures how spread out a set of names is across the package hierarchy.
//! A tree is built from the packages of the names, each node counting the
//! names at or below it. Packages without sub-packages score 0; an inner
//! package scores half the mean entropy of its sub-packages plus half the
//! normalized Shannon entropy of how its names split between sub-packages
//! (and the names declared directly in it).

use crate::config::EntropyLimits;
use crate::error::Result;
use crate::trie::{NameId, NameTrie};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Default)]
struct PackageNode {
    names: usize,
    depth: usize,
    children: BTreeSet<NameId>,
}

/// Entropy of the package tree spanned by `names`
///
/// Returns 0 for an empty input.
pub fn package_entropy<I>(names: I, trie: &NameTrie) -> Result<f64>
where
    I: IntoIterator<Item = NameId>,
{
    let root = trie.root();
    let mut tree: BTreeMap<NameId, PackageNode> = BTreeMap::new();

    for name in names {
        let package = trie.package_of(name)?;
        let chain = trie.ancestry(package)?;

        tree.entry(root).or_default().names += 1;
        let mut parent = root;
        for (depth, package) in chain.into_iter().enumerate() {
            tree.entry(parent).or_default().children.insert(package);
            let node = tree.entry(package).or_default();
            node.names += 1;
            node.depth = depth + 1;
            parent = package;
        }
    }

    if tree.is_empty() {
        return Ok(0.0);
    }

    // Deepest packages first so children are scored before their parents
    let mut order: Vec<(usize, NameId)> = tree.iter().map(|(id, node)| (node.depth, *id)).collect();
    order.sort_by(|a, b| b.cmp(a));

    let mut entropy: BTreeMap<NameId, f64> = BTreeMap::new();
    for (_, id) in order {
        let Some(node) = tree.get(&id) else {
            continue;
        };
        if node.children.is_empty() {
            entropy.insert(id, 0.0);
            continue;
        }

        let total = node.names as f64;
        let child_count = node.children.len() as f64;
        let log_base = (child_count + 1.0).ln();
        let mut value = 0.0;
        let mut remaining = node.names;

        for child in &node.children {
            let child_names = tree.get(child).map_or(0, |c| c.names);
            value += entropy.get(child).copied().unwrap_or(0.0) / child_count / 2.0;
            remaining -= child_names;
            value += share_entropy(child_names as f64 / total, log_base);
        }
        if remaining > 0 {
            value += share_entropy(remaining as f64 / total, log_base);
        }
        entropy.insert(id, value);
    }

    Ok(entropy.get(&root).copied().unwrap_or(0.0))
}

fn share_entropy(share: f64, log_base: f64) -> f64 {
    if share <= 0.0 {
        return 0.0;
    }
    -share * share.ln() / log_base / 2.0
}

/// Entropy values behind one entropy-strategy decision
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EntropyDecision {
    pub smaller: f64,
    pub larger: f64,
    pub joint: f64,
    /// `joint - max(smaller, larger)`
    pub min_delta: f64,
    /// `joint - min(smaller, larger)`
    pub max_delta: f64,
    pub merge: bool,
}

/// Decide a merge from the three entropies
///
/// Merges when `max_delta <= limits.max_delta` and `min_delta < limits.min_delta`.
pub fn entropy_decision(smaller: f64, larger: f64, joint: f64, limits: &EntropyLimits) -> EntropyDecision {
    let min_delta = joint - smaller.max(larger);
    let max_delta = joint - smaller.min(larger);
    EntropyDecision {
        smaller,
        larger,
        joint,
        min_delta,
        max_delta,
        merge: max_delta <= limits.max_delta && min_delta < limits.min_delta,
    }
}
