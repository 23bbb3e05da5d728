//! Stage 1: bottom-up co-occurrence grouping
//!
//! Walks the name trie in post order. Every declared name starts as its own
//! cluster; at each internal node the clusters bubbling up from the children
//! are matched against the clusters already pending at that node. A child
//! cluster with exactly one compatible partner is folded into it, otherwise it
//! is promoted unchanged. What reaches the root is the Stage-1 partition.
//!
//! Pending clusters live in one bucket per trie node and a child's bucket is
//! drained as soon as the parent consumes it, so only the buckets along the
//! current path and its finished siblings are populated at any time.

use crate::artifact::SetInterner;
use crate::cluster::{Cluster, ClusterCollection, ClusterIds};
use crate::error::Result;
use crate::trie::NameTrie;
use tracing::{debug, info};

/// Build the Stage-1 clusters for every declared name of the trie
///
/// `threshold` is the compatibility threshold in (0, 1]; values above 1 make
/// every pair incompatible, so each name stays in its own cluster.
pub fn identify_clusters(
    trie: &NameTrie,
    interner: &mut SetInterner,
    threshold: f64,
) -> Result<ClusterCollection> {
    let mut ids = ClusterIds::new();
    let mut pending: Vec<Vec<Cluster>> = vec![Vec::new(); trie.len()];
    let mut merges = 0usize;
    let mut ambiguous = 0usize;

    for id in trie.post_order() {
        let node = trie.get(id)?;

        let mut bucket = Vec::new();
        if node.is_declared() {
            bucket.push(Cluster::singleton(ids.next_id(), id, node.jars().clone()));
        }

        for child in node.children() {
            let child_bucket = std::mem::take(&mut pending[child.index()]);
            for cluster in child_bucket {
                let mut matches = Vec::new();
                for (index, candidate) in bucket.iter().enumerate() {
                    if are_compatible(&cluster, candidate, trie, threshold)? {
                        matches.push(index);
                    }
                }

                match matches.as_slice() {
                    [] => bucket.push(cluster),
                    [index] => {
                        bucket[*index].fold_core(cluster, interner);
                        merges += 1;
                    }
                    _ => {
                        debug!(
                            cluster = %cluster.id(),
                            at = %id,
                            candidates = matches.len(),
                            "Ambiguous merge candidate, promoting"
                        );
                        ambiguous += 1;
                        bucket.push(cluster);
                    }
                }
            }
        }

        pending[id.index()] = bucket;
    }

    let clusters: ClusterCollection = std::mem::take(&mut pending[trie.root().index()]).into();
    info!(
        clusters = clusters.len(),
        merges, ambiguous, "Stage 1: identified clusters"
    );
    Ok(clusters)
}

/// Compatibility test between two clusters
///
/// Disjoint footprints are never compatible. At threshold 1 the footprints
/// must be the same interned set. Below 1, both mean conditional
/// probabilities over every pair of core names must reach the threshold.
pub fn are_compatible(a: &Cluster, b: &Cluster, trie: &NameTrie, threshold: f64) -> Result<bool> {
    if threshold > 1.0 {
        return Ok(false);
    }
    if !a.jars().intersects(b.jars()) {
        return Ok(false);
    }
    if threshold >= 1.0 {
        return Ok(a.jars().is_same(b.jars()));
    }

    let mut b_given_a = 0.0;
    let mut a_given_b = 0.0;
    let mut pairs = 0usize;
    for a_name in a.core_names() {
        let a_jars = trie.get(*a_name)?.jars();
        for b_name in b.core_names() {
            let b_jars = trie.get(*b_name)?.jars();
            let shared = a_jars.intersection_size(b_jars) as f64;
            if !a_jars.is_empty() {
                b_given_a += shared / a_jars.len() as f64;
            }
            if !b_jars.is_empty() {
                a_given_b += shared / b_jars.len() as f64;
            }
            pairs += 1;
        }
    }
    if pairs == 0 {
        return Ok(false);
    }

    let pairs = pairs as f64;
    Ok(b_given_a / pairs >= threshold && a_given_b / pairs >= threshold)
}
