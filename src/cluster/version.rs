use super::Cluster;
use crate::artifact::ArtifactId;
use crate::error::Result;
use crate::trie::{NameId, NameTrie, VariantId};
use serde::Serialize;
use std::collections::BTreeMap;

/// Artifacts of a cluster that carry identical variants of its names
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterVersion {
    /// `(name, variant)` for every cluster name the artifacts carry
    pub signature: Vec<(NameId, VariantId)>,

    pub artifacts: Vec<ArtifactId>,
}

impl ClusterVersion {
    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}

pub(super) fn group_versions(cluster: &Cluster, trie: &NameTrie) -> Result<Vec<ClusterVersion>> {
    let mut nodes = Vec::new();
    for name in cluster.all_names() {
        nodes.push((name, trie.get(name)?));
    }

    let mut groups: BTreeMap<Vec<(NameId, VariantId)>, Vec<ArtifactId>> = BTreeMap::new();
    for artifact in cluster.jars() {
        let mut signature: Vec<(NameId, VariantId)> = nodes
            .iter()
            .filter_map(|(name, node)| node.variant_of(artifact).map(|v| (*name, v)))
            .collect();
        signature.sort_unstable();
        groups.entry(signature).or_default().push(artifact);
    }

    let mut versions: Vec<ClusterVersion> = groups
        .into_iter()
        .map(|(signature, artifacts)| ClusterVersion {
            signature,
            artifacts,
        })
        .collect();
    // Stable: equal-sized versions keep signature order
    versions.sort_by(|a, b| b.artifacts.len().cmp(&a.artifacts.len()));
    Ok(versions)
}
