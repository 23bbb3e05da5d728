//! Library clusters
//!
//! A cluster is a group of artifacts that share a set of co-occurring names and
//! are therefore taken to be one logical library. Stage 1 builds clusters from
//! core names, Stage 2 folds small clusters into larger ones as extra names,
//! and exemplar selection annotates the survivors.
//!
//! Clusters own their names: folding one cluster into another moves the name
//! sets and drops the absorbed cluster.

mod version;

pub use version::ClusterVersion;

use crate::artifact::{ArtifactId, ArtifactSet, SetInterner};
use crate::error::{ModelError, Result};
use crate::trie::{NameId, NameTrie};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Stable identifier of a cluster within one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClusterId(u32);

impl ClusterId {
    pub fn new(index: u32) -> Self {
        Self(index)
    }
}

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// Hands out cluster ids in creation order
#[derive(Debug, Default)]
pub struct ClusterIds {
    next: u32,
}

impl ClusterIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> ClusterId {
        let id = ClusterId(self.next);
        self.next += 1;
        id
    }
}

/// A discovered library
#[derive(Debug, Clone)]
pub struct Cluster {
    id: ClusterId,
    core_names: BTreeSet<NameId>,
    extra_names: BTreeSet<NameId>,
    jars: ArtifactSet,
    exemplar_names: BTreeSet<NameId>,
    exemplars: Vec<ArtifactId>,
}

impl Cluster {
    /// New cluster around a single core name
    pub fn singleton(id: ClusterId, name: NameId, jars: ArtifactSet) -> Self {
        let mut core_names = BTreeSet::new();
        core_names.insert(name);
        Self {
            id,
            core_names,
            extra_names: BTreeSet::new(),
            jars,
            exemplar_names: BTreeSet::new(),
            exemplars: Vec::new(),
        }
    }

    /// Build a cluster whose footprint is the union of its core names' footprints
    pub fn from_core_names<I>(
        id: ClusterId,
        names: I,
        trie: &NameTrie,
        interner: &mut SetInterner,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = NameId>,
    {
        let core_names: BTreeSet<NameId> = names.into_iter().collect();
        let mut jars = interner.empty();
        for name in &core_names {
            jars = interner.merge(&jars, trie.get(*name)?.jars());
        }
        Ok(Self {
            id,
            core_names,
            extra_names: BTreeSet::new(),
            jars,
            exemplar_names: BTreeSet::new(),
            exemplars: Vec::new(),
        })
    }

    pub fn id(&self) -> ClusterId {
        self.id
    }

    /// Names defining the cluster's identity
    pub fn core_names(&self) -> &BTreeSet<NameId> {
        &self.core_names
    }

    /// Names absorbed from smaller clusters
    pub fn extra_names(&self) -> &BTreeSet<NameId> {
        &self.extra_names
    }

    /// Core names followed by extra names
    pub fn all_names(&self) -> impl Iterator<Item = NameId> + '_ {
        self.core_names.iter().chain(self.extra_names.iter()).copied()
    }

    /// Artifacts carrying the cluster
    pub fn jars(&self) -> &ArtifactSet {
        &self.jars
    }

    pub fn exemplar_names(&self) -> &BTreeSet<NameId> {
        &self.exemplar_names
    }

    /// Best representative artifacts, ascending by id
    pub fn exemplars(&self) -> &[ArtifactId] {
        &self.exemplars
    }

    pub fn contains_name(&self, name: NameId) -> bool {
        self.core_names.contains(&name) || self.extra_names.contains(&name)
    }

    /// Fold another cluster's core names into this one (Stage 1 merge)
    pub(crate) fn fold_core(&mut self, mut other: Cluster, interner: &mut SetInterner) {
        self.jars = interner.merge(&self.jars, &other.jars);
        self.core_names.append(&mut other.core_names);
        self.extra_names.append(&mut other.extra_names);
    }

    /// Take a subsumed cluster's names as extra names (Stage 2 merge)
    ///
    /// The footprint is unchanged: callers only absorb clusters whose jars are
    /// a subset of this one's.
    pub(crate) fn absorb(&mut self, mut other: Cluster) {
        self.extra_names.append(&mut other.core_names);
        self.extra_names.append(&mut other.extra_names);
    }

    pub(crate) fn clear_exemplars(&mut self) {
        self.exemplar_names.clear();
        self.exemplars.clear();
    }

    pub(crate) fn set_exemplars(&mut self, names: BTreeSet<NameId>, artifacts: Vec<ArtifactId>) {
        self.exemplar_names = names;
        self.exemplars = artifacts;
    }

    /// Group the cluster's artifacts by the name variants they carry
    ///
    /// Two artifacts belong to the same version when, for every core and extra
    /// name, they carry the same content variant (or both lack the name).
    /// Versions are ordered by descending artifact count.
    pub fn versions(&self, trie: &NameTrie) -> Result<Vec<ClusterVersion>> {
        version::group_versions(self, trie)
    }
}

/// The clusters produced by one stage
#[derive(Debug, Clone, Default)]
pub struct ClusterCollection {
    clusters: Vec<Cluster>,
}

impl ClusterCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, cluster: Cluster) {
        self.clusters.push(cluster);
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Cluster> {
        self.clusters.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Cluster> {
        self.clusters.iter_mut()
    }

    pub fn get(&self, id: ClusterId) -> Result<&Cluster> {
        self.clusters
            .iter()
            .find(|cluster| cluster.id == id)
            .ok_or(ModelError::UnknownCluster(id))
    }

    /// Cluster holding `name` as a core or extra name
    pub fn find_by_name(&self, name: NameId) -> Option<&Cluster> {
        self.clusters.iter().find(|cluster| cluster.contains_name(name))
    }

    pub fn into_vec(self) -> Vec<Cluster> {
        self.clusters
    }
}

impl From<Vec<Cluster>> for ClusterCollection {
    fn from(clusters: Vec<Cluster>) -> Self {
        Self { clusters }
    }
}

impl IntoIterator for ClusterCollection {
    type Item = Cluster;
    type IntoIter = std::vec::IntoIter<Cluster>;

    fn into_iter(self) -> Self::IntoIter {
        self.clusters.into_iter()
    }
}

impl<'a> IntoIterator for &'a ClusterCollection {
    type Item = &'a Cluster;
    type IntoIter = std::slice::Iter<'a, Cluster>;

    fn into_iter(self) -> Self::IntoIter {
        self.clusters.iter()
    }
}
