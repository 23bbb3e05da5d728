//! Artifacts: the compiled archives of the corpus
//!
//! An artifact is created once while the corpus loads and never changes
//! afterwards. Everything downstream refers to it by [`ArtifactId`].

mod set;

pub use set::{ArtifactSet, InternerStats, SetInterner};

use crate::error::{ModelError, Result};
use crate::trie::NameId;
use fnv::{FnvHashMap, FnvHashSet};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Dense index of an artifact inside its [`ArtifactCollection`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArtifactId(u32);

impl ArtifactId {
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a{}", self.0)
    }
}

/// Descriptive metadata supplied by the loader
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactMeta {
    /// Content hash, the artifact's identity
    pub hash: String,

    /// Display name (usually the archive file name)
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl ArtifactMeta {
    pub fn new(hash: impl Into<String>) -> Self {
        Self {
            hash: hash.into(),
            name: String::new(),
            group: None,
            version: None,
        }
    }
}

/// One archive of the corpus and the names it contains
#[derive(Debug, Clone)]
pub struct Artifact {
    id: ArtifactId,
    meta: ArtifactMeta,
    names: Vec<NameId>,
    seen: FnvHashSet<NameId>,
}

impl Artifact {
    pub fn id(&self) -> ArtifactId {
        self.id
    }

    pub fn hash(&self) -> &str {
        &self.meta.hash
    }

    /// Display name, falling back to the hash when the loader gave none
    pub fn display_name(&self) -> &str {
        if self.meta.name.is_empty() {
            &self.meta.hash
        } else {
            &self.meta.name
        }
    }

    pub fn meta(&self) -> &ArtifactMeta {
        &self.meta
    }

    /// Names declared by this artifact, in load order, without duplicates
    pub fn names(&self) -> &[NameId] {
        &self.names
    }
}

/// All artifacts of a run, indexed by id and by hash
#[derive(Debug, Default)]
pub struct ArtifactCollection {
    artifacts: Vec<Artifact>,
    by_hash: FnvHashMap<String, ArtifactId>,
}

impl ArtifactCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new artifact; hashes must be unique
    pub fn insert(&mut self, meta: ArtifactMeta) -> Result<ArtifactId> {
        if self.by_hash.contains_key(&meta.hash) {
            return Err(ModelError::DuplicateArtifact(meta.hash));
        }
        let id = ArtifactId::new(self.artifacts.len() as u32);
        self.by_hash.insert(meta.hash.clone(), id);
        self.artifacts.push(Artifact {
            id,
            meta,
            names: Vec::new(),
            seen: FnvHashSet::default(),
        });
        Ok(id)
    }

    /// Record that `artifact` declares `name`; returns false if already recorded
    pub(crate) fn record_name(&mut self, artifact: ArtifactId, name: NameId) -> Result<bool> {
        let entry = self
            .artifacts
            .get_mut(artifact.index())
            .ok_or(ModelError::UnknownArtifact(artifact))?;
        if !entry.seen.insert(name) {
            return Ok(false);
        }
        entry.names.push(name);
        Ok(true)
    }

    pub fn get(&self, id: ArtifactId) -> Result<&Artifact> {
        self.artifacts
            .get(id.index())
            .ok_or(ModelError::UnknownArtifact(id))
    }

    pub fn by_hash(&self, hash: &str) -> Option<ArtifactId> {
        self.by_hash.get(hash).copied()
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Artifact> {
        self.artifacts.iter()
    }
}
