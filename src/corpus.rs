//! Corpus loading
//!
//! The corpus is the in-memory membership model the clustering stages read:
//! the artifact collection, the name trie, and the interning table both of
//! them share. It is built once (from JSON or programmatically) and is
//! read-only afterwards, apart from the interner, which later stages keep
//! using for cluster footprints.
//!
//! # JSON format
//! ```json
//! { "artifacts": [
//!   { "hash": "3f2a", "name": "foo-1.0.jar", "group": "org.foo", "version": "1.0",
//!     "names": ["org.foo.A", { "fqn": "org.foo.B", "variant": "fp-91c" }] } ] }
//! ```

use crate::artifact::{ArtifactCollection, ArtifactId, ArtifactMeta, SetInterner};
use crate::error::ModelError;
use crate::trie::{NameId, NameTrie, VariantId};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Errors raised while building a corpus
#[derive(Error, Debug)]
pub enum CorpusError {
    #[error("Failed to read corpus file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid corpus JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Artifact {artifact} declares invalid name '{name}'")]
    InvalidName { artifact: String, name: String },

    #[error(transparent)]
    Model(#[from] ModelError),
}

pub type Result<T> = std::result::Result<T, CorpusError>;

/// Serialized corpus
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorpusFile {
    pub artifacts: Vec<ArtifactEntry>,
}

/// One artifact of a serialized corpus
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactEntry {
    #[serde(flatten)]
    pub meta: ArtifactMeta,

    #[serde(default)]
    pub names: Vec<NameEntry>,
}

/// A declared name, optionally tagged with its content variant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NameEntry {
    Plain(String),
    Variant {
        fqn: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        variant: Option<String>,
    },
}

impl NameEntry {
    pub fn fqn(&self) -> &str {
        match self {
            NameEntry::Plain(fqn) => fqn,
            NameEntry::Variant { fqn, .. } => fqn,
        }
    }

    pub fn variant(&self) -> Option<&str> {
        match self {
            NameEntry::Plain(_) => None,
            NameEntry::Variant { variant, .. } => variant.as_deref(),
        }
    }
}

/// Artifacts, names and the shared set interner for one run
#[derive(Debug)]
pub struct Corpus {
    artifacts: ArtifactCollection,
    trie: NameTrie,
    interner: SetInterner,
}

impl Default for Corpus {
    fn default() -> Self {
        Self::new()
    }
}

impl Corpus {
    pub fn new() -> Self {
        let interner = SetInterner::new();
        let trie = NameTrie::new(&interner);
        Self {
            artifacts: ArtifactCollection::new(),
            trie,
            interner,
        }
    }

    /// Load a corpus from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| CorpusError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let corpus = Self::from_json_str(&content)?;
        info!(
            path = %path.display(),
            artifacts = corpus.artifacts.len(),
            names = corpus.trie.len() - 1,
            "Loaded corpus"
        );
        Ok(corpus)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let file: CorpusFile = serde_json::from_str(content)?;
        Self::from_file(&file)
    }

    pub fn from_file(file: &CorpusFile) -> Result<Self> {
        let mut corpus = Self::new();
        for entry in &file.artifacts {
            let artifact = corpus.add_artifact(entry.meta.clone())?;
            for name in &entry.names {
                corpus.add_name(artifact, name.fqn(), name.variant())?;
            }
        }
        Ok(corpus)
    }

    pub fn add_artifact(&mut self, meta: ArtifactMeta) -> Result<ArtifactId> {
        Ok(self.artifacts.insert(meta)?)
    }

    /// Declare that `artifact` contains `fqn`, with an optional content variant
    pub fn add_name(
        &mut self,
        artifact: ArtifactId,
        fqn: &str,
        variant: Option<&str>,
    ) -> Result<NameId> {
        let name = match self.trie.insert(fqn) {
            Some(name) => name,
            None => {
                return Err(CorpusError::InvalidName {
                    artifact: self.artifacts.get(artifact)?.hash().to_string(),
                    name: fqn.to_string(),
                })
            }
        };
        let variant = match variant {
            Some(label) => self.trie.variant(label),
            None => VariantId::DEFAULT,
        };

        // the first declaration fixes the artifact's variant of this name
        if !self.artifacts.record_name(artifact, name)? {
            debug!(%artifact, fqn, "Artifact declares the same name twice");
            return Ok(name);
        }
        self.trie
            .add_artifact(&mut self.interner, name, variant, artifact)?;
        Ok(name)
    }

    pub fn artifacts(&self) -> &ArtifactCollection {
        &self.artifacts
    }

    pub fn trie(&self) -> &NameTrie {
        &self.trie
    }

    pub fn interner(&self) -> &SetInterner {
        &self.interner
    }

    /// Split borrow used by the stages: read the model, intern new footprints
    pub fn parts_mut(&mut self) -> (&NameTrie, &ArtifactCollection, &mut SetInterner) {
        (&self.trie, &self.artifacts, &mut self.interner)
    }
}
