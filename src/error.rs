//! Model-integrity errors
//!
//! These indicate that an identifier handed to the core does not resolve
//! against the loaded corpus. They are programmer or data errors: the
//! traversal state cannot be trusted afterwards, so callers abort the run.

use crate::artifact::ArtifactId;
use crate::cluster::ClusterId;
use crate::trie::NameId;
use thiserror::Error;

/// Errors raised when the in-memory model is inconsistent
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("Name {0} cannot be resolved in the name trie")]
    UnknownName(NameId),

    #[error("Artifact {0} is not part of the corpus")]
    UnknownArtifact(ArtifactId),

    #[error("Cluster {0} is not part of the collection")]
    UnknownCluster(ClusterId),

    #[error("Artifact with hash {0} was loaded twice")]
    DuplicateArtifact(String),
}

/// Result type for model lookups
pub type Result<T> = std::result::Result<T, ModelError>;
