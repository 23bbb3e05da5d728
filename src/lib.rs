//! libsift - library identification over compiled-artifact corpora
//!
//! This library groups the fully qualified names found in a corpus of
//! artifacts into library clusters by how consistently they co-occur,
//! merges related clusters, and picks exemplar artifacts for each one.
//!
//! The pipeline runs in three steps:
//!
//! 1. [`identify`]: bottom-up pass over the [`trie::NameTrie`] that folds
//!    names into clusters when their artifact sets agree.
//! 2. [`merge`]: first-fit merge of clusters whose footprints nest, gated by
//!    a pluggable [`merge::MergeStrategy`].
//! 3. [`exemplar`]: per-cluster scoring of artifacts against the names that
//!    characterize the cluster.
//!
//! [`pipeline::run`] ties the steps together for a loaded [`corpus::Corpus`].

pub mod artifact;
pub mod cli;
pub mod cluster;
pub mod config;
pub mod corpus;
pub mod decision_log;
pub mod error;
pub mod exemplar;
pub mod identify;
pub mod merge;
pub mod pipeline;
pub mod report;
pub mod trie;

pub use artifact::{ArtifactCollection, ArtifactId, ArtifactMeta, ArtifactSet, SetInterner};
pub use cluster::{Cluster, ClusterCollection, ClusterId};
pub use config::{MergeMethod, SiftConfig};
pub use corpus::Corpus;
pub use error::ModelError;
pub use trie::{NameId, NameTrie, VariantId};
