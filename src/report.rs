//! Cluster reports
//!
//! JSON (`--format json`) and plain-text renderings of a pipeline run, plus
//! the collection statistics printed by `--summary`.

use crate::artifact::{Artifact, ArtifactCollection};
use crate::cluster::{Cluster, ClusterCollection, ClusterId};
use crate::config::MergeMethod;
use crate::corpus::Corpus;
use crate::pipeline::PipelineOutput;
use crate::trie::{NameId, NameTrie};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::io::Write;

/// Coverage statistics of a cluster collection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSummary {
    pub artifacts: usize,
    pub clusters: usize,
    /// Clusters whose footprint is a single artifact
    pub single_artifact_clusters: usize,
    /// Artifacts carried by exactly one cluster
    pub artifacts_in_one_cluster: usize,
    /// Artifacts carried by two or more clusters
    pub artifacts_in_several_clusters: usize,
    /// Artifacts no cluster carries (they declare no names)
    pub uncovered_artifacts: usize,
}

impl CollectionSummary {
    pub fn compute(clusters: &ClusterCollection, artifacts: &ArtifactCollection) -> Self {
        let mut coverage = vec![0usize; artifacts.len()];
        let mut single_artifact_clusters = 0;
        for cluster in clusters {
            if cluster.jars().len() == 1 {
                single_artifact_clusters += 1;
            }
            for artifact in cluster.jars() {
                if let Some(count) = coverage.get_mut(artifact.index()) {
                    *count += 1;
                }
            }
        }

        Self {
            artifacts: artifacts.len(),
            clusters: clusters.len(),
            single_artifact_clusters,
            artifacts_in_one_cluster: coverage.iter().filter(|c| **c == 1).count(),
            artifacts_in_several_clusters: coverage.iter().filter(|c| **c > 1).count(),
            uncovered_artifacts: coverage.iter().filter(|c| **c == 0).count(),
        }
    }
}

/// An artifact as it appears in reports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonArtifact {
    pub hash: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl From<&Artifact> for JsonArtifact {
    fn from(artifact: &Artifact) -> Self {
        let meta = artifact.meta();
        Self {
            hash: meta.hash.clone(),
            name: artifact.display_name().to_string(),
            group: meta.group.clone(),
            version: meta.version.clone(),
        }
    }
}

/// One final cluster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonCluster {
    pub id: ClusterId,
    /// Number of artifacts carrying the cluster
    pub jars: usize,
    pub core_names: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_names: Vec<String>,
    pub exemplar_names: Vec<String>,
    pub exemplars: Vec<JsonArtifact>,
    /// Distinct variant signatures among the cluster's artifacts
    pub versions: usize,
}

impl JsonCluster {
    pub fn from_cluster(cluster: &Cluster, corpus: &Corpus) -> Result<Self> {
        let trie = corpus.trie();
        let mut exemplars = Vec::with_capacity(cluster.exemplars().len());
        for id in cluster.exemplars() {
            exemplars.push(JsonArtifact::from(corpus.artifacts().get(*id)?));
        }

        Ok(Self {
            id: cluster.id(),
            jars: cluster.jars().len(),
            core_names: fqns(cluster.core_names().iter().copied(), trie)?,
            extra_names: fqns(cluster.extra_names().iter().copied(), trie)?,
            exemplar_names: fqns(cluster.exemplar_names().iter().copied(), trie)?,
            exemplars,
            versions: cluster.versions(trie)?.len(),
        })
    }
}

fn fqns<I>(names: I, trie: &NameTrie) -> Result<Vec<String>>
where
    I: IntoIterator<Item = NameId>,
{
    let mut out = Vec::new();
    for name in names {
        out.push(trie.fqn(name)?);
    }
    out.sort();
    Ok(out)
}

/// Complete JSON report of one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonReport {
    /// Format version identifier
    pub version: String,
    /// Format name
    pub format: String,
    pub method: MergeMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    /// Number of Stage-1 clusters
    pub identified: usize,
    pub summary: CollectionSummary,
    pub clusters: Vec<JsonCluster>,
}

impl JsonReport {
    pub fn from_output(output: &PipelineOutput, corpus: &Corpus) -> Result<Self> {
        let mut clusters = Vec::with_capacity(output.clusters.len());
        for cluster in &output.clusters {
            clusters.push(JsonCluster::from_cluster(cluster, corpus)?);
        }

        Ok(Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            format: "libsift-json-v1".to_string(),
            method: output.method,
            threshold: output.threshold,
            identified: output.identified,
            summary: CollectionSummary::compute(&output.clusters, corpus.artifacts()),
            clusters,
        })
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Print the summary block of one run
pub fn write_summary<W: Write>(out: &mut W, output: &PipelineOutput, corpus: &Corpus) -> Result<()> {
    let summary = CollectionSummary::compute(&output.clusters, corpus.artifacts());
    match output.threshold {
        Some(threshold) => writeln!(
            out,
            "Merge method: {} (threshold {:.2})",
            output.method, threshold
        )?,
        None => writeln!(out, "Merge method: {}", output.method)?,
    }
    writeln!(
        out,
        "Clusters: {} (stage 1: {}, single-artifact: {})",
        summary.clusters, output.identified, summary.single_artifact_clusters
    )?;
    writeln!(
        out,
        "Artifacts: {} (in one cluster: {}, in several: {}, uncovered: {})",
        summary.artifacts,
        summary.artifacts_in_one_cluster,
        summary.artifacts_in_several_clusters,
        summary.uncovered_artifacts
    )?;
    Ok(())
}

/// Print the summary followed by every cluster
pub fn write_text<W: Write>(out: &mut W, output: &PipelineOutput, corpus: &Corpus) -> Result<()> {
    write_summary(out, output, corpus)?;

    for cluster in &output.clusters {
        let report = JsonCluster::from_cluster(cluster, corpus)?;
        writeln!(out)?;
        writeln!(
            out,
            "Cluster {} ({} artifacts, {} versions)",
            report.id, report.jars, report.versions
        )?;
        write_names(out, "core", &report.core_names)?;
        write_names(out, "extra", &report.extra_names)?;
        let exemplars: Vec<String> = report.exemplars.iter().map(|a| a.name.clone()).collect();
        write_names(out, "exemplars", &exemplars)?;
    }
    Ok(())
}

fn write_names<W: Write>(out: &mut W, label: &str, names: &[String]) -> Result<()> {
    for (i, name) in names.iter().enumerate() {
        let label = if i == 0 { label } else { "" };
        writeln!(out, "  {:<10} {}", label, name)?;
    }
    Ok(())
}
