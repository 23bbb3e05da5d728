//! Clustering pipeline
//!
//! Stage 1: identification → Stage 2: merge → exemplar selection.
//!
//! The configuration is validated before the trie is touched. A sweep runs
//! Stage 1 once and repeats Stage 2 and exemplar selection for every
//! threshold on a fresh copy of the Stage-1 clusters.

use crate::cluster::ClusterCollection;
use crate::config::{MergeMethod, SiftConfig};
use crate::corpus::Corpus;
use crate::decision_log::DecisionLog;
use crate::exemplar::select_exemplars;
use crate::identify::identify_clusters;
use crate::merge::{merge_clusters, MergeStrategy, ThresholdSweep};
use anyhow::{Context, Result};
use std::time::Instant;
use tracing::info;

/// Final clusters of one Stage-2 configuration
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub method: MergeMethod,

    /// Merge threshold used; `None` for the entropy strategy
    pub threshold: Option<f64>,

    /// Number of Stage-1 clusters before merging
    pub identified: usize,

    pub clusters: ClusterCollection,
}

/// Run the whole pipeline once with the configured merge threshold
pub fn run(corpus: &mut Corpus, config: &SiftConfig, log: &mut DecisionLog) -> Result<PipelineOutput> {
    config.validate().context("Invalid configuration")?;

    let stage1 = identify(corpus, config)?;
    let strategy = MergeStrategy::from_config(config);
    finish(corpus, config, &strategy, stage1, log)
}

/// Run Stage 2 and exemplar selection once per sweep threshold
///
/// Thresholds go from 100% down by `threshold_decrement` while above
/// `minimum_threshold`. The entropy strategy has no threshold and runs once.
pub fn run_sweep(
    corpus: &mut Corpus,
    config: &SiftConfig,
    log: &mut DecisionLog,
) -> Result<Vec<PipelineOutput>> {
    config.validate().context("Invalid configuration")?;

    let stage1 = identify(corpus, config)?;
    if !config.merge_method.uses_threshold() {
        let strategy = MergeStrategy::from_config(config);
        return Ok(vec![finish(corpus, config, &strategy, stage1, log)?]);
    }

    let mut outputs = Vec::new();
    for percent in ThresholdSweep::new(config.minimum_threshold, config.threshold_decrement) {
        let step = config.with_merge_percent(percent);
        let strategy = MergeStrategy::from_config(&step);
        outputs.push(finish(corpus, &step, &strategy, stage1.clone(), log)?);
    }
    info!(steps = outputs.len(), "Threshold sweep complete");
    Ok(outputs)
}

fn identify(corpus: &mut Corpus, config: &SiftConfig) -> Result<ClusterCollection> {
    let started = Instant::now();
    let (trie, artifacts, interner) = corpus.parts_mut();
    info!(
        artifacts = artifacts.len(),
        names = trie.len() - 1,
        threshold = config.compatibility_threshold,
        "Stage 1: identifying clusters"
    );
    let clusters = identify_clusters(trie, interner, config.compatibility_threshold)
        .context("Stage 1 failed")?;
    info!(
        clusters = clusters.len(),
        interned_sets = interner.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Stage 1 complete"
    );
    Ok(clusters)
}

fn finish(
    corpus: &Corpus,
    config: &SiftConfig,
    strategy: &MergeStrategy,
    stage1: ClusterCollection,
    log: &mut DecisionLog,
) -> Result<PipelineOutput> {
    let started = Instant::now();
    let identified = stage1.len();

    let mut clusters =
        merge_clusters(stage1, strategy, corpus.trie(), log).context("Stage 2 failed")?;
    select_exemplars(
        &mut clusters,
        corpus.trie(),
        corpus.artifacts(),
        config.exemplar_threshold,
        log,
    )
    .context("Exemplar selection failed")?;

    info!(
        method = %strategy.method(),
        identified,
        clusters = clusters.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Pipeline complete"
    );

    Ok(PipelineOutput {
        method: strategy.method(),
        threshold: strategy.threshold(),
        identified,
        clusters,
    })
}
