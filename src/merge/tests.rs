// Stage-2 merger tests

use super::*;
use crate::artifact::ArtifactMeta;
use crate::cluster::{ClusterId, ClusterIds};
use crate::config::{EntropyLimits, MergeMethod};
use crate::corpus::Corpus;
use crate::identify::identify_clusters;
use crate::trie::NameId;

fn corpus(artifacts: &[(&str, &[&str])]) -> Corpus {
    let mut corpus = Corpus::new();
    for (hash, names) in artifacts {
        let id = corpus.add_artifact(ArtifactMeta::new(*hash)).unwrap();
        for name in names.iter() {
            corpus.add_name(id, name, None).unwrap();
        }
    }
    corpus
}

fn stage1(corpus: &mut Corpus) -> ClusterCollection {
    let (trie, _, interner) = corpus.parts_mut();
    identify_clusters(trie, interner, 1.0).unwrap()
}

fn name(corpus: &Corpus, fqn: &str) -> NameId {
    corpus.trie().lookup(fqn).unwrap()
}

fn cluster(corpus: &mut Corpus, ids: &mut ClusterIds, names: &[&str]) -> Cluster {
    let names: Vec<NameId> = names.iter().map(|n| name(corpus, n)).collect();
    let (trie, _, interner) = corpus.parts_mut();
    Cluster::from_core_names(ids.next_id(), names, trie, interner).unwrap()
}

fn jaccard(threshold: f64) -> MergeStrategy {
    MergeStrategy::JaccardPackage { threshold }
}

#[test]
fn test_jaccard_half_overlap_merges_at_half() {
    // core {p.A, q.B} on j1+j2, candidate {p.C} on j1: packages {p,q} vs {p}
    let artifacts: &[(&str, &[&str])] = &[("j1", &["p.A", "q.B", "p.C"]), ("j2", &["p.A", "q.B"])];

    let mut loose = corpus(artifacts);
    let clusters = stage1(&mut loose);
    assert_eq!(clusters.len(), 2);
    let merged = merge_clusters(clusters, &jaccard(0.5), loose.trie(), &mut DecisionLog::new()).unwrap();
    assert_eq!(merged.len(), 1);
    let core = merged.iter().next().unwrap();
    assert!(core.extra_names().contains(&name(&loose, "p.C")));

    let mut strict = corpus(artifacts);
    let clusters = stage1(&mut strict);
    let merged = merge_clusters(clusters, &jaccard(0.6), strict.trie(), &mut DecisionLog::new()).unwrap();
    assert_eq!(merged.len(), 2);
}

#[test]
fn test_candidate_must_be_subset_of_core() {
    let mut corpus = corpus(&[("j1", &["p.A", "p.B"]), ("j2", &["p.A"]), ("j3", &["p.B"])]);
    let clusters = stage1(&mut corpus);
    let merged = merge_clusters(clusters, &jaccard(0.0), corpus.trie(), &mut DecisionLog::new()).unwrap();
    assert_eq!(merged.len(), 2);
}

#[test]
fn test_first_fit_prefers_earlier_core() {
    // x.A and x.B both span three artifacts and contain j1; x.C only j1
    let mut corpus = corpus(&[
        ("j1", &["x.A", "x.B", "x.C"]),
        ("j2", &["x.A"]),
        ("j3", &["x.A"]),
        ("j4", &["x.B"]),
        ("j5", &["x.B"]),
    ]);
    let clusters = stage1(&mut corpus);
    assert_eq!(clusters.len(), 3);

    let merged = merge_clusters(clusters, &jaccard(0.0), corpus.trie(), &mut DecisionLog::new()).unwrap();
    assert_eq!(merged.len(), 2);
    let a = merged.find_by_name(name(&corpus, "x.A")).unwrap();
    let b = merged.find_by_name(name(&corpus, "x.B")).unwrap();
    assert!(a.id() < b.id());
    assert!(a.extra_names().contains(&name(&corpus, "x.C")));
    assert!(b.extra_names().is_empty());
}

#[test]
fn test_merge_keeps_core_footprint() {
    let mut corpus = corpus(&[("j1", &["p.A", "p.B"]), ("j2", &["p.A"])]);
    let clusters = stage1(&mut corpus);
    let a = name(&corpus, "p.A");
    let before = clusters.find_by_name(a).unwrap().jars().clone();

    let merged = merge_clusters(clusters, &jaccard(1.0), corpus.trie(), &mut DecisionLog::new()).unwrap();
    assert_eq!(merged.len(), 1);
    let core = merged.iter().next().unwrap();
    assert!(core.jars().is_same(&before));
    for extra in core.extra_names() {
        assert!(corpus.trie().get(*extra).unwrap().jars().intersects(core.jars()));
    }
}

#[test]
fn test_merge_is_deterministic() {
    let artifacts: &[(&str, &[&str])] = &[
        ("j1", &["a.A", "a.b.B", "c.C"]),
        ("j2", &["a.A", "a.b.B"]),
        ("j3", &["a.A", "c.D"]),
    ];
    let run = || {
        let mut corpus = corpus(artifacts);
        let clusters = stage1(&mut corpus);
        let merged = merge_clusters(
            clusters,
            &MergeStrategy::RelatedSubpackage { threshold: 0.5 },
            corpus.trie(),
            &mut DecisionLog::disabled(),
        )
        .unwrap();
        merged
            .iter()
            .map(|c| (c.id(), c.core_names().clone(), c.extra_names().clone()))
            .collect::<Vec<_>>()
    };
    assert_eq!(run(), run());
}

#[test]
fn test_decisions_are_logged() {
    let mut corpus = corpus(&[("j1", &["p.A", "q.B", "p.C"]), ("j2", &["p.A", "q.B"])]);
    let clusters = stage1(&mut corpus);
    let mut log = DecisionLog::new();
    merge_clusters(clusters, &jaccard(0.6), corpus.trie(), &mut log).unwrap();

    assert_eq!(log.count(), 1);
    let record = &log.records()[0];
    assert_eq!(record.category, "merge");
    assert_eq!(record.name, "jaccard-package");
    assert_eq!(record.result["accepted"], false);
    assert_eq!(record.result["measure"]["kind"], "similarity");
    assert_eq!(record.result["measure"]["score"], 0.5);
}

#[test]
fn test_related_subpackage_walks_up() {
    let mut corpus = corpus(&[
        ("j1", &["org.foo.A", "org.foo.sub.B", "com.bar.C"]),
        ("j2", &["org.foo.A"]),
    ]);
    let mut ids = ClusterIds::new();
    let core = cluster(&mut corpus, &mut ids, &["org.foo.A"]);
    let nested = cluster(&mut corpus, &mut ids, &["org.foo.sub.B"]);
    let foreign = cluster(&mut corpus, &mut ids, &["com.bar.C"]);
    let mixed = cluster(&mut corpus, &mut ids, &["org.foo.sub.B", "com.bar.C"]);
    let trie = corpus.trie();

    assert_eq!(related_subpackage(&core, &nested, trie).unwrap(), 1.0);
    assert_eq!(related_subpackage(&core, &foreign, trie).unwrap(), 0.0);
    assert_eq!(related_subpackage(&core, &mixed, trie).unwrap(), 0.5);

    let strategy = MergeStrategy::RelatedSubpackage { threshold: 1.0 };
    assert!(strategy.should_merge(&core, &nested, trie).unwrap());
    assert!(!strategy.should_merge(&core, &mixed, trie).unwrap());
}

#[test]
fn test_related_subpackage_top_level_core() {
    // A top-level core name has the root as package, which relates everything
    let mut corpus = corpus(&[("j1", &["Main", "org.x.Y"])]);
    let mut ids = ClusterIds::new();
    let core = cluster(&mut corpus, &mut ids, &["Main"]);
    let candidate = cluster(&mut corpus, &mut ids, &["org.x.Y"]);
    assert_eq!(related_subpackage(&core, &candidate, corpus.trie()).unwrap(), 1.0);
}

#[test]
fn test_path_similarity_max_and_mean() {
    let mut corpus = corpus(&[("j1", &["org.foo.A", "org.bar.D", "org.bar.E"])]);
    let mut ids = ClusterIds::new();
    let core = cluster(&mut corpus, &mut ids, &["org.foo.A", "org.bar.D"]);
    let candidate = cluster(&mut corpus, &mut ids, &["org.bar.E"]);
    let trie = corpus.trie();

    let max = path_similarity(&core, &candidate, trie, Aggregate::Max).unwrap();
    let mean = path_similarity(&core, &candidate, trie, Aggregate::Mean).unwrap();
    assert_eq!(max, 1.0);
    // per-core scores 0.5 then 1.0, running means 0.5 and 0.75
    assert!((mean - 0.625).abs() < 1e-12);

    assert!(MergeStrategy::MaxPathSimilarity { threshold: 0.9 }
        .should_merge(&core, &candidate, trie)
        .unwrap());
    assert!(!MergeStrategy::AvgPathSimilarity { threshold: 0.9 }
        .should_merge(&core, &candidate, trie)
        .unwrap());
}

#[test]
fn test_avg_path_similarity_uses_running_mean() {
    // A plain mean (0.75) would pass 0.7; the running mean (0.625) does not
    let mut corpus = corpus(&[("j1", &["org.foo.A", "org.bar.D", "org.bar.E"])]);
    let mut ids = ClusterIds::new();
    let core = cluster(&mut corpus, &mut ids, &["org.foo.A", "org.bar.D"]);
    let candidate = cluster(&mut corpus, &mut ids, &["org.bar.E"]);
    let trie = corpus.trie();

    let decision = MergeStrategy::AvgPathSimilarity { threshold: 0.7 }
        .evaluate(&core, &candidate, trie)
        .unwrap();
    assert!(!decision.accepted);
    match decision.measure {
        Measure::Similarity { score, .. } => assert!((score - 0.625).abs() < 1e-12),
        other => panic!("unexpected measure {:?}", other),
    }
    assert!(MergeStrategy::AvgPathSimilarity { threshold: 0.6 }
        .should_merge(&core, &candidate, trie)
        .unwrap());
}

#[test]
fn test_prefix_similarity_edge_cases() {
    let corpus = corpus(&[("j1", &["a.b.C"])]);
    let a = name(&corpus, "a");
    let ab = name(&corpus, "a.b");

    assert_eq!(prefix_similarity(&[], &[]), 1.0);
    assert_eq!(prefix_similarity(&[], &[a]), 0.0);
    assert_eq!(prefix_similarity(&[a, ab], &[a]), 0.5);
    assert_eq!(prefix_similarity(&[a], &[a, ab]), 1.0);
}

#[test]
fn test_entropy_strategy() {
    let mut corpus = corpus(&[
        ("j1", &["p.A", "p.B", "p.C", "q.x.D"]),
        ("j2", &["p.A", "p.B"]),
    ]);
    let mut ids = ClusterIds::new();
    let core = cluster(&mut corpus, &mut ids, &["p.A", "p.B"]);
    let same_package = cluster(&mut corpus, &mut ids, &["p.C"]);
    let elsewhere = cluster(&mut corpus, &mut ids, &["q.x.D"]);
    let trie = corpus.trie();
    let strategy = MergeStrategy::Entropy(EntropyLimits::default());

    let decision = strategy.evaluate(&core, &same_package, trie).unwrap();
    assert!(decision.accepted);

    // joint tree splits the root 2:1 between p and q, about 0.29
    let decision = strategy.evaluate(&core, &elsewhere, trie).unwrap();
    assert!(!decision.accepted);
    match decision.measure {
        Measure::Entropy(values) => {
            assert_eq!(values.smaller, 0.0);
            assert!(values.max_delta > 0.2);
        }
        other => panic!("unexpected measure {other:?}"),
    }
}

#[test]
fn test_entropy_scenario_values() {
    let decision = entropy_decision(1.0, 1.0, 1.05, &EntropyLimits::default());
    assert!(decision.merge);
}

#[test]
fn test_strategy_from_method() {
    let limits = EntropyLimits::default();
    for method in MergeMethod::ALL {
        let strategy = MergeStrategy::new(method, 0.8, limits);
        assert_eq!(strategy.method(), method);
        assert_eq!(strategy.threshold().is_some(), method.uses_threshold());
    }
}

#[test]
fn test_threshold_sweep_defaults() {
    let steps: Vec<u32> = ThresholdSweep::new(75, 5).collect();
    assert_eq!(steps, vec![100, 95, 90, 85, 80]);
}

#[test]
fn test_threshold_sweep_edges() {
    assert_eq!(ThresholdSweep::new(0, 30).collect::<Vec<_>>(), vec![100, 70, 40, 10]);
    assert_eq!(ThresholdSweep::new(99, 5).collect::<Vec<_>>(), vec![100]);
    assert_eq!(ThresholdSweep::new(100, 5).count(), 0);
    assert_eq!(ThresholdSweep::new(75, 0).collect::<Vec<_>>(), vec![100]);
    assert_eq!(ThresholdSweep::new(0, 200).collect::<Vec<_>>(), vec![100]);
}

#[test]
fn test_unknown_cluster_lookup_after_merge() {
    let mut corpus = corpus(&[("j1", &["p.A", "p.B"]), ("j2", &["p.A"])]);
    let clusters = stage1(&mut corpus);
    let merged = merge_clusters(clusters, &jaccard(1.0), corpus.trie(), &mut DecisionLog::new()).unwrap();
    assert!(merged.get(ClusterId::new(1000)).is_err());
}
