//! Property-based tests for the clustering engine
//!
//! Random corpora are drawn from a small name alphabet so that names collide
//! across artifacts and packages nest, which is where the stages interact.
//!
//! Properties tested:
//! 1. Artifact-set interning and union algebra
//! 2. Stage-1 partition totality
//! 3. Stage-2 footprint containment for every strategy
//! 4. Exemplar selection idempotence and exemplar membership

use libsift::artifact::{ArtifactId, ArtifactMeta, SetInterner};
use libsift::config::{EntropyLimits, MergeMethod};
use libsift::corpus::Corpus;
use libsift::decision_log::DecisionLog;
use libsift::exemplar::select_exemplars;
use libsift::identify::identify_clusters;
use libsift::merge::{merge_clusters, MergeStrategy};
use libsift::{ClusterCollection, NameId};
use proptest::prelude::*;
use std::collections::BTreeMap;

/// Artifacts as lists of (package, subpackage, class) indices; a class index
/// of 0 declares the subpackage itself
fn corpus_strategy() -> impl Strategy<Value = Vec<Vec<(u8, u8, u8)>>> {
    prop::collection::vec(
        prop::collection::vec((0u8..3, 0u8..3, 0u8..4), 1..6),
        1..8,
    )
}

fn build_corpus(artifacts: &[Vec<(u8, u8, u8)>]) -> Corpus {
    let mut corpus = Corpus::new();
    for (i, names) in artifacts.iter().enumerate() {
        let id = corpus
            .add_artifact(ArtifactMeta::new(format!("h{}", i)))
            .unwrap();
        for (p, s, c) in names {
            let fqn = if *c == 0 {
                format!("p{}.s{}", p, s)
            } else {
                format!("p{}.s{}.C{}", p, s, c)
            };
            corpus.add_name(id, &fqn, None).unwrap();
        }
    }
    corpus
}

fn stage1(corpus: &mut Corpus, threshold: f64) -> ClusterCollection {
    let (trie, _, interner) = corpus.parts_mut();
    identify_clusters(trie, interner, threshold).unwrap()
}

fn declared_names(corpus: &Corpus) -> Vec<NameId> {
    corpus
        .trie()
        .post_order()
        .filter(|id| corpus.trie().get(*id).unwrap().is_declared())
        .collect()
}

fn strategies() -> Vec<MergeStrategy> {
    vec![
        MergeStrategy::RelatedSubpackage { threshold: 0.5 },
        MergeStrategy::JaccardPackage { threshold: 0.3 },
        MergeStrategy::MaxPathSimilarity { threshold: 0.5 },
        MergeStrategy::AvgPathSimilarity { threshold: 0.5 },
        MergeStrategy::Entropy(EntropyLimits::default()),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_interning_identity(
        members in prop::collection::vec(0u32..20, 0..12),
    ) {
        // Property: equal membership gives the same instance, whatever the order
        let mut interner = SetInterner::new();
        let forward = interner.from_members(members.iter().copied().map(ArtifactId::new));
        let backward = interner.from_members(members.iter().rev().copied().map(ArtifactId::new));

        prop_assert!(forward.is_same(&backward));
        prop_assert_eq!(forward.as_slice(), backward.as_slice());
    }

    #[test]
    fn prop_union_monotonicity(
        a in prop::collection::vec(0u32..16, 0..10),
        b in prop::collection::vec(0u32..16, 0..10),
    ) {
        let mut interner = SetInterner::new();
        let a = interner.from_members(a.into_iter().map(ArtifactId::new));
        let b = interner.from_members(b.into_iter().map(ArtifactId::new));
        let union = interner.merge(&a, &b);

        let larger = a.len().max(b.len());
        prop_assert!(union.len() >= larger);
        let nested = a.is_subset(&b) || b.is_subset(&a);
        prop_assert_eq!(union.len() == larger, nested);

        // Union is commutative and interned
        let reversed = interner.merge(&b, &a);
        prop_assert!(union.is_same(&reversed));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_stage1_partition_totality(
        artifacts in corpus_strategy(),
        threshold in prop::sample::select(vec![1.0f64, 0.75, 0.5, 0.2]),
    ) {
        // Property: every declared name is a core name of exactly one cluster
        let mut corpus = build_corpus(&artifacts);
        let clusters = stage1(&mut corpus, threshold);

        let mut owners: BTreeMap<NameId, usize> = BTreeMap::new();
        for cluster in &clusters {
            prop_assert!(cluster.extra_names().is_empty());
            for name in cluster.core_names() {
                *owners.entry(*name).or_default() += 1;
            }
        }
        for name in declared_names(&corpus) {
            prop_assert_eq!(owners.get(&name).copied(), Some(1));
        }
        prop_assert_eq!(owners.len(), declared_names(&corpus).len());
    }

    #[test]
    fn prop_stage1_footprint_is_union_of_core_names(
        artifacts in corpus_strategy(),
    ) {
        let mut corpus = build_corpus(&artifacts);
        let clusters = stage1(&mut corpus, 1.0);
        for cluster in &clusters {
            for name in cluster.core_names() {
                let node = corpus.trie().get(*name).unwrap();
                // exact compatibility: every core name has the cluster's footprint
                prop_assert!(node.jars().is_same(cluster.jars()));
            }
        }
    }

    #[test]
    fn prop_stage2_footprint_containment(
        artifacts in corpus_strategy(),
    ) {
        // Property: no strategy absorbs a name that misses the core's artifacts
        let mut corpus = build_corpus(&artifacts);
        let identified = stage1(&mut corpus, 1.0);

        for strategy in strategies() {
            let merged = merge_clusters(
                identified.clone(),
                &strategy,
                corpus.trie(),
                &mut DecisionLog::disabled(),
            )
            .unwrap();

            prop_assert!(merged.len() <= identified.len());
            let total_names: usize = merged
                .iter()
                .map(|c| c.core_names().len() + c.extra_names().len())
                .sum();
            let identified_names: usize = identified.iter().map(|c| c.core_names().len()).sum();
            prop_assert_eq!(total_names, identified_names);

            for cluster in &merged {
                for name in cluster.extra_names() {
                    let node = corpus.trie().get(*name).unwrap();
                    prop_assert!(node.jars().intersects(cluster.jars()));
                    prop_assert!(node.jars().is_subset(cluster.jars()));
                }
            }
        }
    }

    #[test]
    fn prop_exemplar_selection_idempotent(
        artifacts in corpus_strategy(),
        threshold in 0.0f64..=1.0,
    ) {
        let mut corpus = build_corpus(&artifacts);
        let identified = stage1(&mut corpus, 1.0);
        let mut clusters = merge_clusters(
            identified,
            &MergeStrategy::new(MergeMethod::RelatedSubpackage, 0.5, EntropyLimits::default()),
            corpus.trie(),
            &mut DecisionLog::disabled(),
        )
        .unwrap();

        let mut log = DecisionLog::disabled();
        select_exemplars(&mut clusters, corpus.trie(), corpus.artifacts(), threshold, &mut log).unwrap();
        let first: Vec<_> = clusters
            .iter()
            .map(|c| (c.exemplar_names().clone(), c.exemplars().to_vec()))
            .collect();

        select_exemplars(&mut clusters, corpus.trie(), corpus.artifacts(), threshold, &mut log).unwrap();
        let second: Vec<_> = clusters
            .iter()
            .map(|c| (c.exemplar_names().clone(), c.exemplars().to_vec()))
            .collect();
        prop_assert_eq!(&first, &second);

        for cluster in &clusters {
            // Property: exemplars are non-empty members of the footprint
            prop_assert!(!cluster.exemplars().is_empty());
            for artifact in cluster.exemplars() {
                prop_assert!(cluster.jars().contains(*artifact));
            }
            for name in cluster.core_names() {
                prop_assert!(cluster.exemplar_names().contains(name));
            }
        }
    }
}
