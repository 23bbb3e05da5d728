//! Name trie keyed by dotted FQN segments
//!
//! Each node is one fully-qualified name. Nodes live in a flat arena and are
//! addressed by [`NameId`]; the root has no segment and no parent. Children
//! are kept ordered by segment so traversal order is reproducible.
//!
//! A node records, per content variant, which artifacts declare that exact
//! name. The clustering stages only read the union over all variants
//! ([`NameNode::jars`]); the per-variant sets stay available for version
//! grouping.

use crate::artifact::{ArtifactId, ArtifactSet, SetInterner};
use crate::error::{ModelError, Result};
use fnv::FnvHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Segment separator for fully-qualified names
pub const SEPARATOR: char = '.';

/// Dense index of a node inside its [`NameTrie`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NameId(u32);

impl NameId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Interned content-variant label (a fingerprint of the code under a name)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VariantId(u32);

impl VariantId {
    /// Variant used when the loader supplies no fingerprint
    pub const DEFAULT: VariantId = VariantId(0);
}

/// One fully-qualified name
#[derive(Debug, Clone)]
pub struct NameNode {
    segment: Option<String>,
    parent: Option<NameId>,
    children: BTreeMap<String, NameId>,
    variants: Vec<(VariantId, ArtifactSet)>,
    jars: ArtifactSet,
    aggregate: ArtifactSet,
}

impl NameNode {
    fn new(segment: Option<String>, parent: Option<NameId>, empty: ArtifactSet) -> Self {
        Self {
            segment,
            parent,
            children: BTreeMap::new(),
            variants: Vec::new(),
            jars: empty.clone(),
            aggregate: empty,
        }
    }

    /// Last segment of the name; `None` for the root
    pub fn segment(&self) -> Option<&str> {
        self.segment.as_deref()
    }

    pub fn parent(&self) -> Option<NameId> {
        self.parent
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Children in ascending segment order
    pub fn children(&self) -> impl DoubleEndedIterator<Item = NameId> + '_ {
        self.children.values().copied()
    }

    /// Artifacts declaring this exact name, across all variants
    pub fn jars(&self) -> &ArtifactSet {
        &self.jars
    }

    /// Artifacts declaring this name or any name below it
    pub fn aggregate_jars(&self) -> &ArtifactSet {
        &self.aggregate
    }

    /// True when at least one artifact declares this exact name
    pub fn is_declared(&self) -> bool {
        !self.jars.is_empty()
    }

    pub fn variants(&self) -> impl Iterator<Item = (VariantId, &ArtifactSet)> {
        self.variants.iter().map(|(id, set)| (*id, set))
    }

    pub fn variant_count(&self) -> usize {
        self.variants.len()
    }

    /// Which variant of this name a given artifact carries
    pub fn variant_of(&self, artifact: ArtifactId) -> Option<VariantId> {
        self.variants
            .iter()
            .find(|(_, set)| set.contains(artifact))
            .map(|(id, _)| *id)
    }
}

/// Arena-backed trie of every name observed in the corpus
#[derive(Debug)]
pub struct NameTrie {
    nodes: Vec<NameNode>,
    empty: ArtifactSet,
    variant_labels: Vec<String>,
    variant_ids: FnvHashMap<String, VariantId>,
}

impl NameTrie {
    pub fn new(interner: &SetInterner) -> Self {
        let mut variant_ids = FnvHashMap::default();
        variant_ids.insert(String::new(), VariantId::DEFAULT);
        Self {
            nodes: vec![NameNode::new(None, None, interner.empty())],
            empty: interner.empty(),
            variant_labels: vec![String::new()],
            variant_ids,
        }
    }

    pub fn root(&self) -> NameId {
        NameId(0)
    }

    /// Number of nodes, root included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when only the root exists
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    pub fn get(&self, id: NameId) -> Result<&NameNode> {
        self.nodes.get(id.index()).ok_or(ModelError::UnknownName(id))
    }

    fn get_mut(&mut self, id: NameId) -> Result<&mut NameNode> {
        self.nodes
            .get_mut(id.index())
            .ok_or(ModelError::UnknownName(id))
    }

    /// Resolve a dotted name without creating nodes
    pub fn lookup(&self, fqn: &str) -> Option<NameId> {
        let mut current = self.root();
        for segment in fqn.split(SEPARATOR) {
            current = *self.nodes[current.index()].children.get(segment)?;
        }
        Some(current)
    }

    /// Resolve a dotted name, creating missing nodes along the way
    ///
    /// Returns `None` for an empty name or a name with an empty segment.
    pub fn insert(&mut self, fqn: &str) -> Option<NameId> {
        if fqn.is_empty() || fqn.split(SEPARATOR).any(str::is_empty) {
            return None;
        }

        let mut current = self.root();
        for segment in fqn.split(SEPARATOR) {
            let existing = self.nodes[current.index()].children.get(segment).copied();
            current = match existing {
                Some(child) => child,
                None => {
                    let child = NameId(self.nodes.len() as u32);
                    self.nodes.push(NameNode::new(
                        Some(segment.to_string()),
                        Some(current),
                        self.empty.clone(),
                    ));
                    self.nodes[current.index()]
                        .children
                        .insert(segment.to_string(), child);
                    child
                }
            };
        }
        Some(current)
    }

    /// Intern a variant label
    pub fn variant(&mut self, label: &str) -> VariantId {
        if let Some(id) = self.variant_ids.get(label) {
            return *id;
        }
        let id = VariantId(self.variant_labels.len() as u32);
        self.variant_labels.push(label.to_string());
        self.variant_ids.insert(label.to_string(), id);
        id
    }

    pub fn variant_label(&self, id: VariantId) -> &str {
        self.variant_labels
            .get(id.0 as usize)
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// Record that `artifact` declares `name` with content `variant`
    ///
    /// Keeps the variant set, the union and every ancestor's aggregate in step.
    pub fn add_artifact(
        &mut self,
        interner: &mut SetInterner,
        name: NameId,
        variant: VariantId,
        artifact: ArtifactId,
    ) -> Result<()> {
        let node = self.get_mut(name)?;
        match node.variants.iter_mut().find(|(id, _)| *id == variant) {
            Some((_, set)) => *set = interner.add(set, artifact),
            None => {
                let set = interner.singleton(artifact);
                node.variants.push((variant, set));
            }
        }
        node.jars = interner.add(&node.jars, artifact);

        let mut current = Some(name);
        while let Some(id) = current {
            let node = self.get_mut(id)?;
            node.aggregate = interner.add(&node.aggregate, artifact);
            current = node.parent;
        }
        Ok(())
    }

    /// Dotted name of a node; empty for the root
    pub fn fqn(&self, id: NameId) -> Result<String> {
        let chain = self.ancestry(id)?;
        let mut fqn = String::new();
        for (i, node) in chain.iter().enumerate() {
            if i > 0 {
                fqn.push(SEPARATOR);
            }
            fqn.push_str(self.get(*node)?.segment().unwrap_or_default());
        }
        Ok(fqn)
    }

    /// Chain of nodes from the top-level segment down to `id` (root excluded)
    pub fn ancestry(&self, id: NameId) -> Result<Vec<NameId>> {
        let mut chain = Vec::new();
        let mut current = id;
        loop {
            let node = self.get(current)?;
            match node.parent {
                Some(parent) => {
                    chain.push(current);
                    current = parent;
                }
                None => break,
            }
        }
        chain.reverse();
        Ok(chain)
    }

    /// Package of a name (its parent node); the root for top-level names
    pub fn package_of(&self, id: NameId) -> Result<NameId> {
        Ok(self.get(id)?.parent.unwrap_or_else(|| self.root()))
    }

    /// Children-before-parent traversal starting at the root
    pub fn post_order(&self) -> PostOrder<'_> {
        self.post_order_from(self.root())
    }

    pub fn post_order_from(&self, start: NameId) -> PostOrder<'_> {
        PostOrder {
            trie: self,
            stack: vec![(start, false)],
        }
    }
}

/// Iterator produced by [`NameTrie::post_order`]
pub struct PostOrder<'a> {
    trie: &'a NameTrie,
    stack: Vec<(NameId, bool)>,
}

impl Iterator for PostOrder<'_> {
    type Item = NameId;

    fn next(&mut self) -> Option<NameId> {
        while let Some((id, expanded)) = self.stack.pop() {
            if expanded {
                return Some(id);
            }
            let node = self.trie.nodes.get(id.index())?;
            self.stack.push((id, true));
            for child in node.children().rev() {
                self.stack.push((child, false));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trie_with(names: &[&str]) -> (NameTrie, SetInterner) {
        let mut interner = SetInterner::new();
        let mut trie = NameTrie::new(&interner);
        for (i, name) in names.iter().enumerate() {
            let id = trie.insert(name).unwrap();
            trie.add_artifact(&mut interner, id, VariantId::DEFAULT, ArtifactId::new(i as u32))
                .unwrap();
        }
        (trie, interner)
    }

    #[test]
    fn test_insert_and_lookup() {
        let (trie, _) = trie_with(&["org.foo.A", "org.foo.B", "org.bar.C"]);
        let a = trie.lookup("org.foo.A").unwrap();
        assert_eq!(trie.fqn(a).unwrap(), "org.foo.A");
        assert!(trie.lookup("org.foo.Z").is_none());
        // root + org + foo + bar + A + B + C
        assert_eq!(trie.len(), 7);
    }

    #[test]
    fn test_invalid_names_rejected() {
        let interner = SetInterner::new();
        let mut trie = NameTrie::new(&interner);
        assert!(trie.insert("").is_none());
        assert!(trie.insert("org..A").is_none());
        assert!(trie.insert(".A").is_none());
        assert!(trie.is_empty());
    }

    #[test]
    fn test_post_order_visits_children_first() {
        let (trie, _) = trie_with(&["p.B", "p.A", "q"]);
        let order: Vec<String> = trie
            .post_order()
            .map(|id| trie.fqn(id).unwrap())
            .collect();
        assert_eq!(order, vec!["p.A", "p.B", "p", "q", ""]);
    }

    #[test]
    fn test_aggregate_includes_subtree() {
        let (trie, _) = trie_with(&["p.A", "p.q.B"]);
        let p = trie.lookup("p").unwrap();
        let node = trie.get(p).unwrap();
        assert!(!node.is_declared());
        assert_eq!(node.aggregate_jars().len(), 2);
        assert_eq!(trie.get(trie.root()).unwrap().aggregate_jars().len(), 2);
    }

    #[test]
    fn test_variants_tracked_separately() {
        let mut interner = SetInterner::new();
        let mut trie = NameTrie::new(&interner);
        let name = trie.insert("p.A").unwrap();
        let v1 = trie.variant("fp-1");
        let v2 = trie.variant("fp-2");
        trie.add_artifact(&mut interner, name, v1, ArtifactId::new(0)).unwrap();
        trie.add_artifact(&mut interner, name, v2, ArtifactId::new(1)).unwrap();
        trie.add_artifact(&mut interner, name, v1, ArtifactId::new(2)).unwrap();

        let node = trie.get(name).unwrap();
        assert_eq!(node.variant_count(), 2);
        assert_eq!(node.jars().len(), 3);
        assert_eq!(node.variant_of(ArtifactId::new(1)), Some(v2));
        assert_eq!(node.variant_of(ArtifactId::new(2)), Some(v1));
        assert_eq!(trie.variant_label(v2), "fp-2");
    }

    #[test]
    fn test_ancestry_and_package() {
        let (trie, _) = trie_with(&["a.b.C", "D"]);
        let c = trie.lookup("a.b.C").unwrap();
        let chain: Vec<String> = trie
            .ancestry(c)
            .unwrap()
            .into_iter()
            .map(|id| trie.fqn(id).unwrap())
            .collect();
        assert_eq!(chain, vec!["a", "a.b", "a.b.C"]);
        assert_eq!(trie.package_of(c).unwrap(), trie.lookup("a.b").unwrap());

        let d = trie.lookup("D").unwrap();
        assert_eq!(trie.package_of(d).unwrap(), trie.root());
    }

    #[test]
    fn test_unknown_name_is_model_error() {
        let (trie, _) = trie_with(&["p.A"]);
        let bogus = NameId(99);
        assert_eq!(trie.get(bogus).unwrap_err(), ModelError::UnknownName(bogus));
    }
}
