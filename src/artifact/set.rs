//! Interned, immutable artifact sets
//!
//! Every `ArtifactSet` is produced by a [`SetInterner`]. The interner keeps one
//! shared allocation per distinct membership, so two sets with the same
//! members are always the same instance and equality is a pointer compare.
//!
//! Members are stored sorted by [`ArtifactId`], which lets intersection and
//! subset checks run as a single linear merge without allocating.

use super::ArtifactId;
use fnv::FnvHashSet;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Immutable set of artifacts, interned by membership
///
/// Sets are only comparable with sets handed out by the same interner.
#[derive(Clone)]
pub struct ArtifactSet {
    members: Arc<[ArtifactId]>,
}

impl ArtifactSet {
    /// Number of artifacts in the set
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, artifact: ArtifactId) -> bool {
        self.members.binary_search(&artifact).is_ok()
    }

    /// Iterate members in ascending id order
    pub fn iter(&self) -> impl Iterator<Item = ArtifactId> + '_ {
        self.members.iter().copied()
    }

    pub fn as_slice(&self) -> &[ArtifactId] {
        &self.members
    }

    /// Identity comparison (same interned instance)
    pub fn is_same(&self, other: &ArtifactSet) -> bool {
        Arc::ptr_eq(&self.members, &other.members)
    }

    /// Count the shared members without materializing the intersection
    pub fn intersection_size(&self, other: &ArtifactSet) -> usize {
        if self.is_same(other) {
            return self.len();
        }

        let (mut a, mut b) = (self.members.iter(), other.members.iter());
        let (mut x, mut y) = (a.next(), b.next());
        let mut count = 0;
        while let (Some(l), Some(r)) = (x, y) {
            match l.cmp(r) {
                Ordering::Less => x = a.next(),
                Ordering::Greater => y = b.next(),
                Ordering::Equal => {
                    count += 1;
                    x = a.next();
                    y = b.next();
                }
            }
        }
        count
    }

    /// True when the two sets share at least one artifact
    pub fn intersects(&self, other: &ArtifactSet) -> bool {
        if self.is_same(other) {
            return !self.is_empty();
        }

        let (mut a, mut b) = (self.members.iter(), other.members.iter());
        let (mut x, mut y) = (a.next(), b.next());
        while let (Some(l), Some(r)) = (x, y) {
            match l.cmp(r) {
                Ordering::Less => x = a.next(),
                Ordering::Greater => y = b.next(),
                Ordering::Equal => return true,
            }
        }
        false
    }

    /// Is every member of `self` also in `other`?
    pub fn is_subset(&self, other: &ArtifactSet) -> bool {
        if self.is_same(other) {
            return true;
        }
        if self.len() > other.len() {
            return false;
        }
        self.intersection_size(other) == self.len()
    }
}

impl PartialEq for ArtifactSet {
    fn eq(&self, other: &Self) -> bool {
        self.is_same(other)
    }
}

impl Eq for ArtifactSet {}

impl Hash for ArtifactSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.members) as *const ArtifactId as usize).hash(state);
    }
}

impl fmt::Debug for ArtifactSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.members.iter()).finish()
    }
}

impl<'a> IntoIterator for &'a ArtifactSet {
    type Item = ArtifactId;
    type IntoIter = std::iter::Copied<std::slice::Iter<'a, ArtifactId>>;

    fn into_iter(self) -> Self::IntoIter {
        self.members.iter().copied()
    }
}

/// Interning statistics
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct InternerStats {
    /// Number of intern requests that reached the table
    pub lookups: usize,
    /// Requests answered by an existing set
    pub hits: usize,
}

/// The run-scoped interning table for [`ArtifactSet`]s
///
/// Created when a corpus is loaded and dropped with it. Not synchronized:
/// sharding Stage 1 across threads would need one interner per shard or a
/// lock around this table.
#[derive(Debug)]
pub struct SetInterner {
    sets: FnvHashSet<Arc<[ArtifactId]>>,
    empty: ArtifactSet,
    stats: InternerStats,
}

impl Default for SetInterner {
    fn default() -> Self {
        Self::new()
    }
}

impl SetInterner {
    pub fn new() -> Self {
        let empty: Arc<[ArtifactId]> = Arc::from(Vec::new());
        let mut sets = FnvHashSet::default();
        sets.insert(Arc::clone(&empty));
        Self {
            sets,
            empty: ArtifactSet { members: empty },
            stats: InternerStats::default(),
        }
    }

    /// The empty set
    pub fn empty(&self) -> ArtifactSet {
        self.empty.clone()
    }

    pub fn singleton(&mut self, artifact: ArtifactId) -> ArtifactSet {
        self.intern_sorted(vec![artifact])
    }

    /// Intern an arbitrary collection of artifacts
    pub fn from_members<I>(&mut self, members: I) -> ArtifactSet
    where
        I: IntoIterator<Item = ArtifactId>,
    {
        let mut members: Vec<ArtifactId> = members.into_iter().collect();
        members.sort_unstable();
        members.dedup();
        self.intern_sorted(members)
    }

    /// `set` plus one artifact
    pub fn add(&mut self, set: &ArtifactSet, artifact: ArtifactId) -> ArtifactSet {
        match set.members.binary_search(&artifact) {
            Ok(_) => set.clone(),
            Err(pos) => {
                let mut members = Vec::with_capacity(set.len() + 1);
                members.extend_from_slice(&set.members[..pos]);
                members.push(artifact);
                members.extend_from_slice(&set.members[pos..]);
                self.intern_sorted(members)
            }
        }
    }

    /// Interned union of two sets
    pub fn merge(&mut self, one: &ArtifactSet, two: &ArtifactSet) -> ArtifactSet {
        if two.is_subset(one) {
            return one.clone();
        }
        if one.is_subset(two) {
            return two.clone();
        }

        let mut members = Vec::with_capacity(one.len() + two.len());
        let (mut a, mut b) = (one.members.iter().peekable(), two.members.iter().peekable());
        loop {
            match (a.peek(), b.peek()) {
                (Some(&&l), Some(&&r)) => match l.cmp(&r) {
                    Ordering::Less => {
                        members.push(l);
                        a.next();
                    }
                    Ordering::Greater => {
                        members.push(r);
                        b.next();
                    }
                    Ordering::Equal => {
                        members.push(l);
                        a.next();
                        b.next();
                    }
                },
                (Some(&&l), None) => {
                    members.push(l);
                    a.next();
                }
                (None, Some(&&r)) => {
                    members.push(r);
                    b.next();
                }
                (None, None) => break,
            }
        }
        self.intern_sorted(members)
    }

    /// Number of distinct sets currently interned (including the empty set)
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    pub fn stats(&self) -> InternerStats {
        self.stats
    }

    fn intern_sorted(&mut self, members: Vec<ArtifactId>) -> ArtifactSet {
        self.stats.lookups += 1;
        if let Some(existing) = self.sets.get(members.as_slice()) {
            self.stats.hits += 1;
            return ArtifactSet {
                members: Arc::clone(existing),
            };
        }
        let members: Arc<[ArtifactId]> = Arc::from(members);
        self.sets.insert(Arc::clone(&members));
        ArtifactSet { members }
    }
}
