//! The rights graph: the set of (subject, object, kind) edges.
//!
//! This is a pure data structure. Durable backends keep their own copy of the
//! edge set, but the in-memory store uses this type directly and tests use it
//! to check graph invariants on snapshots taken from any backend.

use std::collections::{BTreeMap, BTreeSet};

use crate::right::{Right, RightKind};
use crate::types::{ObjectId, PrincipalId};

/// Outcome of an insert that is conditional on other edges existing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardedInsert {
    /// All guards held and the edge was added.
    Inserted,
    /// All guards held and the edge was already present.
    AlreadyExists,
    /// The guard at this index was missing; nothing was written.
    MissingGuard(usize),
}

impl GuardedInsert {
    /// Whether the requested edge exists after the operation.
    pub fn edge_present(&self) -> bool {
        matches!(self, GuardedInsert::Inserted | GuardedInsert::AlreadyExists)
    }
}

/// The authorization graph as a set of edges.
///
/// Duplicate edges cannot exist: the set is keyed by the full triple.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RightsGraph {
    /// All edges, ordered by (subject, object, kind).
    edges: BTreeSet<Right>,

    /// Index: object -> edges on that object.
    by_object: BTreeMap<ObjectId, BTreeSet<Right>>,
}

impl RightsGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from a list of edges, collapsing duplicates.
    pub fn from_edges(edges: impl IntoIterator<Item = Right>) -> Self {
        let mut graph = Self::new();
        for edge in edges {
            graph.insert_edge(edge);
        }
        graph
    }

    /// Whether `subject` holds `kind` on `object`.
    pub fn has_right(&self, subject: PrincipalId, object: ObjectId, kind: RightKind) -> bool {
        self.contains(&Right::new(subject, object, kind))
    }

    /// Whether the exact edge is present.
    pub fn contains(&self, edge: &Right) -> bool {
        self.edges.contains(edge)
    }

    /// Add an edge. Returns `false` if it was already present.
    pub fn insert_edge(&mut self, edge: Right) -> bool {
        if !self.edges.insert(edge) {
            return false;
        }
        self.by_object.entry(edge.object).or_default().insert(edge);
        true
    }

    /// Insert `edge` only if every edge in `guards` is present.
    ///
    /// Guards are checked in order; the first missing one is reported.
    pub fn insert_guarded(&mut self, guards: &[Right], edge: Right) -> GuardedInsert {
        if let Some(missing) = guards.iter().position(|g| !self.contains(g)) {
            return GuardedInsert::MissingGuard(missing);
        }
        if self.insert_edge(edge) {
            GuardedInsert::Inserted
        } else {
            GuardedInsert::AlreadyExists
        }
    }

    /// Remove every edge on `object`. Returns how many were removed.
    pub fn remove_object(&mut self, object: ObjectId) -> usize {
        let Some(edges) = self.by_object.remove(&object) else {
            return 0;
        };
        for edge in &edges {
            self.edges.remove(edge);
        }
        edges.len()
    }

    /// Remove every edge held by `subject`. Returns how many were removed.
    pub fn remove_subject(&mut self, subject: PrincipalId) -> usize {
        let doomed: Vec<Right> = self.edges_for_subject(subject);
        for edge in &doomed {
            self.edges.remove(edge);
            if let Some(set) = self.by_object.get_mut(&edge.object) {
                set.remove(edge);
                if set.is_empty() {
                    self.by_object.remove(&edge.object);
                }
            }
        }
        doomed.len()
    }

    /// All edges on an object, ordered by subject then kind.
    pub fn edges_for_object(&self, object: ObjectId) -> Vec<Right> {
        self.by_object
            .get(&object)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// All edges held by a subject, ordered by object then kind.
    pub fn edges_for_subject(&self, subject: PrincipalId) -> Vec<Right> {
        let lo = Right::new(subject, ObjectId(i64::MIN), RightKind::Read);
        let hi = Right::new(subject, ObjectId(i64::MAX), RightKind::Take);
        self.edges.range(lo..=hi).copied().collect()
    }

    /// Kinds `subject` holds on `object`.
    pub fn kinds_held(&self, subject: PrincipalId, object: ObjectId) -> BTreeSet<RightKind> {
        RightKind::ALL
            .into_iter()
            .filter(|k| self.has_right(subject, object, *k))
            .collect()
    }

    /// Iterate over all edges in order.
    pub fn iter(&self) -> impl Iterator<Item = &Right> {
        self.edges.iter()
    }

    /// Number of edges.
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Whether the graph has no edges.
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

/// Whether a raw edge listing (as returned by a store) contains duplicates.
///
/// A correct store never returns any; this exists for invariant checks.
pub fn has_duplicate_edges(edges: &[Right]) -> bool {
    let mut seen = BTreeSet::new();
    edges.iter().any(|e| !seen.insert(*e))
}

#[cfg(test)]
mod tests {
    use super::*;

    const U1: PrincipalId = PrincipalId(1);
    const U2: PrincipalId = PrincipalId(2);
    const O1: ObjectId = ObjectId(10);
    const O2: ObjectId = ObjectId(11);

    #[test]
    fn test_insert_and_has_right() {
        let mut graph = RightsGraph::new();
        assert!(graph.insert_edge(Right::new(U1, O1, RightKind::Read)));
        assert!(graph.has_right(U1, O1, RightKind::Read));
        assert!(!graph.has_right(U1, O1, RightKind::Write));
        assert!(!graph.has_right(U2, O1, RightKind::Read));
    }

    #[test]
    fn test_duplicate_insert_is_rejected() {
        let mut graph = RightsGraph::new();
        let edge = Right::new(U1, O1, RightKind::Take);
        assert!(graph.insert_edge(edge));
        assert!(!graph.insert_edge(edge));
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.edges_for_object(O1), vec![edge]);
    }

    #[test]
    fn test_guarded_insert_reports_first_missing_guard() {
        let mut graph = RightsGraph::from_edges(Right::owner_seed(U1, O1));

        let outcome = graph.insert_guarded(
            &[
                Right::new(U2, O1, RightKind::Take),
                Right::new(U1, O1, RightKind::Write),
            ],
            Right::new(U2, O1, RightKind::Write),
        );
        assert_eq!(outcome, GuardedInsert::MissingGuard(0));
        assert!(!graph.has_right(U2, O1, RightKind::Write));

        let outcome = graph.insert_guarded(
            &[Right::new(U1, O1, RightKind::Read)],
            Right::new(U2, O1, RightKind::Read),
        );
        assert_eq!(outcome, GuardedInsert::Inserted);

        let outcome = graph.insert_guarded(
            &[Right::new(U1, O1, RightKind::Read)],
            Right::new(U2, O1, RightKind::Read),
        );
        assert_eq!(outcome, GuardedInsert::AlreadyExists);
        assert!(outcome.edge_present());
    }

    #[test]
    fn test_remove_object_cascades() {
        let mut graph = RightsGraph::from_edges(Right::owner_seed(U1, O1));
        graph.insert_edge(Right::new(U2, O1, RightKind::Read));
        graph.insert_edge(Right::new(U2, O2, RightKind::Read));

        assert_eq!(graph.remove_object(O1), 4);
        assert_eq!(graph.len(), 1);
        assert!(graph.edges_for_object(O1).is_empty());
        assert_eq!(graph.remove_object(O1), 0);
    }

    #[test]
    fn test_remove_subject_keeps_other_subjects() {
        let mut graph = RightsGraph::from_edges(Right::owner_seed(U1, O1));
        graph.insert_edge(Right::new(U2, O1, RightKind::Read));
        graph.insert_edge(Right::new(U2, O2, RightKind::Write));

        assert_eq!(graph.remove_subject(U2), 2);
        assert_eq!(graph.len(), 3);
        assert!(graph.edges_for_subject(U2).is_empty());
        assert_eq!(graph.edges_for_object(O1).len(), 3);
        assert!(graph.edges_for_object(O2).is_empty());
    }

    #[test]
    fn test_kinds_held() {
        let mut graph = RightsGraph::new();
        graph.insert_edge(Right::new(U2, O1, RightKind::Read));
        graph.insert_edge(Right::new(U2, O1, RightKind::Take));
        let kinds: Vec<_> = graph.kinds_held(U2, O1).into_iter().collect();
        assert_eq!(kinds, vec![RightKind::Read, RightKind::Take]);
    }

    #[test]
    fn test_has_duplicate_edges() {
        let e = Right::new(U1, O1, RightKind::Read);
        assert!(!has_duplicate_edges(&[e, e.copied_to(U2)]));
        assert!(has_duplicate_edges(&[e, e]));
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        fn edge() -> impl Strategy<Value = Right> {
            (1i64..5, 1i64..4, 0usize..3).prop_map(|(s, o, k)| {
                Right::new(PrincipalId(s), ObjectId(o), RightKind::ALL[k])
            })
        }

        proptest! {
            #[test]
            fn test_object_index_matches_edges(
                edges in prop::collection::vec(edge(), 0..40),
                doomed in 1i64..5,
            ) {
                let mut graph = RightsGraph::from_edges(edges.iter().copied());
                let all: Vec<Right> = graph.iter().copied().collect();
                prop_assert!(!has_duplicate_edges(&all));

                graph.remove_subject(PrincipalId(doomed));
                prop_assert!(graph.edges_for_subject(PrincipalId(doomed)).is_empty());

                let indexed: usize = (1i64..4)
                    .map(|o| graph.edges_for_object(ObjectId(o)).len())
                    .sum();
                prop_assert_eq!(indexed, graph.len());
            }
        }
    }
}
