//! # Triple Store
//!
//! The storage contract of the engine and its in-memory implementation.
//!
//! Every backend keeps four access paths besides the primary triple table:
//! subject, object, predicate and (predicate, object). Each indexed lookup
//! costs time proportional to the number of matching triples, never to the
//! size of the store. All enumerations are in ascending `TripleId`
//! (insertion order) so traversal output is reproducible.

use crate::{Triple, TripleId, TripathError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// TRIPLESTORE TRAIT
// =============================================================================

/// The storage operations the engine needs from a backend.
///
/// Triples handed to a store must already be normalized by the
/// [`Ingestor`](crate::Ingestor). All methods return `Result` so the in-memory
/// and persistent backends share one interface.
pub trait TripleStore {
    /// Insert a triple if absent. Returns `true` if it was new.
    fn insert_triple(&mut self, triple: &Triple) -> Result<bool, TripathError>;

    /// Insert many triples. Returns how many were new.
    ///
    /// Backends with transactions override this to write in one commit.
    fn insert_batch(&mut self, triples: &[Triple]) -> Result<usize, TripathError> {
        let mut added = 0;
        for triple in triples {
            if self.insert_triple(triple)? {
                added += 1;
            }
        }
        Ok(added)
    }

    /// Remove a triple from every index. Returns `true` if it existed.
    fn remove_triple(&mut self, triple: &Triple) -> Result<bool, TripathError>;

    /// Remove every triple.
    fn clear(&mut self) -> Result<(), TripathError>;

    /// Whether the exact triple is stored.
    fn contains_triple(&self, triple: &Triple) -> Result<bool, TripathError>;

    /// Whether the node appears in at least one stored triple.
    fn contains_node(&self, node: &str) -> Result<bool, TripathError>;

    /// Triples whose subject is `node`.
    fn triples_by_subject(&self, node: &str) -> Result<Vec<Triple>, TripathError>;

    /// Triples whose object is `node`.
    fn triples_by_object(&self, node: &str) -> Result<Vec<Triple>, TripathError>;

    /// Triples labeled `predicate`.
    fn triples_by_predicate(&self, predicate: &str) -> Result<Vec<Triple>, TripathError>;

    /// Triples labeled `predicate` whose object is `object`.
    fn triples_by_predicate_object(
        &self,
        predicate: &str,
        object: &str,
    ) -> Result<Vec<Triple>, TripathError>;

    /// Up to `limit` triples in insertion order.
    fn scan_triples(&self, limit: usize) -> Result<Vec<Triple>, TripathError>;

    /// Up to `limit` distinct nodes in order of first appearance.
    fn scan_nodes(&self, limit: usize) -> Result<Vec<String>, TripathError>;

    /// Number of stored triples.
    fn triple_count(&self) -> Result<usize, TripathError>;

    /// Number of distinct nodes.
    fn node_count(&self) -> Result<usize, TripathError>;
}

// =============================================================================
// NODE REGISTRY
// =============================================================================

/// Bookkeeping for one node: when it first appeared and how many triple
/// endpoints mention it. A node is dropped when `refs` reaches zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct NodeEntry {
    seq: u64,
    refs: u64,
}

// =============================================================================
// MEMORY STORE
// =============================================================================

/// In-memory triple store.
///
/// Uses `BTreeMap` exclusively for deterministic ordering.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    /// Primary table: TripleId -> Triple
    triples: BTreeMap<TripleId, Triple>,

    /// Dedup lookup: Triple -> TripleId
    ids: BTreeMap<Triple, TripleId>,

    /// subject -> triples
    by_subject: BTreeMap<String, BTreeSet<TripleId>>,

    /// object -> triples
    by_object: BTreeMap<String, BTreeSet<TripleId>>,

    /// predicate -> object -> triples
    by_predicate: BTreeMap<String, BTreeMap<String, BTreeSet<TripleId>>>,

    /// First-appearance order of live nodes: seq -> name
    node_order: BTreeMap<u64, String>,

    /// name -> (seq, reference count)
    nodes: BTreeMap<String, NodeEntry>,

    next_triple_id: u64,
    next_node_seq: u64,
}

impl MemoryStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store by inserting triples in the given order.
    #[must_use]
    pub fn from_triples(triples: impl IntoIterator<Item = Triple>) -> Self {
        let mut store = Self::new();
        for triple in triples {
            store.insert_internal(triple);
        }
        store
    }

    /// All triples in insertion order.
    pub fn triples(&self) -> impl Iterator<Item = &Triple> {
        self.triples.values()
    }

    fn insert_internal(&mut self, triple: Triple) -> bool {
        if self.ids.contains_key(&triple) {
            return false;
        }

        let id = TripleId(self.next_triple_id);
        self.next_triple_id = self.next_triple_id.saturating_add(1);

        self.retain_node(&triple.subject);
        self.retain_node(&triple.object);

        self.by_subject
            .entry(triple.subject.clone())
            .or_default()
            .insert(id);
        self.by_object
            .entry(triple.object.clone())
            .or_default()
            .insert(id);
        self.by_predicate
            .entry(triple.predicate.clone())
            .or_default()
            .entry(triple.object.clone())
            .or_default()
            .insert(id);

        self.ids.insert(triple.clone(), id);
        self.triples.insert(id, triple);
        true
    }

    fn retain_node(&mut self, node: &str) {
        if let Some(entry) = self.nodes.get_mut(node) {
            entry.refs = entry.refs.saturating_add(1);
            return;
        }
        let seq = self.next_node_seq;
        self.next_node_seq = self.next_node_seq.saturating_add(1);
        self.nodes.insert(node.to_string(), NodeEntry { seq, refs: 1 });
        self.node_order.insert(seq, node.to_string());
    }

    fn release_node(&mut self, node: &str) {
        let Some(entry) = self.nodes.get_mut(node) else {
            return;
        };
        entry.refs = entry.refs.saturating_sub(1);
        if entry.refs == 0 {
            let seq = entry.seq;
            self.nodes.remove(node);
            self.node_order.remove(&seq);
        }
    }

    fn resolve<'a>(&self, ids: impl IntoIterator<Item = &'a TripleId>) -> Vec<Triple> {
        ids.into_iter()
            .filter_map(|id| self.triples.get(id).cloned())
            .collect()
    }
}

/// Remove `id` from the set under `key`, dropping the key once empty.
fn unindex(index: &mut BTreeMap<String, BTreeSet<TripleId>>, key: &str, id: TripleId) {
    if let Some(set) = index.get_mut(key) {
        set.remove(&id);
        if set.is_empty() {
            index.remove(key);
        }
    }
}

impl TripleStore for MemoryStore {
    fn insert_triple(&mut self, triple: &Triple) -> Result<bool, TripathError> {
        Ok(self.insert_internal(triple.clone()))
    }

    fn remove_triple(&mut self, triple: &Triple) -> Result<bool, TripathError> {
        let Some(id) = self.ids.remove(triple) else {
            return Ok(false);
        };
        self.triples.remove(&id);

        unindex(&mut self.by_subject, &triple.subject, id);
        unindex(&mut self.by_object, &triple.object, id);
        if let Some(objects) = self.by_predicate.get_mut(&triple.predicate) {
            unindex(objects, &triple.object, id);
            if objects.is_empty() {
                self.by_predicate.remove(&triple.predicate);
            }
        }

        self.release_node(&triple.subject);
        self.release_node(&triple.object);
        Ok(true)
    }

    fn clear(&mut self) -> Result<(), TripathError> {
        *self = Self::new();
        Ok(())
    }

    fn contains_triple(&self, triple: &Triple) -> Result<bool, TripathError> {
        Ok(self.ids.contains_key(triple))
    }

    fn contains_node(&self, node: &str) -> Result<bool, TripathError> {
        Ok(self.nodes.contains_key(node))
    }

    fn triples_by_subject(&self, node: &str) -> Result<Vec<Triple>, TripathError> {
        Ok(self
            .by_subject
            .get(node)
            .map(|ids| self.resolve(ids))
            .unwrap_or_default())
    }

    fn triples_by_object(&self, node: &str) -> Result<Vec<Triple>, TripathError> {
        Ok(self
            .by_object
            .get(node)
            .map(|ids| self.resolve(ids))
            .unwrap_or_default())
    }

    fn triples_by_predicate(&self, predicate: &str) -> Result<Vec<Triple>, TripathError> {
        let Some(objects) = self.by_predicate.get(predicate) else {
            return Ok(Vec::new());
        };
        // Merge the per-object sets back into insertion order.
        let ids: BTreeSet<TripleId> = objects.values().flatten().copied().collect();
        Ok(self.resolve(&ids))
    }

    fn triples_by_predicate_object(
        &self,
        predicate: &str,
        object: &str,
    ) -> Result<Vec<Triple>, TripathError> {
        Ok(self
            .by_predicate
            .get(predicate)
            .and_then(|objects| objects.get(object))
            .map(|ids| self.resolve(ids))
            .unwrap_or_default())
    }

    fn scan_triples(&self, limit: usize) -> Result<Vec<Triple>, TripathError> {
        Ok(self.triples.values().take(limit).cloned().collect())
    }

    fn scan_nodes(&self, limit: usize) -> Result<Vec<String>, TripathError> {
        Ok(self.node_order.values().take(limit).cloned().collect())
    }

    fn triple_count(&self) -> Result<usize, TripathError> {
        Ok(self.triples.len())
    }

    fn node_count(&self) -> Result<usize, TripathError> {
        Ok(self.nodes.len())
    }
}

// =============================================================================
// SERIALIZABLE STORE
// =============================================================================

/// Serializable form of a `MemoryStore`: its triples in insertion order.
///
/// Loading re-inserts them in the same order, so enumeration order survives
/// a save/load cycle even though `TripleId`s are renumbered densely.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SerializableStore {
    pub triples: Vec<Triple>,
}

impl From<&MemoryStore> for SerializableStore {
    fn from(store: &MemoryStore) -> Self {
        Self {
            triples: store.triples().cloned().collect(),
        }
    }
}

impl From<SerializableStore> for MemoryStore {
    fn from(s: SerializableStore) -> Self {
        MemoryStore::from_triples(s.triples)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str, p: &str, o: &str) -> Triple {
        Triple::new(s, p, o)
    }

    fn social() -> MemoryStore {
        MemoryStore::from_triples([
            t("alice", "follows", "bob"),
            t("bob", "follows", "charlie"),
            t("alice", "likes", "python"),
            t("charlie", "likes", "python"),
        ])
    }

    #[test]
    fn duplicate_insert_is_noop() {
        let mut store = MemoryStore::new();
        assert!(store.insert_triple(&t("a", "x", "b")).expect("insert"));
        assert!(!store.insert_triple(&t("a", "x", "b")).expect("insert"));
        assert_eq!(store.triple_count().expect("count"), 1);
        assert_eq!(store.node_count().expect("count"), 2);
    }

    #[test]
    fn indexes_answer_each_access_path() {
        let store = social();

        let out = store.triples_by_subject("alice").expect("subject");
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].object, "bob");
        assert_eq!(out[1].object, "python");

        let inc = store.triples_by_object("python").expect("object");
        let subjects: Vec<_> = inc.iter().map(|t| t.subject.as_str()).collect();
        assert_eq!(subjects, vec!["alice", "charlie"]);

        assert_eq!(store.triples_by_predicate("follows").expect("pred").len(), 2);
        assert_eq!(
            store
                .triples_by_predicate_object("likes", "python")
                .expect("pred-obj")
                .len(),
            2
        );
        assert!(store.triples_by_subject("nobody").expect("missing").is_empty());
    }

    #[test]
    fn predicate_lookup_keeps_insertion_order_across_objects() {
        let store = MemoryStore::from_triples([
            t("a", "x", "z"),
            t("b", "x", "a"),
            t("c", "x", "m"),
        ]);
        let objects: Vec<_> = store
            .triples_by_predicate("x")
            .expect("pred")
            .into_iter()
            .map(|t| t.object)
            .collect();
        assert_eq!(objects, vec!["z", "a", "m"]);
    }

    #[test]
    fn remove_unindexes_everywhere() {
        let mut store = social();
        assert!(store.remove_triple(&t("alice", "follows", "bob")).expect("remove"));
        assert!(!store.remove_triple(&t("alice", "follows", "bob")).expect("again"));

        assert_eq!(store.triples_by_subject("alice").expect("s").len(), 1);
        assert!(store.triples_by_object("bob").expect("o").is_empty());
        assert_eq!(store.triples_by_predicate("follows").expect("p").len(), 1);
        // bob still appears in (bob, follows, charlie)
        assert!(store.contains_node("bob").expect("node"));
    }

    #[test]
    fn node_disappears_with_last_triple() {
        let mut store = MemoryStore::from_triples([t("a", "x", "b")]);
        store.remove_triple(&t("a", "x", "b")).expect("remove");
        assert!(!store.contains_node("a").expect("a"));
        assert_eq!(store.node_count().expect("count"), 0);
        assert!(store.scan_nodes(10).expect("scan").is_empty());
    }

    #[test]
    fn scans_are_bounded_and_ordered() {
        let store = social();
        assert_eq!(
            store.scan_nodes(3).expect("nodes"),
            vec!["alice", "bob", "charlie"]
        );
        assert_eq!(store.scan_nodes(100).expect("nodes").len(), 4);
        assert_eq!(store.scan_triples(1).expect("edges"), vec![t("alice", "follows", "bob")]);
        assert!(store.scan_triples(0).expect("zero").is_empty());
    }

    #[test]
    fn clear_empties_everything() {
        let mut store = social();
        store.clear().expect("clear");
        assert_eq!(store.triple_count().expect("count"), 0);
        assert_eq!(store.node_count().expect("count"), 0);
        assert!(store.triples_by_predicate("likes").expect("pred").is_empty());
    }

    #[test]
    fn serializable_roundtrip_preserves_order() {
        let store = social();
        let restored = MemoryStore::from(SerializableStore::from(&store));
        assert_eq!(
            restored.scan_triples(10).expect("scan"),
            store.scan_triples(10).expect("scan")
        );
    }
}
