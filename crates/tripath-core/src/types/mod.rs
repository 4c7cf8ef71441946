//! # Core Type Definitions
//!
//! This module contains the shared vocabulary of the tripath engine:
//! - Triple identity and content (`TripleId`, `Triple`)
//! - Scan requests and listings (`ScanKind`, `ScanEntry`, `ScanResult`)
//! - Traversal output (`Binding`, `ResultSet`)
//! - Error types (`TripathError`)
//!
//! ## Determinism Guarantees
//!
//! All types in this module:
//! - Implement `Ord` where they are used as keys, for `BTreeMap`/`BTreeSet`
//! - Serialize tag maps in sorted key order
//! - Use integer identifiers that only ever grow

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// =============================================================================
// TRIPLE IDENTIFIERS
// =============================================================================

/// Insertion sequence number of a stored triple.
///
/// Assigned once, on first insertion. Every enumeration of edges in the
/// engine walks triples in ascending `TripleId`, i.e. insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TripleId(pub u64);

impl TripleId {
    /// Get the raw sequence number.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

// =============================================================================
// TRIPLE
// =============================================================================

/// A (subject, predicate, object) fact.
///
/// Also a directed edge `subject -> object` labeled `predicate`.
/// Stores expect triples that already went through
/// [`Ingestor::normalize`](crate::Ingestor::normalize).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Triple {
    pub subject: String,
    pub predicate: String,
    pub object: String,
}

impl Triple {
    /// Create a triple from raw terms (no normalization).
    #[must_use]
    pub fn new(
        subject: impl Into<String>,
        predicate: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
        }
    }

    /// The node on the given end of this edge.
    #[must_use]
    pub fn endpoint(&self, direction: Direction) -> &str {
        match direction {
            Direction::Out => &self.object,
            Direction::In => &self.subject,
        }
    }
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.subject, self.predicate, self.object)
    }
}

/// Direction of an edge hop during traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Follow edges where the current node is the subject.
    Out,
    /// Follow edges where the current node is the object.
    In,
}

// =============================================================================
// SCAN
// =============================================================================

/// What a scan enumerates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanKind {
    /// Distinct nodes, in order of first appearance.
    #[default]
    Node,
    /// Stored triples, in insertion order.
    Edge,
}

impl FromStr for ScanKind {
    type Err = TripathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "v" | "n" | "node" | "nodes" => Ok(Self::Node),
            "e" | "edge" | "edges" => Ok(Self::Edge),
            other => Err(TripathError::InvalidArgument(format!(
                "unknown scan kind '{}': use node or edge",
                other
            ))),
        }
    }
}

/// One entry of a scan listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScanEntry {
    Node { id: String },
    Edge(Triple),
}

/// Output of a scan. Always carries a `result` collection, possibly empty.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScanResult {
    pub result: Vec<ScanEntry>,
}

impl ScanResult {
    /// Listing of node names.
    #[must_use]
    pub fn nodes(names: Vec<String>) -> Self {
        Self {
            result: names.into_iter().map(|id| ScanEntry::Node { id }).collect(),
        }
    }

    /// Listing of triples.
    #[must_use]
    pub fn edges(triples: Vec<Triple>) -> Self {
        Self {
            result: triples.into_iter().map(ScanEntry::Edge).collect(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.result.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.result.is_empty()
    }
}

// =============================================================================
// BINDINGS & RESULT SETS
// =============================================================================

/// One in-progress traversal result.
///
/// Carries the current node plus every tag checkpoint recorded so far.
/// Serializes as `{"id": <node>, <tag>: <node>, ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    #[serde(rename = "id")]
    pub node: String,
    #[serde(flatten)]
    pub tags: BTreeMap<String, String>,
}

impl Binding {
    /// A binding with no tags.
    #[must_use]
    pub fn new(node: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            tags: BTreeMap::new(),
        }
    }

    /// Same tags, different current node.
    #[must_use]
    pub fn moved_to(&self, node: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            tags: self.tags.clone(),
        }
    }

    /// Value recorded under a tag, if any.
    #[must_use]
    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags.get(name).map(String::as_str)
    }
}

/// The materialized output of a pipeline.
///
/// Serializes as `{"result": [...]}`; an empty traversal is an empty list.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResultSet {
    pub result: Vec<Binding>,
}

impl ResultSet {
    #[must_use]
    pub fn new(result: Vec<Binding>) -> Self {
        Self { result }
    }

    /// Current-node values in result order.
    #[must_use]
    pub fn ids(&self) -> Vec<&str> {
        self.result.iter().map(|b| b.node.as_str()).collect()
    }

    /// Current-node values as a set (for order-independent comparisons).
    #[must_use]
    pub fn id_set(&self) -> BTreeSet<&str> {
        self.result.iter().map(|b| b.node.as_str()).collect()
    }

    /// Whether any result carries tag checkpoints.
    #[must_use]
    pub fn is_tagged(&self) -> bool {
        self.result.iter().any(|b| !b.tags.is_empty())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.result.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.result.is_empty()
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the tripath engine.
///
/// - Absent nodes are never an error: traversals return empty results
/// - Use `Result<T, TripathError>` for fallible operations
/// - The engine never panics; all errors are recoverable
#[derive(Debug, Error)]
pub enum TripathError {
    /// A triple, pipeline or name is malformed. Raised at build time.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A named graph was requested that was never created.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The underlying storage failed (redb, filesystem).
    #[error("Storage failure: {0}")]
    StorageFailure(String),

    /// Encoding or decoding a snapshot or export failed.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl TripathError {
    /// Shorthand for building an `InvalidArgument`.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_kind_parses_short_and_long_forms() {
        assert_eq!("e".parse::<ScanKind>().expect("e"), ScanKind::Edge);
        assert_eq!("Edges".parse::<ScanKind>().expect("edges"), ScanKind::Edge);
        assert_eq!("v".parse::<ScanKind>().expect("v"), ScanKind::Node);
        assert!(matches!(
            "both".parse::<ScanKind>(),
            Err(TripathError::InvalidArgument(_))
        ));
    }

    #[test]
    fn binding_serializes_tags_flat() {
        let mut binding = Binding::new("bob");
        binding.tags.insert("from".to_string(), "alice".to_string());

        let json = serde_json::to_value(&binding).expect("serialize");
        assert_eq!(json, serde_json::json!({"id": "bob", "from": "alice"}));

        let back: Binding = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back, binding);
    }

    #[test]
    fn empty_result_set_still_has_result_key() {
        let json = serde_json::to_string(&ResultSet::default()).expect("serialize");
        assert_eq!(json, r#"{"result":[]}"#);

        let json = serde_json::to_string(&ScanResult::default()).expect("serialize");
        assert_eq!(json, r#"{"result":[]}"#);
    }

    #[test]
    fn scan_entries_serialize_by_shape() {
        let scan = ScanResult {
            result: vec![
                ScanEntry::Node {
                    id: "alice".to_string(),
                },
                ScanEntry::Edge(Triple::new("alice", "follows", "bob")),
            ],
        };
        let json = serde_json::to_value(&scan).expect("serialize");
        assert_eq!(json["result"][0]["id"], "alice");
        assert_eq!(json["result"][1]["predicate"], "follows");
    }

    #[test]
    fn moved_binding_keeps_tags() {
        let mut binding = Binding::new("a");
        binding.tags.insert("start".to_string(), "a".to_string());
        let moved = binding.moved_to("b");
        assert_eq!(moved.node, "b");
        assert_eq!(moved.tag("start"), Some("a"));
    }

    #[test]
    fn triple_endpoint_follows_direction() {
        let t = Triple::new("a", "x", "b");
        assert_eq!(t.endpoint(Direction::Out), "b");
        assert_eq!(t.endpoint(Direction::In), "a");
    }
}
