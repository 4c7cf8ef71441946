//! # tripath-core
//!
//! Embedded triple store and path-query engine.
//!
//! Triples `(subject, predicate, object)` are stored with four access paths
//! (subject, object, predicate, predicate-object) and queried with chainable
//! pipelines in the style of `v("alice").out("follows").unique().limit(10)`.
//!
//! ## Architectural Constraints
//!
//! - Pure, synchronous Rust: no async, no network
//! - Deterministic: `BTreeMap` only, every enumeration in insertion order
//! - Absence is data: traversals from missing nodes return empty results
//! - Explicit handles: a [`Session`] per graph, a [`GraphRegistry`] for names

// =============================================================================
// MODULES
// =============================================================================

pub mod export;
pub mod formats;
pub mod ingestor;
pub mod primitives;
pub mod query;
pub mod registry;
pub mod scanner;
pub mod session;
pub mod storage;
pub mod store;
pub mod traversal;
pub mod types;
pub mod view;

// =============================================================================
// RE-EXPORTS: Core Types
// =============================================================================

pub use types::{
    Binding, Direction, ResultSet, ScanEntry, ScanKind, ScanResult, Triple, TripleId,
    TripathError,
};

// =============================================================================
// RE-EXPORTS: Engine
// =============================================================================

pub use export::{
    CanonicalGraph, CanonicalHeader, canonical_checksum, export_canonical, import_canonical,
    verify_canonical,
};
pub use ingestor::Ingestor;
pub use query::{ParsedQuery, Pipeline, Query, Seed, Step, Terminal, parse};
pub use registry::{BackendKind, GraphHandle, GraphRegistry, validate_graph_name};
pub use scanner::{GraphStats, Scanner};
pub use session::{Session, StorageBackend};
pub use storage::RedbStore;
pub use store::{MemoryStore, SerializableStore, TripleStore};
pub use traversal::{Materializer, QueryOutput};
pub use view::{View, ViewLink, ViewNode};

// =============================================================================
// RE-EXPORTS: Formats
// =============================================================================

pub use formats::{PersistenceHeader, store_from_bytes, store_to_bytes};

#[cfg(feature = "crypto-hash")]
pub use export::{canonical_crypto_hash, compute_blake3_hash};
