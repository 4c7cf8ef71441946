//! # Session Module
//!
//! A `Session` is an explicit handle on one graph. It owns the storage
//! backend and exposes every graph operation: ingestion, scans, queries,
//! export. There is no process-wide "current graph"; callers pass the handle.
//!
//! ## Storage Backends
//!
//! - `InMemory`: `MemoryStore`, volatile
//! - `Snapshot`: `MemoryStore` rewritten to a snapshot file after every change
//! - `Persistent`: `RedbStore`, disk-backed ACID storage

use crate::export::{self, CanonicalGraph};
use crate::formats::persistence::{store_from_bytes, store_to_bytes};
use crate::ingestor::Ingestor;
use crate::query::{ParsedQuery, Pipeline, Query, Seed, parse};
use crate::scanner::{GraphStats, Scanner};
use crate::storage::RedbStore;
use crate::store::{MemoryStore, TripleStore};
use crate::traversal::{Materializer, QueryOutput};
use crate::view::View;
use crate::{ResultSet, ScanKind, ScanResult, Triple, TripathError};
use std::path::{Path, PathBuf};

/// Storage backend for a Session.
#[derive(Debug)]
pub enum StorageBackend {
    InMemory(MemoryStore),
    /// In-memory store mirrored to a snapshot file.
    Snapshot { store: MemoryStore, path: PathBuf },
    Persistent(RedbStore),
}

impl Default for StorageBackend {
    fn default() -> Self {
        Self::InMemory(MemoryStore::new())
    }
}

/// A handle on one graph.
#[derive(Debug, Default)]
pub struct Session {
    backend: StorageBackend,
}

impl Session {
    /// New empty in-memory session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_store(store: MemoryStore) -> Self {
        Self {
            backend: StorageBackend::InMemory(store),
        }
    }

    /// Open or create a redb database at `path`.
    pub fn with_redb(path: impl AsRef<Path>) -> Result<Self, TripathError> {
        Ok(Self {
            backend: StorageBackend::Persistent(RedbStore::open(path)?),
        })
    }

    /// Load the snapshot at `path` if it exists, else start empty.
    pub fn with_snapshot(path: impl AsRef<Path>) -> Result<Self, TripathError> {
        let path = path.as_ref().to_path_buf();
        let store = if path.exists() {
            let bytes = std::fs::read(&path).map_err(|e| {
                TripathError::StorageFailure(format!("read {}: {}", path.display(), e))
            })?;
            store_from_bytes(&bytes)?
        } else {
            MemoryStore::new()
        };
        Ok(Self {
            backend: StorageBackend::Snapshot { store, path },
        })
    }

    #[must_use]
    pub fn backend(&self) -> &StorageBackend {
        &self.backend
    }

    /// Whether changes survive a restart.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        !matches!(self.backend, StorageBackend::InMemory(_))
    }

    /// Read access to the underlying store.
    #[must_use]
    pub fn store(&self) -> &dyn TripleStore {
        match &self.backend {
            StorageBackend::InMemory(store) | StorageBackend::Snapshot { store, .. } => store,
            StorageBackend::Persistent(redb) => redb,
        }
    }

    fn store_mut(&mut self) -> &mut dyn TripleStore {
        match &mut self.backend {
            StorageBackend::InMemory(store) | StorageBackend::Snapshot { store, .. } => store,
            StorageBackend::Persistent(redb) => redb,
        }
    }

    /// Rewrite the snapshot file, if this session has one.
    ///
    /// Writes to a sibling temp file and renames it over the old snapshot.
    pub fn save(&self) -> Result<(), TripathError> {
        let StorageBackend::Snapshot { store, path } = &self.backend else {
            return Ok(());
        };
        let bytes = store_to_bytes(store)?;
        let tmp = path.with_extension("tmp");
        let io = |e: std::io::Error| {
            TripathError::StorageFailure(format!("write {}: {}", path.display(), e))
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io)?;
        }
        std::fs::write(&tmp, bytes).map_err(io)?;
        std::fs::rename(&tmp, path).map_err(io)?;
        Ok(())
    }

    fn saved<T>(&self, changed: bool, value: T) -> Result<T, TripathError> {
        if changed {
            self.save()?;
        }
        Ok(value)
    }

    // =========================================================================
    // INGESTION
    // =========================================================================

    /// Normalize and store a triple. Returns `true` if it was new.
    pub fn put(&mut self, subject: &str, predicate: &str, object: &str) -> Result<bool, TripathError> {
        let added = Ingestor::ingest(self.store_mut(), subject, predicate, object)?;
        self.saved(added, added)
    }

    /// Normalize and store many triples; all are validated before any is stored.
    pub fn put_batch(&mut self, triples: &[Triple]) -> Result<usize, TripathError> {
        let added = Ingestor::ingest_batch(self.store_mut(), triples)?;
        self.saved(added > 0, added)
    }

    /// Remove a triple. Returns `true` if it existed.
    pub fn delete(
        &mut self,
        subject: &str,
        predicate: &str,
        object: &str,
    ) -> Result<bool, TripathError> {
        let triple = Ingestor::normalize(subject, predicate, object)?;
        let removed = self.store_mut().remove_triple(&triple)?;
        self.saved(removed, removed)
    }

    /// Remove every triple.
    pub fn delete_all(&mut self) -> Result<(), TripathError> {
        self.store_mut().clear()?;
        self.save()
    }

    // =========================================================================
    // SCANS & STATS
    // =========================================================================

    pub fn scan(&self, limit: usize, kind: ScanKind) -> Result<ScanResult, TripathError> {
        Scanner::new(self.store()).scan(limit, kind)
    }

    pub fn listing(&self) -> Result<ScanResult, TripathError> {
        Scanner::new(self.store()).listing()
    }

    pub fn count_nodes(&self) -> Result<usize, TripathError> {
        Scanner::new(self.store()).count_nodes()
    }

    pub fn count_edges(&self) -> Result<usize, TripathError> {
        Scanner::new(self.store()).count_edges()
    }

    pub fn stats(&self) -> Result<GraphStats, TripathError> {
        Scanner::new(self.store()).stats()
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Start a pipeline. Same as [`Pipeline::v`]; materialize with [`Session::all`].
    #[must_use]
    pub fn v(&self, seed: impl Into<Seed>) -> Pipeline {
        Pipeline::v(seed)
    }

    pub fn all(&self, query: &Query) -> Result<ResultSet, TripathError> {
        Materializer::new(self.store()).all(query)
    }

    pub fn count(&self, query: &Query) -> Result<usize, TripathError> {
        Materializer::new(self.store()).count(query)
    }

    pub fn view(&self, query: &Query, name: &str) -> Result<View, TripathError> {
        Materializer::new(self.store()).view(query, name)
    }

    pub fn execute(&self, parsed: &ParsedQuery) -> Result<QueryOutput, TripathError> {
        Materializer::new(self.store()).execute(parsed)
    }

    /// Parse a text chain and run it.
    pub fn query(&self, text: &str) -> Result<QueryOutput, TripathError> {
        self.execute(&parse(text)?)
    }

    // =========================================================================
    // EXPORT / IMPORT
    // =========================================================================

    pub fn export_canonical(&self) -> Result<Vec<u8>, TripathError> {
        export::export_canonical(self.store())
    }

    /// Add every triple of a canonical export. Returns how many were new.
    pub fn import_canonical(&mut self, data: &[u8]) -> Result<usize, TripathError> {
        let CanonicalGraph { triples } = export::import_canonical(data)?;
        let added = self.store_mut().insert_batch(&triples)?;
        self.saved(added > 0, added)
    }

    pub fn checksum(&self) -> Result<u64, TripathError> {
        export::canonical_checksum(self.store())
    }
}

// =============================================================================
// TESTS
// =============================================================================
