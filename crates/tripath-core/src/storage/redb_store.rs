//! # redb-backed Triple Storage
//!
//! A disk-backed triple store using the redb embedded database.
//!
//! Every access path of the in-memory store has its own table, so each
//! indexed lookup is a single key-range scan:
//! - ACID transactions (a batch is one commit)
//! - Crash safety (copy-on-write B-trees)
//! - MVCC (concurrent readers, single writer)
//!
//! Index keys end in the `TripleId`, so a range scan over one subject,
//! object or predicate yields triples in insertion order.

use crate::store::TripleStore;
use crate::{Triple, TripathError};
use redb::{
    Database, ReadTransaction, ReadableDatabase, ReadableTable, ReadableTableMetadata, Table,
    TableDefinition, WriteTransaction,
};
use std::path::{Path, PathBuf};

/// Primary table: TripleId(u64) -> postcard-encoded Triple
const TRIPLES: TableDefinition<u64, &[u8]> = TableDefinition::new("triples");

/// Dedup lookup: (subject, predicate, object) -> TripleId
const SPO: TableDefinition<(&str, &str, &str), u64> = TableDefinition::new("spo");

/// (subject, TripleId) -> ()
const SUBJECT_INDEX: TableDefinition<(&str, u64), ()> = TableDefinition::new("subject_index");

/// (object, TripleId) -> ()
const OBJECT_INDEX: TableDefinition<(&str, u64), ()> = TableDefinition::new("object_index");

/// (predicate, TripleId) -> ()
const PREDICATE_INDEX: TableDefinition<(&str, u64), ()> =
    TableDefinition::new("predicate_index");

/// (predicate, object, TripleId) -> ()
const PRED_OBJ_INDEX: TableDefinition<(&str, &str, u64), ()> =
    TableDefinition::new("pred_obj_index");

/// First-appearance order of live nodes: seq -> name
const NODE_ORDER: TableDefinition<u64, &str> = TableDefinition::new("node_order");

/// name -> (seq, reference count)
const NODE_REFS: TableDefinition<&str, (u64, u64)> = TableDefinition::new("node_refs");

/// Table for metadata: key string -> value u64
const METADATA: TableDefinition<&str, u64> = TableDefinition::new("metadata");

const META_NEXT_TRIPLE: &str = "next_triple_id";
const META_NEXT_NODE: &str = "next_node_seq";

fn storage_err(e: impl std::fmt::Display) -> TripathError {
    TripathError::StorageFailure(e.to_string())
}

fn encode(triple: &Triple) -> Result<Vec<u8>, TripathError> {
    postcard::to_allocvec(triple).map_err(|e| TripathError::SerializationError(e.to_string()))
}

fn decode(bytes: &[u8]) -> Result<Triple, TripathError> {
    postcard::from_bytes(bytes).map_err(|e| TripathError::SerializationError(e.to_string()))
}

// =============================================================================
// WRITE SIDE
// =============================================================================

/// Sequence counters carried through a write transaction.
#[derive(Debug, Clone, Copy, Default)]
struct Counters {
    next_triple_id: u64,
    next_node_seq: u64,
}

/// Every table opened once inside a single write transaction.
struct WriteTables<'txn> {
    triples: Table<'txn, u64, &'static [u8]>,
    spo: Table<'txn, (&'static str, &'static str, &'static str), u64>,
    by_subject: Table<'txn, (&'static str, u64), ()>,
    by_object: Table<'txn, (&'static str, u64), ()>,
    by_predicate: Table<'txn, (&'static str, u64), ()>,
    by_pred_obj: Table<'txn, (&'static str, &'static str, u64), ()>,
    node_order: Table<'txn, u64, &'static str>,
    node_refs: Table<'txn, &'static str, (u64, u64)>,
}

impl<'txn> WriteTables<'txn> {
    fn open(txn: &'txn WriteTransaction) -> Result<Self, TripathError> {
        Ok(Self {
            triples: txn.open_table(TRIPLES).map_err(storage_err)?,
            spo: txn.open_table(SPO).map_err(storage_err)?,
            by_subject: txn.open_table(SUBJECT_INDEX).map_err(storage_err)?,
            by_object: txn.open_table(OBJECT_INDEX).map_err(storage_err)?,
            by_predicate: txn.open_table(PREDICATE_INDEX).map_err(storage_err)?,
            by_pred_obj: txn.open_table(PRED_OBJ_INDEX).map_err(storage_err)?,
            node_order: txn.open_table(NODE_ORDER).map_err(storage_err)?,
            node_refs: txn.open_table(NODE_REFS).map_err(storage_err)?,
        })
    }

    fn insert(&mut self, triple: &Triple, counters: &mut Counters) -> Result<bool, TripathError> {
        let key = (
            triple.subject.as_str(),
            triple.predicate.as_str(),
            triple.object.as_str(),
        );
        if self.spo.get(key).map_err(storage_err)?.is_some() {
            return Ok(false);
        }

        let id = counters.next_triple_id;
        counters.next_triple_id = id.saturating_add(1);

        let bytes = encode(triple)?;
        self.triples
            .insert(id, bytes.as_slice())
            .map_err(storage_err)?;
        self.spo.insert(key, id).map_err(storage_err)?;
        self.by_subject
            .insert((triple.subject.as_str(), id), ())
            .map_err(storage_err)?;
        self.by_object
            .insert((triple.object.as_str(), id), ())
            .map_err(storage_err)?;
        self.by_predicate
            .insert((triple.predicate.as_str(), id), ())
            .map_err(storage_err)?;
        self.by_pred_obj
            .insert((triple.predicate.as_str(), triple.object.as_str(), id), ())
            .map_err(storage_err)?;

        self.retain_node(&triple.subject, counters)?;
        self.retain_node(&triple.object, counters)?;
        Ok(true)
    }

    fn remove(&mut self, triple: &Triple) -> Result<bool, TripathError> {
        let key = (
            triple.subject.as_str(),
            triple.predicate.as_str(),
            triple.object.as_str(),
        );
        let Some(id) = self.spo.remove(key).map_err(storage_err)?.map(|g| g.value()) else {
            return Ok(false);
        };

        self.triples.remove(id).map_err(storage_err)?;
        self.by_subject
            .remove((triple.subject.as_str(), id))
            .map_err(storage_err)?;
        self.by_object
            .remove((triple.object.as_str(), id))
            .map_err(storage_err)?;
        self.by_predicate
            .remove((triple.predicate.as_str(), id))
            .map_err(storage_err)?;
        self.by_pred_obj
            .remove((triple.predicate.as_str(), triple.object.as_str(), id))
            .map_err(storage_err)?;

        self.release_node(&triple.subject)?;
        self.release_node(&triple.object)?;
        Ok(true)
    }

    fn retain_node(&mut self, node: &str, counters: &mut Counters) -> Result<(), TripathError> {
        let existing = self.node_refs.get(node).map_err(storage_err)?.map(|g| g.value());
        match existing {
            Some((seq, refs)) => {
                self.node_refs
                    .insert(node, (seq, refs.saturating_add(1)))
                    .map_err(storage_err)?;
            }
            None => {
                let seq = counters.next_node_seq;
                counters.next_node_seq = seq.saturating_add(1);
                self.node_refs.insert(node, (seq, 1)).map_err(storage_err)?;
                self.node_order.insert(seq, node).map_err(storage_err)?;
            }
        }
        Ok(())
    }

    fn release_node(&mut self, node: &str) -> Result<(), TripathError> {
        let Some((seq, refs)) = self.node_refs.get(node).map_err(storage_err)?.map(|g| g.value())
        else {
            return Ok(());
        };
        if refs <= 1 {
            self.node_refs.remove(node).map_err(storage_err)?;
            self.node_order.remove(seq).map_err(storage_err)?;
        } else {
            self.node_refs
                .insert(node, (seq, refs.saturating_sub(1)))
                .map_err(storage_err)?;
        }
        Ok(())
    }
}

fn store_counters(txn: &WriteTransaction, counters: Counters) -> Result<(), TripathError> {
    let mut meta = txn.open_table(METADATA).map_err(storage_err)?;
    meta.insert(META_NEXT_TRIPLE, counters.next_triple_id)
        .map_err(storage_err)?;
    meta.insert(META_NEXT_NODE, counters.next_node_seq)
        .map_err(storage_err)?;
    Ok(())
}

// =============================================================================
// READ SIDE
// =============================================================================

/// Fetch triples by id, in the order given.
fn resolve(txn: &ReadTransaction, ids: Vec<u64>) -> Result<Vec<Triple>, TripathError> {
    let table = txn.open_table(TRIPLES).map_err(storage_err)?;
    let mut triples = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(bytes) = table.get(id).map_err(storage_err)? {
            triples.push(decode(bytes.value())?);
        }
    }
    Ok(triples)
}

/// Ids stored under `term` in a `(term, TripleId)` index, ascending.
fn index_ids(
    txn: &ReadTransaction,
    def: TableDefinition<'_, (&'static str, u64), ()>,
    term: &str,
) -> Result<Vec<u64>, TripathError> {
    let table = txn.open_table(def).map_err(storage_err)?;
    let mut ids = Vec::new();
    for entry in table
        .range((term, 0u64)..=(term, u64::MAX))
        .map_err(storage_err)?
    {
        let (key, _) = entry.map_err(storage_err)?;
        ids.push(key.value().1);
    }
    Ok(ids)
}

// =============================================================================
// REDB STORE
// =============================================================================

/// A disk-backed triple store using redb.
///
/// Only the two sequence counters are cached in memory; they are updated
/// after a successful commit.
pub struct RedbStore {
    db: Database,
    path: PathBuf,
    counters: Counters,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore")
            .field("path", &self.path)
            .field("next_triple_id", &self.counters.next_triple_id)
            .finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Open or create a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, TripathError> {
        let path = path.as_ref().to_path_buf();
        let db = Database::create(&path).map_err(storage_err)?;

        // Create every table up front so readers never see a missing one.
        {
            let write_txn = db.begin_write().map_err(storage_err)?;
            {
                let _tables = WriteTables::open(&write_txn)?;
                let _meta = write_txn.open_table(METADATA).map_err(storage_err)?;
            }
            write_txn.commit().map_err(storage_err)?;
        }

        let counters = {
            let read_txn = db.begin_read().map_err(storage_err)?;
            let meta = read_txn.open_table(METADATA).map_err(storage_err)?;
            let read = |key: &str| -> Result<u64, TripathError> {
                Ok(meta.get(key).map_err(storage_err)?.map(|v| v.value()).unwrap_or(0))
            };
            Counters {
                next_triple_id: read(META_NEXT_TRIPLE)?,
                next_node_seq: read(META_NEXT_NODE)?,
            }
        };

        Ok(Self { db, path, counters })
    }

    /// Path of the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Compact the database file.
    pub fn compact(&mut self) -> Result<(), TripathError> {
        self.db.compact().map_err(storage_err)?;
        Ok(())
    }

    /// Run `f` inside one write transaction and commit.
    ///
    /// In-memory counters only advance if the commit succeeds.
    fn write<T>(
        &mut self,
        f: impl FnOnce(&mut WriteTables<'_>, &mut Counters) -> Result<T, TripathError>,
    ) -> Result<T, TripathError> {
        let mut counters = self.counters;
        let write_txn = self.db.begin_write().map_err(storage_err)?;
        let out = {
            let mut tables = WriteTables::open(&write_txn)?;
            f(&mut tables, &mut counters)?
        };
        store_counters(&write_txn, counters)?;
        write_txn.commit().map_err(storage_err)?;
        self.counters = counters;
        Ok(out)
    }

    fn read(&self) -> Result<ReadTransaction, TripathError> {
        self.db.begin_read().map_err(storage_err)
    }
}

// =============================================================================
// TRIPLESTORE TRAIT IMPLEMENTATION
// =============================================================================

impl TripleStore for RedbStore {
    fn insert_triple(&mut self, triple: &Triple) -> Result<bool, TripathError> {
        self.write(|tables, counters| tables.insert(triple, counters))
    }

    fn insert_batch(&mut self, triples: &[Triple]) -> Result<usize, TripathError> {
        if triples.is_empty() {
            return Ok(0);
        }
        self.write(|tables, counters| {
            let mut added = 0;
            for triple in triples {
                if tables.insert(triple, counters)? {
                    added += 1;
                }
            }
            Ok(added)
        })
    }

    fn remove_triple(&mut self, triple: &Triple) -> Result<bool, TripathError> {
        self.write(|tables, _| tables.remove(triple))
    }

    fn clear(&mut self) -> Result<(), TripathError> {
        let write_txn = self.db.begin_write().map_err(storage_err)?;
        {
            let mut tables = WriteTables::open(&write_txn)?;
            tables.triples.retain(|_, _| false).map_err(storage_err)?;
            tables.spo.retain(|_, _| false).map_err(storage_err)?;
            tables.by_subject.retain(|_, _| false).map_err(storage_err)?;
            tables.by_object.retain(|_, _| false).map_err(storage_err)?;
            tables.by_predicate.retain(|_, _| false).map_err(storage_err)?;
            tables.by_pred_obj.retain(|_, _| false).map_err(storage_err)?;
            tables.node_order.retain(|_, _| false).map_err(storage_err)?;
            tables.node_refs.retain(|_, _| false).map_err(storage_err)?;
        }
        store_counters(&write_txn, Counters::default())?;
        write_txn.commit().map_err(storage_err)?;
        self.counters = Counters::default();
        Ok(())
    }

    fn contains_triple(&self, triple: &Triple) -> Result<bool, TripathError> {
        let txn = self.read()?;
        let table = txn.open_table(SPO).map_err(storage_err)?;
        let key = (
            triple.subject.as_str(),
            triple.predicate.as_str(),
            triple.object.as_str(),
        );
        Ok(table.get(key).map_err(storage_err)?.is_some())
    }

    fn contains_node(&self, node: &str) -> Result<bool, TripathError> {
        let txn = self.read()?;
        let table = txn.open_table(NODE_REFS).map_err(storage_err)?;
        Ok(table.get(node).map_err(storage_err)?.is_some())
    }

    fn triples_by_subject(&self, node: &str) -> Result<Vec<Triple>, TripathError> {
        let txn = self.read()?;
        let ids = index_ids(&txn, SUBJECT_INDEX, node)?;
        resolve(&txn, ids)
    }

    fn triples_by_object(&self, node: &str) -> Result<Vec<Triple>, TripathError> {
        let txn = self.read()?;
        let ids = index_ids(&txn, OBJECT_INDEX, node)?;
        resolve(&txn, ids)
    }

    fn triples_by_predicate(&self, predicate: &str) -> Result<Vec<Triple>, TripathError> {
        let txn = self.read()?;
        let ids = index_ids(&txn, PREDICATE_INDEX, predicate)?;
        resolve(&txn, ids)
    }

    fn triples_by_predicate_object(
        &self,
        predicate: &str,
        object: &str,
    ) -> Result<Vec<Triple>, TripathError> {
        let txn = self.read()?;
        let ids = {
            let table = txn.open_table(PRED_OBJ_INDEX).map_err(storage_err)?;
            let mut ids = Vec::new();
            for entry in table
                .range((predicate, object, 0u64)..=(predicate, object, u64::MAX))
                .map_err(storage_err)?
            {
                let (key, _) = entry.map_err(storage_err)?;
                ids.push(key.value().2);
            }
            ids
        };
        resolve(&txn, ids)
    }

    fn scan_triples(&self, limit: usize) -> Result<Vec<Triple>, TripathError> {
        let txn = self.read()?;
        let table = txn.open_table(TRIPLES).map_err(storage_err)?;
        let mut triples = Vec::new();
        for entry in table.iter().map_err(storage_err)?.take(limit) {
            let (_, bytes) = entry.map_err(storage_err)?;
            triples.push(decode(bytes.value())?);
        }
        Ok(triples)
    }

    fn scan_nodes(&self, limit: usize) -> Result<Vec<String>, TripathError> {
        let txn = self.read()?;
        let table = txn.open_table(NODE_ORDER).map_err(storage_err)?;
        let mut nodes = Vec::new();
        for entry in table.iter().map_err(storage_err)?.take(limit) {
            let (_, name) = entry.map_err(storage_err)?;
            nodes.push(name.value().to_string());
        }
        Ok(nodes)
    }

    fn triple_count(&self) -> Result<usize, TripathError> {
        let txn = self.read()?;
        let table = txn.open_table(TRIPLES).map_err(storage_err)?;
        let count = table.len().map_err(storage_err)?;
        usize::try_from(count).map_err(storage_err)
    }

    fn node_count(&self) -> Result<usize, TripathError> {
        let txn = self.read()?;
        let table = txn.open_table(NODE_REFS).map_err(storage_err)?;
        let count = table.len().map_err(storage_err)?;
        usize::try_from(count).map_err(storage_err)
    }
}

// =============================================================================
// TESTS
// =============================================================================
