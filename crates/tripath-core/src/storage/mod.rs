//! # Storage Module
//!
//! Disk-backed implementations of [`TripleStore`](crate::store::TripleStore).

pub mod redb_store;

pub use redb_store::RedbStore;
