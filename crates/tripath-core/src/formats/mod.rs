//! # Formats
//!
//! Byte-level encodings of a graph. Pure transformations; file I/O lives in
//! the caller.

pub mod persistence;

pub use persistence::{
    MAX_PERSISTENCE_PAYLOAD_SIZE, PersistenceHeader, store_from_bytes, store_to_bytes,
};
