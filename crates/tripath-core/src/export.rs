//! # Canonical Export Module
//!
//! Backend-independent, bit-exact serialization of a graph.
//!
//! A redb file is not byte-identical across runs and a snapshot keeps
//! insertion order, so neither can be compared directly. The canonical form
//! sorts triples lexicographically: two stores holding the same triples
//! export the same bytes, whatever their backend or history.
//!
//! Format:
//! ```text
//! [header_len: u32 LE] [CanonicalHeader (postcard)] [CanonicalGraph (postcard)]
//! ```

use crate::ingestor::Ingestor;
use crate::store::{MemoryStore, TripleStore};
use crate::{Triple, TripathError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// =============================================================================
// CANONICAL FORMAT
// =============================================================================

/// Magic bytes for canonical export format.
pub const CANONICAL_MAGIC: [u8; 4] = *b"TREX";

pub const CANONICAL_VERSION: u8 = 1;

/// Import refuses headers announcing more nodes than this.
pub const MAX_IMPORT_NODE_COUNT: u64 = 1_000_000;

/// Import refuses headers announcing more triples than this.
pub const MAX_IMPORT_TRIPLE_COUNT: u64 = 10_000_000;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CanonicalHeader {
    pub magic: [u8; 4],
    pub version: u8,
    pub node_count: u64,
    pub triple_count: u64,
    /// Checksum of the data section.
    pub checksum: u64,
}

impl CanonicalHeader {
    #[must_use]
    pub fn new(node_count: u64, triple_count: u64, checksum: u64) -> Self {
        Self {
            magic: CANONICAL_MAGIC,
            version: CANONICAL_VERSION,
            node_count,
            triple_count,
            checksum,
        }
    }

    pub fn validate(&self) -> Result<(), TripathError> {
        if self.magic != CANONICAL_MAGIC {
            return Err(TripathError::SerializationError(
                "Invalid file format".to_string(),
            ));
        }
        if self.version != CANONICAL_VERSION {
            return Err(TripathError::SerializationError(
                "Unsupported file version".to_string(),
            ));
        }
        if self.node_count > MAX_IMPORT_NODE_COUNT {
            return Err(TripathError::SerializationError(format!(
                "Node count {} exceeds maximum allowed {}",
                self.node_count, MAX_IMPORT_NODE_COUNT
            )));
        }
        if self.triple_count > MAX_IMPORT_TRIPLE_COUNT {
            return Err(TripathError::SerializationError(format!(
                "Triple count {} exceeds maximum allowed {}",
                self.triple_count, MAX_IMPORT_TRIPLE_COUNT
            )));
        }
        Ok(())
    }
}

/// All triples of a graph, sorted by (subject, predicate, object).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct CanonicalGraph {
    pub triples: Vec<Triple>,
}

impl CanonicalGraph {
    /// Read every triple from `store` and sort.
    pub fn from_store<S: TripleStore + ?Sized>(store: &S) -> Result<Self, TripathError> {
        let mut triples = store.scan_triples(usize::MAX)?;
        triples.sort();
        Ok(Self { triples })
    }

    /// Distinct subjects and objects.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.triples
            .iter()
            .flat_map(|t| [t.subject.as_str(), t.object.as_str()])
            .collect::<BTreeSet<_>>()
            .len()
    }

    /// Rebuild an in-memory store; triples are inserted in canonical order.
    #[must_use]
    pub fn into_store(self) -> MemoryStore {
        MemoryStore::from_triples(self.triples)
    }

    /// Deterministic rotate-XOR checksum.
    ///
    /// Detects accidental corruption only; it is not collision resistant.
    /// Enable the `crypto-hash` feature for a BLAKE3 digest.
    #[must_use]
    pub fn checksum(&self) -> u64 {
        let mut hash: u64 = 0;
        for triple in &self.triples {
            for term in [&triple.subject, &triple.predicate, &triple.object] {
                for byte in term.as_bytes() {
                    hash = hash.rotate_left(7) ^ u64::from(*byte);
                }
                // Term separator, so ("ab","c") and ("a","bc") differ.
                hash = hash.rotate_left(13) ^ 0xff;
            }
        }
        hash ^ (self.triples.len() as u64).rotate_left(3)
    }
}

// =============================================================================
// EXPORT / IMPORT
// =============================================================================

/// Export a store to canonical bytes.
pub fn export_canonical<S: TripleStore + ?Sized>(store: &S) -> Result<Vec<u8>, TripathError> {
    let canonical = CanonicalGraph::from_store(store)?;
    let header = CanonicalHeader::new(
        canonical.node_count() as u64,
        canonical.triples.len() as u64,
        canonical.checksum(),
    );

    let header_bytes = postcard::to_allocvec(&header)
        .map_err(|e| TripathError::SerializationError(format!("Header: {}", e)))?;
    let data_bytes = postcard::to_allocvec(&canonical)
        .map_err(|e| TripathError::SerializationError(format!("Data: {}", e)))?;
    let header_len = u32::try_from(header_bytes.len())
        .map_err(|e| TripathError::SerializationError(e.to_string()))?;

    let mut out = Vec::with_capacity(4 + header_bytes.len() + data_bytes.len());
    out.extend_from_slice(&header_len.to_le_bytes());
    out.extend_from_slice(&header_bytes);
    out.extend_from_slice(&data_bytes);
    Ok(out)
}

/// Decode and verify canonical bytes.
///
/// Limits are checked on the header before the data section is decoded.
/// Every triple must already be normalized.
pub fn import_canonical(data: &[u8]) -> Result<CanonicalGraph, TripathError> {
    let Some(len_bytes) = data.get(..4) else {
        return Err(TripathError::SerializationError(
            "Data too short".to_string(),
        ));
    };
    let header_len = u32::from_le_bytes([len_bytes[0], len_bytes[1], len_bytes[2], len_bytes[3]])
        as usize;
    let header_end = 4usize.saturating_add(header_len);
    let (Some(header_bytes), Some(data_bytes)) = (data.get(4..header_end), data.get(header_end..))
    else {
        return Err(TripathError::SerializationError(
            "Data too short for header".to_string(),
        ));
    };

    let header: CanonicalHeader = postcard::from_bytes(header_bytes)
        .map_err(|e| TripathError::SerializationError(format!("Header: {}", e)))?;
    header.validate()?;

    let canonical: CanonicalGraph = postcard::from_bytes(data_bytes)
        .map_err(|e| TripathError::SerializationError(format!("Data: {}", e)))?;

    let computed = canonical.checksum();
    if computed != header.checksum {
        return Err(TripathError::SerializationError(format!(
            "Checksum mismatch: expected {}, got {}",
            header.checksum, computed
        )));
    }
    if canonical.triples.len() as u64 != header.triple_count {
        return Err(TripathError::SerializationError(
            "Triple count mismatch".to_string(),
        ));
    }
    if canonical.node_count() as u64 != header.node_count {
        return Err(TripathError::SerializationError(
            "Node count mismatch".to_string(),
        ));
    }
    for triple in &canonical.triples {
        let normalized = Ingestor::normalize(&triple.subject, &triple.predicate, &triple.object)
            .map_err(|e| TripathError::SerializationError(e.to_string()))?;
        if &normalized != triple {
            return Err(TripathError::SerializationError(format!(
                "Triple {} is not normalized",
                triple
            )));
        }
    }

    Ok(canonical)
}

/// Whether `store` holds exactly the triples in `canonical_data`.
pub fn verify_canonical<S: TripleStore + ?Sized>(
    store: &S,
    canonical_data: &[u8],
) -> Result<bool, TripathError> {
    let imported = import_canonical(canonical_data)?;
    Ok(CanonicalGraph::from_store(store)? == imported)
}

/// Canonical checksum of a store, for quick equality checks.
pub fn canonical_checksum<S: TripleStore + ?Sized>(store: &S) -> Result<u64, TripathError> {
    Ok(CanonicalGraph::from_store(store)?.checksum())
}

/// BLAKE3 hash (hex) of the canonical export.
#[cfg(feature = "crypto-hash")]
pub fn canonical_crypto_hash<S: TripleStore + ?Sized>(store: &S) -> Result<String, TripathError> {
    Ok(compute_blake3_hash(&export_canonical(store)?))
}

/// BLAKE3 hash (hex) of arbitrary bytes.
#[cfg(feature = "crypto-hash")]
#[must_use]
pub fn compute_blake3_hash(data: &[u8]) -> String {
    blake3::hash(data).to_hex().to_string()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MemoryStore {
        MemoryStore::from_triples([
            Triple::new("bob", "follows", "charlie"),
            Triple::new("alice", "follows", "bob"),
            Triple::new("alice", "likes", "python"),
        ])
    }

    #[test]
    fn roundtrip_sorts_triples() {
        let bytes = export_canonical(&sample()).expect("export");
        let imported = import_canonical(&bytes).expect("import");
        assert_eq!(imported.triples.len(), 3);
        assert_eq!(imported.triples[0], Triple::new("alice", "follows", "bob"));
        assert!(verify_canonical(&sample(), &bytes).expect("verify"));
    }

    #[test]
    fn export_ignores_insertion_order() {
        let reversed = MemoryStore::from_triples(
            sample().triples().cloned().collect::<Vec<_>>().into_iter().rev(),
        );
        assert_eq!(
            export_canonical(&sample()).expect("a"),
            export_canonical(&reversed).expect("b")
        );
        assert_eq!(
            canonical_checksum(&sample()).expect("a"),
            canonical_checksum(&reversed).expect("b")
        );
    }

    #[test]
    fn checksum_separates_terms() {
        let a = CanonicalGraph {
            triples: vec![Triple::new("ab", "c", "d")],
        };
        let b = CanonicalGraph {
            triples: vec![Triple::new("a", "bc", "d")],
        };
        assert_ne!(a.checksum(), b.checksum());
    }

    #[test]
    fn empty_store_exports() {
        let bytes = export_canonical(&MemoryStore::new()).expect("export");
        let imported = import_canonical(&bytes).expect("import");
        assert!(imported.triples.is_empty());
        assert_eq!(imported.into_store().triple_count().expect("count"), 0);
    }

    #[test]
    fn corrupted_input_rejected() {
        assert!(import_canonical(&[]).is_err());
        assert!(import_canonical(&[0xff, 0xff, 0, 0, 1]).is_err());

        let mut bytes = export_canonical(&sample()).expect("export");
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        assert!(matches!(
            import_canonical(&bytes),
            Err(TripathError::SerializationError(_))
        ));
    }

    #[test]
    fn wrong_magic_rejected() {
        let canonical = CanonicalGraph::default();
        let mut header = CanonicalHeader::new(0, 0, canonical.checksum());
        header.magic = *b"NOPE";
        let header_bytes = postcard::to_allocvec(&header).expect("header");
        let mut bytes = (header_bytes.len() as u32).to_le_bytes().to_vec();
        bytes.extend_from_slice(&header_bytes);
        bytes.extend_from_slice(&postcard::to_allocvec(&canonical).expect("data"));
        assert!(import_canonical(&bytes).is_err());
    }

    #[test]
    fn excessive_counts_rejected_before_decoding() {
        let header = CanonicalHeader::new(MAX_IMPORT_NODE_COUNT + 1, 0, 0);
        assert!(header.validate().is_err());
        let header = CanonicalHeader::new(0, MAX_IMPORT_TRIPLE_COUNT + 1, 0);
        assert!(header.validate().is_err());
    }

    #[test]
    fn unnormalized_triples_rejected() {
        let canonical = CanonicalGraph {
            triples: vec![Triple::new("Alice", "x", "b")],
        };
        let header = CanonicalHeader::new(2, 1, canonical.checksum());
        let header_bytes = postcard::to_allocvec(&header).expect("header");
        let mut bytes = (header_bytes.len() as u32).to_le_bytes().to_vec();
        bytes.extend_from_slice(&header_bytes);
        bytes.extend_from_slice(&postcard::to_allocvec(&canonical).expect("data"));
        assert!(import_canonical(&bytes).is_err());
    }

    #[cfg(feature = "crypto-hash")]
    #[test]
    fn crypto_hash_is_stable_hex() {
        let a = canonical_crypto_hash(&sample()).expect("hash");
        let b = canonical_crypto_hash(&sample()).expect("hash");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }
}
