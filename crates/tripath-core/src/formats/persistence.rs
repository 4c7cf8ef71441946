//! # Snapshot Format
//!
//! Binary snapshot of an in-memory store.
//!
//! Format: Header (5 bytes) + postcard-serialized triples in insertion order.
//! - 4 bytes: Magic ("TRIP")
//! - 1 byte: Version
//!
//! Size and header are validated before the payload is decoded, so a
//! truncated or foreign file fails fast instead of allocating.

use crate::store::{MemoryStore, SerializableStore};
use crate::{TripathError, primitives};

/// Largest snapshot accepted for decoding (500 MB).
pub const MAX_PERSISTENCE_PAYLOAD_SIZE: usize = 500 * 1024 * 1024;

const HEADER_LEN: usize = 5;

/// The header that precedes every snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistenceHeader {
    pub magic: [u8; 4],
    pub version: u8,
}

impl PersistenceHeader {
    /// Header for the current format version.
    #[must_use]
    pub fn new() -> Self {
        Self {
            magic: *primitives::MAGIC_BYTES,
            version: primitives::FORMAT_VERSION,
        }
    }

    pub fn validate(&self) -> Result<(), TripathError> {
        if &self.magic != primitives::MAGIC_BYTES {
            return Err(TripathError::SerializationError(
                "not a tripath snapshot (bad magic bytes)".to_string(),
            ));
        }
        if self.version != primitives::FORMAT_VERSION {
            return Err(TripathError::SerializationError(format!(
                "unsupported snapshot version {} (expected {})",
                self.version,
                primitives::FORMAT_VERSION
            )));
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut bytes = [0u8; HEADER_LEN];
        bytes[..4].copy_from_slice(&self.magic);
        bytes[4] = self.version;
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TripathError> {
        let Some(header) = bytes.get(..HEADER_LEN) else {
            return Err(TripathError::SerializationError(
                "snapshot header too short".to_string(),
            ));
        };
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&header[..4]);
        Ok(Self {
            magic,
            version: header[4],
        })
    }
}

impl Default for PersistenceHeader {
    fn default() -> Self {
        Self::new()
    }
}

/// Encode a store as header + payload.
pub fn store_to_bytes(store: &MemoryStore) -> Result<Vec<u8>, TripathError> {
    let payload = postcard::to_stdvec(&SerializableStore::from(store))
        .map_err(|e| TripathError::SerializationError(e.to_string()))?;

    let mut bytes = Vec::with_capacity(HEADER_LEN + payload.len());
    bytes.extend_from_slice(&PersistenceHeader::new().to_bytes());
    bytes.extend_from_slice(&payload);
    Ok(bytes)
}

/// Decode a snapshot produced by [`store_to_bytes`].
pub fn store_from_bytes(bytes: &[u8]) -> Result<MemoryStore, TripathError> {
    if bytes.len() > MAX_PERSISTENCE_PAYLOAD_SIZE {
        return Err(TripathError::SerializationError(format!(
            "snapshot of {} bytes exceeds maximum {} bytes",
            bytes.len(),
            MAX_PERSISTENCE_PAYLOAD_SIZE
        )));
    }
    PersistenceHeader::from_bytes(bytes)?.validate()?;

    let serializable: SerializableStore = postcard::from_bytes(&bytes[HEADER_LEN..])
        .map_err(|e| TripathError::SerializationError(format!("bad snapshot payload: {}", e)))?;
    Ok(MemoryStore::from(serializable))
}
