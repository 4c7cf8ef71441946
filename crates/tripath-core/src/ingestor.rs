//! # Ingestor Module
//!
//! Triple normalization, validation and ingestion protocol.
//!
//! - Normalize every term (trim, lower-case) so lookups are case-insensitive
//! - Reject malformed input before any store is touched
//! - Duplicate triples are accepted and ignored by the store

use crate::primitives::{MAX_BATCH_LENGTH, MAX_TERM_LENGTH};
use crate::store::TripleStore;
use crate::{Triple, TripathError};

/// The Ingestor turns raw caller input into stored triples.
pub struct Ingestor;

impl Ingestor {
    /// Normalize a single term: surrounding whitespace removed, lower-cased.
    #[must_use]
    pub fn normalize_term(term: &str) -> String {
        term.trim().to_lowercase()
    }

    /// Normalize and validate a raw (subject, predicate, object).
    ///
    /// Returns `TripathError::InvalidArgument` if any term is empty after
    /// trimming or longer than `MAX_TERM_LENGTH` bytes.
    pub fn normalize(subject: &str, predicate: &str, object: &str) -> Result<Triple, TripathError> {
        let triple = Triple::new(
            Self::normalize_term(subject),
            Self::normalize_term(predicate),
            Self::normalize_term(object),
        );
        Self::validate(&triple)?;
        Ok(triple)
    }

    /// Validate an already-normalized triple.
    pub fn validate(triple: &Triple) -> Result<(), TripathError> {
        for (role, term) in [
            ("subject", &triple.subject),
            ("predicate", &triple.predicate),
            ("object", &triple.object),
        ] {
            if term.is_empty() {
                return Err(TripathError::invalid(format!("{} must not be empty", role)));
            }
            if term.len() > MAX_TERM_LENGTH {
                return Err(TripathError::invalid(format!(
                    "{} length {} exceeds maximum {} bytes",
                    role,
                    term.len(),
                    MAX_TERM_LENGTH
                )));
            }
        }
        Ok(())
    }

    /// Normalize and store one triple. Returns `true` if it was new.
    pub fn ingest<S: TripleStore + ?Sized>(
        store: &mut S,
        subject: &str,
        predicate: &str,
        object: &str,
    ) -> Result<bool, TripathError> {
        let triple = Self::normalize(subject, predicate, object)?;
        store.insert_triple(&triple)
    }

    /// Normalize a batch of raw triples.
    ///
    /// The whole batch is rejected if it exceeds `MAX_BATCH_LENGTH` or if any
    /// single triple is invalid, so nothing is stored from a bad batch.
    pub fn normalize_batch(raw: &[Triple]) -> Result<Vec<Triple>, TripathError> {
        let mut triples = Vec::with_capacity(raw.len());
        for (i, t) in raw.iter().enumerate() {
            if i >= MAX_BATCH_LENGTH {
                return Err(TripathError::invalid(format!(
                    "batch exceeds maximum of {} triples",
                    MAX_BATCH_LENGTH
                )));
            }
            let triple = Self::normalize(&t.subject, &t.predicate, &t.object)
                .map_err(|e| TripathError::invalid(format!("triple #{}: {}", i, e)))?;
            triples.push(triple);
        }
        Ok(triples)
    }

    /// Normalize and store a batch. Returns how many triples were new.
    pub fn ingest_batch<S: TripleStore + ?Sized>(
        store: &mut S,
        raw: &[Triple],
    ) -> Result<usize, TripathError> {
        let triples = Self::normalize_batch(raw)?;
        store.insert_batch(&triples)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn normalize_trims_and_lowercases() {
        let t = Ingestor::normalize("  Alice ", "FOLLOWS", "Bob\n").expect("normalize");
        assert_eq!(t, Triple::new("alice", "follows", "bob"));
    }

    #[test]
    fn blank_terms_rejected() {
        assert!(matches!(
            Ingestor::normalize("alice", "   ", "bob"),
            Err(TripathError::InvalidArgument(_))
        ));
        assert!(matches!(
            Ingestor::normalize("", "follows", "bob"),
            Err(TripathError::InvalidArgument(_))
        ));
    }

    #[test]
    fn oversized_term_rejected() {
        let long = "x".repeat(MAX_TERM_LENGTH + 1);
        assert!(Ingestor::normalize("alice", "says", &long).is_err());
    }

    #[test]
    fn ingest_is_idempotent_across_case() {
        let mut store = MemoryStore::new();
        assert!(Ingestor::ingest(&mut store, "Alice", "follows", "Bob").expect("first"));
        assert!(!Ingestor::ingest(&mut store, "alice", "FOLLOWS", " bob ").expect("second"));
        assert_eq!(store.triple_count().expect("count"), 1);
    }

    #[test]
    fn bad_batch_stores_nothing() {
        let mut store = MemoryStore::new();
        let batch = vec![
            Triple::new("a", "x", "b"),
            Triple::new("b", "", "c"),
        ];
        assert!(Ingestor::ingest_batch(&mut store, &batch).is_err());
        assert_eq!(store.triple_count().expect("count"), 0);
    }

    #[test]
    fn batch_counts_only_new_triples() {
        let mut store = MemoryStore::new();
        let batch = vec![
            Triple::new("a", "x", "b"),
            Triple::new("A", "X", "B"),
            Triple::new("b", "x", "c"),
        ];
        assert_eq!(Ingestor::ingest_batch(&mut store, &batch).expect("batch"), 2);
    }
}
