//! # Engine Primitives
//!
//! Hardcoded runtime constants for the tripath engine.
//!
//! These are compiled into the binary and immutable at runtime. Every query
//! and every ingestion path is bounded by one of them.

/// Magic bytes for the snapshot file header.
///
/// - File Header = Magic Bytes ("TRIP") + Version (u8) before payload.
pub const MAGIC_BYTES: &[u8; 4] = b"TRIP";

/// Current snapshot format version.
///
/// Increment this when making breaking changes to the serialization format.
pub const FORMAT_VERSION: u8 = 1;

/// Scan bound used when deriving node and edge counts for display.
pub const STATS_SCAN_LIMIT: usize = 10_000;

/// Default scan bound for a "current data" listing.
pub const LISTING_SCAN_LIMIT: usize = 20;

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum length in bytes of a subject, predicate or object after normalization.
pub const MAX_TERM_LENGTH: usize = 1024;

/// Maximum number of triples in a single batch ingestion.
pub const MAX_BATCH_LENGTH: usize = 10_000;

/// Maximum number of steps in one pipeline.
pub const MAX_PIPELINE_STEPS: usize = 64;

/// Maximum number of explicit nodes in a `Seed` or `Is` step.
pub const MAX_SEED_NODES: usize = 1_000;

/// Maximum length of a graph name.
pub const MAX_GRAPH_NAME_LENGTH: usize = 64;

/// Name of the graph used when none is configured.
pub const DEFAULT_GRAPH_NAME: &str = "default";
