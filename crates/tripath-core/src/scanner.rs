//! # Scanner
//!
//! Bounded enumeration of nodes and edges for listings and display stats.
//! Holds no state of its own; every number is derived from a scan.

use crate::primitives::{LISTING_SCAN_LIMIT, STATS_SCAN_LIMIT};
use crate::store::TripleStore;
use crate::{ScanKind, ScanResult, TripathError};
use serde::{Deserialize, Serialize};

/// Node and edge counts for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GraphStats {
    pub nodes: usize,
    pub edges: usize,
    /// Whether either count reached `STATS_SCAN_LIMIT` and may be higher.
    pub truncated: bool,
}

pub struct Scanner<'a, S: TripleStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: TripleStore + ?Sized> Scanner<'a, S> {
    #[must_use]
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Up to `limit` nodes or triples. An empty store yields an empty result.
    pub fn scan(&self, limit: usize, kind: ScanKind) -> Result<ScanResult, TripathError> {
        Ok(match kind {
            ScanKind::Node => ScanResult::nodes(self.store.scan_nodes(limit)?),
            ScanKind::Edge => ScanResult::edges(self.store.scan_triples(limit)?),
        })
    }

    /// The short "current data" listing: the first few triples.
    pub fn listing(&self) -> Result<ScanResult, TripathError> {
        self.scan(LISTING_SCAN_LIMIT, ScanKind::Edge)
    }

    pub fn count_nodes(&self) -> Result<usize, TripathError> {
        Ok(self.scan(STATS_SCAN_LIMIT, ScanKind::Node)?.len())
    }

    pub fn count_edges(&self) -> Result<usize, TripathError> {
        Ok(self.scan(STATS_SCAN_LIMIT, ScanKind::Edge)?.len())
    }

    pub fn stats(&self) -> Result<GraphStats, TripathError> {
        let nodes = self.count_nodes()?;
        let edges = self.count_edges()?;
        Ok(GraphStats {
            nodes,
            edges,
            truncated: nodes >= STATS_SCAN_LIMIT || edges >= STATS_SCAN_LIMIT,
        })
    }
}
