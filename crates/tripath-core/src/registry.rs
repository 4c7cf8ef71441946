//! # Graph Registry
//!
//! Named, independent graphs under one data root.
//!
//! Each graph lives in its own directory (`<root>/<name>/`) with its own
//! store, so no index structure is shared between names. Handles are
//! `Arc<RwLock<Session>>`: writers are serialized per graph, readers overlap.

use crate::primitives::MAX_GRAPH_NAME_LENGTH;
use crate::session::Session;
use crate::TripathError;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

/// Shared handle on one named graph.
pub type GraphHandle = Arc<RwLock<Session>>;

/// Which store backs graphs created by a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    /// redb database file (`graph.redb`).
    #[default]
    Redb,
    /// In-memory store mirrored to a snapshot file (`graph.trip`).
    File,
    /// Volatile, nothing on disk.
    Memory,
}

impl BackendKind {
    fn file_name(self) -> Option<&'static str> {
        match self {
            Self::Redb => Some("graph.redb"),
            Self::File => Some("graph.trip"),
            Self::Memory => None,
        }
    }
}

impl FromStr for BackendKind {
    type Err = TripathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redb" => Ok(Self::Redb),
            "file" | "snapshot" => Ok(Self::File),
            "memory" | "mem" => Ok(Self::Memory),
            other => Err(TripathError::invalid(format!(
                "unknown backend '{}': use redb, file or memory",
                other
            ))),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Redb => "redb",
            Self::File => "file",
            Self::Memory => "memory",
        })
    }
}

/// Validate a graph name: non-empty, `[a-z0-9_-]`, at most 64 bytes.
pub fn validate_graph_name(name: &str) -> Result<(), TripathError> {
    if name.is_empty() || name.len() > MAX_GRAPH_NAME_LENGTH {
        return Err(TripathError::invalid(format!(
            "graph name must be 1..={} bytes",
            MAX_GRAPH_NAME_LENGTH
        )));
    }
    if !name
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_' || b == b'-')
    {
        return Err(TripathError::invalid(format!(
            "graph name '{}' may only contain a-z, 0-9, '_' and '-'",
            name
        )));
    }
    Ok(())
}

#[derive(Debug)]
pub struct GraphRegistry {
    root: Option<PathBuf>,
    kind: BackendKind,
    graphs: RwLock<BTreeMap<String, GraphHandle>>,
}

impl GraphRegistry {
    /// Registry of redb graphs under `root`.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self::with_backend(root, BackendKind::Redb)
    }

    pub fn with_backend(root: impl AsRef<Path>, kind: BackendKind) -> Self {
        let root = match kind {
            BackendKind::Memory => None,
            _ => Some(root.as_ref().to_path_buf()),
        };
        Self {
            root,
            kind,
            graphs: RwLock::new(BTreeMap::new()),
        }
    }

    /// Registry whose graphs never touch disk.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            root: None,
            kind: BackendKind::Memory,
            graphs: RwLock::new(BTreeMap::new()),
        }
    }

    #[must_use]
    pub fn backend(&self) -> BackendKind {
        self.kind
    }

    fn graph_dir(&self, name: &str) -> Option<PathBuf> {
        self.root.as_ref().map(|root| root.join(name))
    }

    fn graph_file(&self, name: &str) -> Option<PathBuf> {
        Some(self.graph_dir(name)?.join(self.kind.file_name()?))
    }

    /// Open a graph as a session the caller owns, outside the handle table.
    ///
    /// Used by callers that bring their own lock, such as the HTTP server.
    /// Do not hold this and a handle from [`GraphRegistry::create`] on the
    /// same redb graph at once: redb allows one open database per file.
    pub fn open(&self, name: &str) -> Result<Session, TripathError> {
        validate_graph_name(name)?;
        let Some(file) = self.graph_file(name) else {
            return Ok(Session::new());
        };
        if let Some(dir) = file.parent() {
            std::fs::create_dir_all(dir).map_err(|e| {
                TripathError::StorageFailure(format!("create {}: {}", dir.display(), e))
            })?;
        }
        match self.kind {
            BackendKind::File => Session::with_snapshot(&file),
            _ => Session::with_redb(&file),
        }
    }

    /// Open a graph, creating it if needed. Returns the existing handle if
    /// the graph is already open.
    pub fn create(&self, name: &str) -> Result<GraphHandle, TripathError> {
        validate_graph_name(name)?;
        let mut graphs = self.graphs.write();
        if let Some(handle) = graphs.get(name) {
            return Ok(Arc::clone(handle));
        }
        let handle = Arc::new(RwLock::new(self.open(name)?));
        graphs.insert(name.to_string(), Arc::clone(&handle));
        Ok(handle)
    }

    /// Handle on a graph that was created before, in this process or on disk.
    ///
    /// # Errors
    ///
    /// `TripathError::NotFound` if no graph of that name exists.
    pub fn get(&self, name: &str) -> Result<GraphHandle, TripathError> {
        validate_graph_name(name)?;
        if let Some(handle) = self.graphs.read().get(name) {
            return Ok(Arc::clone(handle));
        }
        if self.graph_file(name).is_some_and(|f| f.exists()) {
            return self.create(name);
        }
        Err(TripathError::NotFound(format!("graph '{}'", name)))
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.graphs.read().contains_key(name) || self.graph_file(name).is_some_and(|f| f.exists())
    }

    /// Names of every known graph, sorted.
    pub fn names(&self) -> Result<Vec<String>, TripathError> {
        let mut names: Vec<String> = self.graphs.read().keys().cloned().collect();
        if let Some(root) = &self.root {
            if root.exists() {
                let entries = std::fs::read_dir(root).map_err(|e| {
                    TripathError::StorageFailure(format!("list {}: {}", root.display(), e))
                })?;
                for entry in entries.flatten() {
                    let name = entry.file_name().to_string_lossy().to_string();
                    if validate_graph_name(&name).is_ok()
                        && self.graph_file(&name).is_some_and(|f| f.exists())
                    {
                        names.push(name);
                    }
                }
            }
        }
        names.sort();
        names.dedup();
        Ok(names)
    }

    /// Clear a graph, forget its handle and delete its directory.
    ///
    /// Outstanding handles keep working on the now-empty session.
    pub fn drop_graph(&self, name: &str) -> Result<(), TripathError> {
        let handle = self.get(name)?;
        handle.write().delete_all()?;
        self.graphs.write().remove(name);
        drop(handle);

        if let Some(dir) = self.graph_dir(name) {
            if dir.exists() {
                std::fs::remove_dir_all(&dir).map_err(|e| {
                    TripathError::StorageFailure(format!("remove {}: {}", dir.display(), e))
                })?;
            }
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn graph_names_validated() {
        assert!(validate_graph_name("social_2024-v1").is_ok());
        assert!(validate_graph_name("").is_err());
        assert!(validate_graph_name("Social").is_err());
        assert!(validate_graph_name("../etc").is_err());
        assert!(validate_graph_name(&"a".repeat(MAX_GRAPH_NAME_LENGTH + 1)).is_err());
    }

    #[test]
    fn unknown_graph_is_not_found() {
        let registry = GraphRegistry::in_memory();
        assert!(matches!(registry.get("nope"), Err(TripathError::NotFound(_))));
    }

    #[test]
    fn named_graphs_are_independent() {
        let registry = GraphRegistry::in_memory();
        let a = registry.create("a").expect("a");
        let b = registry.create("b").expect("b");
        a.write().put("x", "p", "y").expect("put");

        assert_eq!(a.read().count_edges().expect("a"), 1);
        assert_eq!(b.read().count_edges().expect("b"), 0);

        let again = registry.get("a").expect("get");
        assert!(Arc::ptr_eq(&a, &again));
    }

    #[test]
    fn persistent_graph_reopens_by_name() {
        let temp = tempdir().expect("temp dir");
        {
            let registry = GraphRegistry::new(temp.path());
            let g = registry.create("social").expect("create");
            g.write().put("alice", "follows", "bob").expect("put");
        }
        let registry = GraphRegistry::new(temp.path());
        assert_eq!(registry.names().expect("names"), vec!["social"]);
        let g = registry.get("social").expect("get");
        assert_eq!(g.read().count_edges().expect("edges"), 1);
    }

    #[test]
    fn snapshot_backend_reopens_by_name() {
        let temp = tempdir().expect("temp dir");
        {
            let registry = GraphRegistry::with_backend(temp.path(), BackendKind::File);
            let g = registry.create("g").expect("create");
            g.write().put("a", "x", "b").expect("put");
        }
        let registry = GraphRegistry::with_backend(temp.path(), BackendKind::File);
        assert!(registry.contains("g"));
        let g = registry.get("g").expect("get");
        assert_eq!(g.read().count_nodes().expect("nodes"), 2);
    }

    #[test]
    fn drop_graph_removes_directory() {
        let temp = tempdir().expect("temp dir");
        let registry = GraphRegistry::new(temp.path());
        let g = registry.create("tmp").expect("create");
        g.write().put("a", "x", "b").expect("put");

        registry.drop_graph("tmp").expect("drop");
        assert!(!temp.path().join("tmp").exists());
        assert!(matches!(registry.get("tmp"), Err(TripathError::NotFound(_))));
        // The stale handle sees an empty graph.
        assert_eq!(g.read().count_edges().expect("edges"), 0);
    }

    #[test]
    fn open_returns_owned_session() {
        let temp = tempdir().expect("temp dir");
        let registry = GraphRegistry::new(temp.path());
        {
            let mut session = registry.open("owned").expect("open");
            session.put("a", "x", "b").expect("put");
        }
        assert!(registry.contains("owned"));
        assert!(registry.open("Bad Name").is_err());
    }

    #[test]
    fn backend_kind_parses() {
        assert_eq!("REDB".parse::<BackendKind>().expect("redb"), BackendKind::Redb);
        assert_eq!("file".parse::<BackendKind>().expect("file"), BackendKind::File);
        assert_eq!("memory".parse::<BackendKind>().expect("mem"), BackendKind::Memory);
        assert!("postgres".parse::<BackendKind>().is_err());
        assert_eq!(BackendKind::File.to_string(), "file");
    }
}
