//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.
//! Each command opens the configured graph, does its work and returns;
//! persistent backends commit as they go.

use crate::api::{self, AppState, TripleRequest, WHOLE_GRAPH_VIEW};
use crate::config::{Config, ServerConfig};
use crate::datasets::{self, DATASETS};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tripath_core::{
    BackendKind, CanonicalGraph, GraphRegistry, QueryOutput, ScanEntry, ScanKind, Session,
    Terminal, Triple, TripathError, TripleStore, canonical_crypto_hash, parse,
    primitives::MAX_BATCH_LENGTH,
};

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum file size for `load` (100 MB).
const MAX_LOAD_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Maximum file size for `import` (500 MB).
const MAX_IMPORT_FILE_SIZE: u64 = 500 * 1024 * 1024;

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), TripathError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| TripathError::StorageFailure(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(TripathError::invalid(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Resolve an input path: symlinks and ".." resolved, must be a regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, TripathError> {
    let canonical = path.canonicalize().map_err(|e| {
        TripathError::invalid(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(TripathError::invalid(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Resolve an output path: its parent must be an existing directory.
fn validate_output_path(path: &Path) -> Result<PathBuf, TripathError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let canonical_parent = parent.canonicalize().map_err(|e| {
        TripathError::invalid(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(TripathError::invalid(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| TripathError::invalid("Output path has no filename"))?;

    Ok(canonical_parent.join(filename))
}

fn read_file(path: &Path, max_size: u64) -> Result<Vec<u8>, TripathError> {
    let validated = validate_file_path(path)?;
    validate_file_size(&validated, max_size)?;
    std::fs::read(&validated)
        .map_err(|e| TripathError::StorageFailure(format!("Read {}: {}", validated.display(), e)))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), TripathError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| TripathError::SerializationError(e.to_string()))?;
    println!("{}", text);
    Ok(())
}

// =============================================================================
// CONTEXT
// =============================================================================

/// What every command needs: where graphs live and which one to use.
pub struct Context {
    pub registry: GraphRegistry,
    pub graph: String,
    pub json_mode: bool,
}

impl Context {
    pub fn new(config: &Config, json_mode: bool) -> Result<Self, TripathError> {
        let kind = config.backend_kind()?;
        if matches!(kind, BackendKind::Memory) {
            tracing::warn!("memory backend: changes are lost when the command exits");
        }
        Ok(Self {
            registry: GraphRegistry::with_backend(&config.data_dir, kind),
            graph: config.graph.clone(),
            json_mode,
        })
    }

    /// Open the configured graph, creating it if needed.
    pub fn open(&self) -> Result<Session, TripathError> {
        tracing::debug!(graph = %self.graph, backend = %self.registry.backend(), "opening graph");
        self.registry.open(&self.graph)
    }
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_server(ctx: &Context, server: ServerConfig) -> Result<(), TripathError> {
    let session = ctx.open()?;

    println!("tripath server starting...");
    println!();
    println!("Configuration:");
    println!("  Host:     {}", server.host);
    println!("  Port:     {}", server.port);
    println!("  Backend:  {}", ctx.registry.backend());
    println!("  Graph:    {}", ctx.graph);
    println!();
    println!("Endpoints:");
    println!("  POST /triples         - Store a triple");
    println!("  POST /triples/batch   - Store many triples");
    println!("  POST /triples/delete  - Remove a triple");
    println!("  POST /query           - Run a query");
    println!("  POST /view            - Node-link view");
    println!("  GET  /scan            - List nodes or edges");
    println!("  GET  /status          - Node and edge counts");
    println!("  POST /clear           - Remove every triple");
    println!("  POST /export          - Export graph");
    println!("  GET  /health          - Health check");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    api::run_server(AppState::with_config(session, server)).await
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show graph status and the first few triples.
pub fn cmd_status(ctx: &Context) -> Result<(), TripathError> {
    let session = ctx.open()?;
    let stats = session.stats()?;

    if ctx.json_mode {
        return print_json(&serde_json::json!({
            "graph": ctx.graph,
            "backend": ctx.registry.backend().to_string(),
            "node_count": stats.nodes,
            "edge_count": stats.edges,
            "truncated": stats.truncated,
        }));
    }

    let plus = if stats.truncated { "+" } else { "" };
    println!("tripath Graph Status");
    println!("====================");
    println!("Graph:    {}", ctx.graph);
    println!("Backend:  {}", ctx.registry.backend());
    println!();
    println!("Nodes:    {}{}", stats.nodes, plus);
    println!("Edges:    {}{}", stats.edges, plus);

    let listing = session.listing()?;
    if listing.is_empty() {
        println!();
        println!("No data yet. Add triples with `tripath put` or `tripath seed social`.");
    } else {
        println!();
        println!("Current Data:");
        print_entries(&listing.result);
    }

    Ok(())
}

fn print_entries(entries: &[ScanEntry]) {
    for entry in entries {
        match entry {
            ScanEntry::Node { id } => println!("  {}", id),
            ScanEntry::Edge(t) => println!("  {} -[{}]-> {}", t.subject, t.predicate, t.object),
        }
    }
}

// =============================================================================
// INGESTION COMMANDS
// =============================================================================

/// Store one triple.
pub fn cmd_put(ctx: &Context, subject: &str, predicate: &str, object: &str) -> Result<(), TripathError> {
    let mut session = ctx.open()?;
    let added = session.put(subject, predicate, object)?;

    if ctx.json_mode {
        return print_json(&serde_json::json!({ "added": added }));
    }
    if added {
        println!("Added: {} -> {} -> {}", subject, predicate, object);
    } else {
        println!("Already stored: {} -> {} -> {}", subject, predicate, object);
    }
    Ok(())
}

/// Remove one triple.
pub fn cmd_delete(
    ctx: &Context,
    subject: &str,
    predicate: &str,
    object: &str,
) -> Result<(), TripathError> {
    let mut session = ctx.open()?;
    let removed = session.delete(subject, predicate, object)?;

    if ctx.json_mode {
        return print_json(&serde_json::json!({ "removed": removed }));
    }
    if removed {
        println!("Removed: {} -> {} -> {}", subject, predicate, object);
    } else {
        println!("Not stored: {} -> {} -> {}", subject, predicate, object);
    }
    Ok(())
}

/// Parse `load` input.
///
/// - `json`: `[{"subject": .., "predicate": .., "object": ..}, ...]`
/// - `text`: one `subject predicate object` per line; blank lines and lines
///   starting with `#` are skipped
pub fn parse_triples(contents: &[u8], format: &str) -> Result<Vec<Triple>, TripathError> {
    match format {
        "json" => {
            let raw: Vec<TripleRequest> = serde_json::from_slice(contents)
                .map_err(|e| TripathError::invalid(format!("Invalid JSON: {}", e)))?;
            Ok(raw.into_iter().map(Triple::from).collect())
        }
        "text" => {
            let text = std::str::from_utf8(contents)
                .map_err(|e| TripathError::invalid(format!("Input is not UTF-8: {}", e)))?;
            let mut triples = Vec::new();
            for (n, line) in text.lines().enumerate() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                match line.split_whitespace().collect::<Vec<_>>()[..] {
                    [s, p, o] => triples.push(Triple::new(s, p, o)),
                    _ => {
                        return Err(TripathError::invalid(format!(
                            "line {}: expected 'subject predicate object'",
                            n + 1
                        )));
                    }
                }
            }
            Ok(triples)
        }
        _ => Err(TripathError::invalid(format!(
            "Unknown format: {}. Use: json, text",
            format
        ))),
    }
}

/// Store triples from a file, in batches.
pub fn cmd_load(ctx: &Context, file: &Path, format: &str) -> Result<(), TripathError> {
    tracing::info!("Loading from {:?} (format: {})", file, format);

    let contents = read_file(file, MAX_LOAD_FILE_SIZE)?;
    let triples = parse_triples(&contents, format)?;

    let mut session = ctx.open()?;
    let mut added = 0;
    for chunk in triples.chunks(MAX_BATCH_LENGTH) {
        added += session.put_batch(chunk)?;
    }

    if ctx.json_mode {
        return print_json(&serde_json::json!({ "read": triples.len(), "added": added }));
    }
    println!("Read {} triples, {} new", triples.len(), added);
    println!(
        "Graph now has {} nodes, {} edges",
        session.count_nodes()?,
        session.count_edges()?
    );
    Ok(())
}

/// Store built-in example datasets.
pub fn cmd_seed(
    ctx: &Context,
    dataset: Option<&str>,
    all: bool,
    list: bool,
) -> Result<(), TripathError> {
    if list {
        for d in DATASETS {
            println!("  {:<10} {} ({} triples)", d.key, d.title, d.len());
        }
        return Ok(());
    }

    let chosen: Vec<&datasets::Dataset> = match (dataset, all) {
        (_, true) => DATASETS.iter().collect(),
        (Some(name), false) => vec![datasets::find(name)?],
        (None, false) => {
            return Err(TripathError::invalid(
                "name a dataset (social, movies, knowledge) or pass --all",
            ));
        }
    };

    let mut session = ctx.open()?;
    for d in chosen {
        let added = d.load_into(&mut session)?;
        println!("Loaded {}: {} of {} triples new", d.title, added, d.len());
    }
    Ok(())
}

// =============================================================================
// SCAN & QUERY COMMANDS
// =============================================================================

/// List nodes or edges.
pub fn cmd_scan(ctx: &Context, limit: usize, kind: &str) -> Result<(), TripathError> {
    let kind: ScanKind = kind.parse()?;
    let session = ctx.open()?;
    let scan = session.scan(limit, kind)?;

    if ctx.json_mode {
        return print_json(&scan);
    }
    if scan.is_empty() {
        println!("(empty)");
    } else {
        print_entries(&scan.result);
    }
    Ok(())
}

/// Run a query chain and print its JSON result.
pub fn cmd_query(ctx: &Context, chain: &str) -> Result<(), TripathError> {
    let parsed = parse(chain)?;
    tracing::debug!(query = %parsed.query, "query");

    let session = ctx.open()?;
    match session.execute(&parsed)? {
        QueryOutput::Results(results) if !ctx.json_mode && !results.is_tagged() => {
            if results.is_empty() {
                println!("(no results)");
            }
            for id in results.ids() {
                println!("{}", id);
            }
            Ok(())
        }
        output => print_json(&output),
    }
}

/// Print a node-link view as JSON.
pub fn cmd_view(ctx: &Context, chain: Option<&str>, name: Option<&str>) -> Result<(), TripathError> {
    let parsed = parse(chain.unwrap_or(WHOLE_GRAPH_VIEW))?;
    let name = match (name, &parsed.terminal) {
        (Some(name), _) => name.to_string(),
        (None, Terminal::View(name)) => name.clone(),
        (None, _) => ctx.graph.clone(),
    };

    let session = ctx.open()?;
    print_json(&session.view(&parsed.query, &name)?)
}

// =============================================================================
// LIFECYCLE COMMANDS
// =============================================================================

/// Remove every triple.
pub fn cmd_clear(ctx: &Context) -> Result<(), TripathError> {
    let mut session = ctx.open()?;
    let edges = session.count_edges()?;
    session.delete_all()?;
    println!("Cleared graph '{}' ({} edges removed)", ctx.graph, edges);
    Ok(())
}

/// Create the graph; with `force`, replace an existing one.
pub fn cmd_init(ctx: &Context, force: bool) -> Result<(), TripathError> {
    if ctx.registry.contains(&ctx.graph) {
        if !force {
            return Err(TripathError::invalid(format!(
                "Graph '{}' already exists. Use --force to overwrite.",
                ctx.graph
            )));
        }
        ctx.registry.drop_graph(&ctx.graph)?;
    }

    let _session = ctx.open()?;
    println!(
        "Initialized graph '{}' ({} backend)",
        ctx.graph,
        ctx.registry.backend()
    );
    Ok(())
}

/// Delete the graph and its files.
pub fn cmd_drop(ctx: &Context) -> Result<(), TripathError> {
    ctx.registry.drop_graph(&ctx.graph)?;
    println!("Dropped graph '{}'", ctx.graph);
    Ok(())
}

// =============================================================================
// EXPORT / IMPORT / HASH COMMANDS
// =============================================================================

/// Export graph.
pub fn cmd_export(ctx: &Context, output: &Path, format: &str) -> Result<(), TripathError> {
    let validated_output = validate_output_path(output)?;
    let session = ctx.open()?;

    let data = match format {
        "canonical" => {
            let data = session.export_canonical()?;
            println!("Checksum: {}", session.checksum()?);
            data
        }
        "json" => {
            let graph = CanonicalGraph::from_store(session.store())?;
            serde_json::to_vec_pretty(&graph)
                .map_err(|e| TripathError::SerializationError(e.to_string()))?
        }
        _ => {
            return Err(TripathError::invalid(format!(
                "Unknown format: {}. Use: canonical, json",
                format
            )));
        }
    };

    std::fs::write(&validated_output, &data)
        .map_err(|e| TripathError::StorageFailure(format!("Write file: {}", e)))?;

    println!("Exported {} bytes to {:?}", data.len(), validated_output);
    Ok(())
}

/// Add the triples of a canonical export to the graph.
pub fn cmd_import(ctx: &Context, input: &Path) -> Result<(), TripathError> {
    let data = read_file(input, MAX_IMPORT_FILE_SIZE)?;

    let mut session = ctx.open()?;
    let added = session.import_canonical(&data)?;

    println!(
        "Imported {} new triples; graph now has {} nodes, {} edges",
        added,
        session.count_nodes()?,
        session.count_edges()?
    );
    Ok(())
}

/// Print the BLAKE3 hash and checksum of the canonical export.
pub fn cmd_hash(ctx: &Context) -> Result<(), TripathError> {
    let session = ctx.open()?;
    let hash = canonical_crypto_hash(session.store())?;
    let checksum = session.checksum()?;
    let edges = session.store().triple_count()?;

    if ctx.json_mode {
        return print_json(&serde_json::json!({
            "blake3": hash,
            "checksum": checksum,
            "edge_count": edges,
        }));
    }
    println!("BLAKE3:   {}", hash);
    println!("Checksum: {}", checksum);
    println!("Edges:    {}", edges);
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn context(dir: &Path) -> Context {
        let config = Config {
            data_dir: dir.to_path_buf(),
            ..Config::default()
        };
        Context::new(&config, true).expect("context")
    }

    #[test]
    fn text_format_parses_lines() {
        let input = b"# social\nalice follows bob\n\n  bob   follows charlie  \n";
        let triples = parse_triples(input, "text").expect("parse");
        assert_eq!(
            triples,
            vec![
                Triple::new("alice", "follows", "bob"),
                Triple::new("bob", "follows", "charlie"),
            ]
        );
    }

    #[test]
    fn text_format_reports_bad_line() {
        let err = parse_triples(b"alice follows\n", "text").expect_err("two terms");
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn json_format_parses_objects() {
        let input = br#"[{"subject": "a", "predicate": "x", "object": "b"}]"#;
        let triples = parse_triples(input, "json").expect("parse");
        assert_eq!(triples, vec![Triple::new("a", "x", "b")]);
        assert!(parse_triples(b"{}", "json").is_err());
        assert!(parse_triples(b"", "csv").is_err());
    }

    #[test]
    fn commands_share_the_graph() {
        let dir = tempdir().expect("temp dir");
        let ctx = context(dir.path());

        cmd_put(&ctx, "Alice", "follows", "Bob").expect("put");
        cmd_seed(&ctx, Some("social"), false, false).expect("seed");
        let session = ctx.open().expect("open");
        assert_eq!(session.count_edges().expect("edges"), 9);
    }

    #[test]
    fn load_then_export_then_import() {
        let dir = tempdir().expect("temp dir");
        let ctx = context(dir.path());

        let input = dir.path().join("triples.txt");
        std::fs::write(&input, "a x b\nb x c\n").expect("write");
        cmd_load(&ctx, &input, "text").expect("load");

        let export = dir.path().join("graph.trex");
        cmd_export(&ctx, &export, "canonical").expect("export");

        cmd_clear(&ctx).expect("clear");
        assert_eq!(ctx.open().expect("open").count_edges().expect("edges"), 0);

        cmd_import(&ctx, &export).expect("import");
        assert_eq!(ctx.open().expect("open").count_edges().expect("edges"), 2);
    }

    #[test]
    fn init_refuses_existing_graph_without_force() {
        let dir = tempdir().expect("temp dir");
        let ctx = context(dir.path());

        cmd_init(&ctx, false).expect("first init");
        cmd_put(&ctx, "a", "x", "b").expect("put");
        assert!(cmd_init(&ctx, false).is_err());

        cmd_init(&ctx, true).expect("forced");
        assert_eq!(ctx.open().expect("open").count_edges().expect("edges"), 0);
    }

    #[test]
    fn drop_unknown_graph_is_not_found() {
        let dir = tempdir().expect("temp dir");
        let ctx = context(dir.path());
        assert!(matches!(cmd_drop(&ctx), Err(TripathError::NotFound(_))));
    }

    #[test]
    fn output_path_needs_existing_parent() {
        let dir = tempdir().expect("temp dir");
        assert!(validate_output_path(&dir.path().join("out.bin")).is_ok());
        assert!(validate_output_path(&dir.path().join("missing/out.bin")).is_err());
    }
}
