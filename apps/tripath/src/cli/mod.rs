//! # tripath CLI Module
//!
//! This module implements the CLI interface for tripath.
//!
//! ## Available Commands
//!
//! - `server` - Start the HTTP server
//! - `status` - Show node and edge counts
//! - `put` / `delete` - Store or remove one triple
//! - `load` - Store triples from a JSON or text file
//! - `seed` - Store a built-in example dataset
//! - `scan` - List nodes or edges
//! - `query` - Run a query chain
//! - `view` - Node-link view of a query or of the whole graph
//! - `clear` - Remove every triple
//! - `init` / `drop` - Create or delete the graph
//! - `export` / `import` - Canonical export and import
//! - `hash` - Compute BLAKE3 cryptographic hash of graph

mod commands;

use crate::config::Config;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tripath_core::TripathError;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// tripath - embedded triple store with path queries
#[derive(Parser, Debug)]
#[command(name = "tripath")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (default: ./tripath.toml if present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding the graphs
    #[arg(short = 'D', long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Graph to work on
    #[arg(short, long, global = true)]
    pub graph: Option<String>,

    /// Storage backend: "redb", "file" (snapshot) or "memory"
    #[arg(short = 'B', long, global = true)]
    pub backend: Option<String>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Server {
        /// Host to bind to
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Show graph status
    Status,

    /// Store one triple
    Put {
        subject: String,
        predicate: String,
        object: String,
    },

    /// Remove one triple
    Delete {
        subject: String,
        predicate: String,
        object: String,
    },

    /// Store triples from a file
    Load {
        /// Path to the input file
        #[arg(short, long)]
        file: PathBuf,

        /// Input format: json (array of {subject, predicate, object}) or
        /// text (one "subject predicate object" per line)
        #[arg(short = 't', long, default_value = "json")]
        format: String,
    },

    /// Store a built-in example dataset
    Seed {
        /// Dataset name (social, movies, knowledge)
        dataset: Option<String>,

        /// Store every dataset
        #[arg(long, conflicts_with = "dataset")]
        all: bool,

        /// List the datasets and exit
        #[arg(long)]
        list: bool,
    },

    /// List nodes or edges
    Scan {
        /// Maximum entries
        #[arg(short, long, default_value = "20")]
        limit: usize,

        /// node or edge
        #[arg(short, long, default_value = "node")]
        kind: String,
    },

    /// Run a query chain, e.g. v('alice').out('follows').all()
    Query {
        /// The chain to run
        chain: String,
    },

    /// Build a node-link view (default: the whole graph)
    View {
        /// Chain to render
        #[arg(long)]
        query: Option<String>,

        /// View name
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Remove every triple
    Clear,

    /// Initialize a new empty graph
    Init {
        /// Force initialization even if the graph exists
        #[arg(short, long)]
        force: bool,
    },

    /// Delete the graph and its files
    Drop,

    /// Export graph in canonical format
    Export {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Export format (canonical, json)
        #[arg(short = 't', long, default_value = "canonical")]
        format: String,
    },

    /// Import triples from a canonical export
    Import {
        /// Input file path
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Compute BLAKE3 cryptographic hash of graph
    Hash,
}

// =============================================================================
// CONFIG RESOLUTION
// =============================================================================

impl Cli {
    /// Config file and environment, overridden by this command line.
    pub fn resolve_config(&self) -> Result<Config, TripathError> {
        let mut config = Config::load(self.config.as_deref())?;
        self.apply_flags(&mut config);
        config.validate()?;
        Ok(config)
    }

    fn apply_flags(&self, config: &mut Config) {
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(graph) = &self.graph {
            config.graph = graph.clone();
        }
        if let Some(backend) = &self.backend {
            config.backend = backend.clone();
        }
        if let Some(Commands::Server { host, port }) = &self.command {
            if let Some(host) = host {
                config.server.host = host.clone();
            }
            if let Some(port) = port {
                config.server.port = *port;
            }
        }
    }
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), TripathError> {
    let config = cli.resolve_config()?;
    let ctx = Context::new(&config, cli.json_mode)?;

    match cli.command {
        Some(Commands::Server { .. }) => cmd_server(&ctx, config.server.clone()).await,
        Some(Commands::Status) | None => cmd_status(&ctx),
        Some(Commands::Put {
            subject,
            predicate,
            object,
        }) => cmd_put(&ctx, &subject, &predicate, &object),
        Some(Commands::Delete {
            subject,
            predicate,
            object,
        }) => cmd_delete(&ctx, &subject, &predicate, &object),
        Some(Commands::Load { file, format }) => cmd_load(&ctx, &file, &format),
        Some(Commands::Seed { dataset, all, list }) => {
            cmd_seed(&ctx, dataset.as_deref(), all, list)
        }
        Some(Commands::Scan { limit, kind }) => cmd_scan(&ctx, limit, &kind),
        Some(Commands::Query { chain }) => cmd_query(&ctx, &chain),
        Some(Commands::View { query, name }) => cmd_view(&ctx, query.as_deref(), name.as_deref()),
        Some(Commands::Clear) => cmd_clear(&ctx),
        Some(Commands::Init { force }) => cmd_init(&ctx, force),
        Some(Commands::Drop) => cmd_drop(&ctx),
        Some(Commands::Export { output, format }) => cmd_export(&ctx, &output, &format),
        Some(Commands::Import { input }) => cmd_import(&ctx, &input),
        Some(Commands::Hash) => cmd_hash(&ctx),
    }
}
