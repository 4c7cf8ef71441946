//! # tripath
//!
//! Binary entry point: logging setup, argument parsing, dispatch.
//! See the library crate docs for the architecture.

use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    let cli = tripath::cli::Cli::parse();
    let default_filter = if cli.verbose {
        "tripath=debug,tripath_core=debug,tower_http=debug"
    } else {
        "tripath=info,tripath_core=info,tower_http=debug"
    };

    // TRIPATH_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("TRIPATH_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = EnvFilter::try_from_env("TRIPATH_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| default_filter.into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = tripath::cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the tripath startup banner.
fn print_banner() {
    println!(
        r#"
  ┌┬┐┬─┐┬┌─┐┌─┐┌┬┐┬ ┬
   │ ├┬┘│├─┘├─┤ │ ├─┤
   ┴ ┴└─┴┴  ┴ ┴ ┴ ┴ ┴

  Triple store with path queries v{}
"#,
        env!("CARGO_PKG_VERSION")
    );
}
