//! # tripath
//!
//! Server and CLI for the tripath triple store.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   apps/tripath (THE BINARY)                 │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌────────────────┐   │
//! │  │   CLI       │    │   HTTP API  │    │  Config        │   │
//! │  │  (clap)     │    │   (axum)    │    │  (toml + env)  │   │
//! │  └──────┬──────┘    └──────┬──────┘    └───────┬────────┘   │
//! │         │                  │                   │            │
//! │         └──────────────────┼───────────────────┘            │
//! │                            ▼                                │
//! │                    ┌───────────────┐                        │
//! │                    │ tripath-core  │                        │
//! │                    │ (THE LOGIC)   │                        │
//! │                    └───────────────┘                        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Start the HTTP server
//! tripath server --host 0.0.0.0 --port 8080
//!
//! # CLI operations
//! tripath seed social
//! tripath query "v('alice').out('follows').all()"
//! tripath --graph movies --backend file status
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod datasets;
