//! # Configuration
//!
//! Settings are layered, later layers winning:
//!
//! 1. Built-in defaults
//! 2. `tripath.toml` in the working directory, or the file given by `--config`
//! 3. Environment variables (`TRIPATH_DATA_DIR`, `TRIPATH_GRAPH`,
//!    `TRIPATH_BACKEND`, `TRIPATH_API_KEY`, `TRIPATH_RATE_LIMIT`,
//!    `TRIPATH_CORS_ORIGINS`)
//! 4. Command-line flags
//!
//! ```toml
//! data_dir = "/var/lib/tripath"
//! graph = "social"
//! backend = "redb"
//!
//! [server]
//! host = "0.0.0.0"
//! port = 8080
//! rate_limit = 100
//! body_limit_bytes = 2097152
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tripath_core::primitives::DEFAULT_GRAPH_NAME;
use tripath_core::{BackendKind, TripathError, validate_graph_name};

/// File read from the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "tripath.toml";

/// Maximum size of a config file (64 KB).
const MAX_CONFIG_FILE_SIZE: u64 = 64 * 1024;

fn default_data_dir() -> PathBuf {
    PathBuf::from("tripath-data")
}

fn default_graph() -> String {
    DEFAULT_GRAPH_NAME.to_string()
}

fn default_backend() -> String {
    BackendKind::default().to_string()
}

// =============================================================================
// CONFIG STRUCTURES
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Root directory holding one sub-directory per named graph.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Graph every command works on.
    #[serde(default = "default_graph")]
    pub graph: String,

    /// `redb`, `file` or `memory`.
    #[serde(default = "default_backend")]
    pub backend: String,

    #[serde(default)]
    pub server: ServerConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Requests per second; 0 disables rate limiting.
    pub rate_limit: u32,
    pub body_limit_bytes: usize,
    /// Bearer key required on every route but `/health`. Unset disables auth.
    pub api_key: Option<String>,
    /// Comma-separated allowed origins, or `*`. Unset means localhost only.
    pub cors_origins: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            rate_limit: 100,
            body_limit_bytes: 2 * 1024 * 1024,
            api_key: None,
            cors_origins: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            graph: default_graph(),
            backend: default_backend(),
            server: ServerConfig::default(),
        }
    }
}

// =============================================================================
// LOADING
// =============================================================================

impl Config {
    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml(text: &str) -> Result<Self, TripathError> {
        toml::from_str(text).map_err(|e| TripathError::invalid(format!("config: {}", e)))
    }

    /// Read a config file.
    pub fn from_file(path: &Path) -> Result<Self, TripathError> {
        let metadata = std::fs::metadata(path).map_err(|e| {
            TripathError::StorageFailure(format!("config {}: {}", path.display(), e))
        })?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(TripathError::invalid(format!(
                "config {} exceeds {} bytes",
                path.display(),
                MAX_CONFIG_FILE_SIZE
            )));
        }
        let text = std::fs::read_to_string(path).map_err(|e| {
            TripathError::StorageFailure(format!("config {}: {}", path.display(), e))
        })?;
        Self::from_toml(&text)
    }

    /// Defaults, then the config file, then the process environment.
    ///
    /// An explicit `path` must exist; the implicit `tripath.toml` is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, TripathError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Overlay `TRIPATH_*` variables read through `lookup`.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), TripathError> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(dir) = var("TRIPATH_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(graph) = var("TRIPATH_GRAPH") {
            self.graph = graph;
        }
        if let Some(backend) = var("TRIPATH_BACKEND") {
            self.backend = backend;
        }
        if let Some(key) = var("TRIPATH_API_KEY") {
            self.server.api_key = Some(key);
        }
        if let Some(rate) = var("TRIPATH_RATE_LIMIT") {
            self.server.rate_limit = rate.trim().parse().map_err(|_| {
                TripathError::invalid(format!("TRIPATH_RATE_LIMIT '{}' is not a number", rate))
            })?;
        }
        if let Some(origins) = var("TRIPATH_CORS_ORIGINS") {
            self.server.cors_origins = Some(origins);
        }
        Ok(())
    }

    /// Check cross-field constraints after all layers were applied.
    pub fn validate(&self) -> Result<(), TripathError> {
        validate_graph_name(&self.graph)?;
        self.backend_kind()?;
        Ok(())
    }

    pub fn backend_kind(&self) -> Result<BackendKind, TripathError> {
        self.backend.parse()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn empty_document_is_default() {
        assert_eq!(Config::from_toml("").expect("parse"), Config::default());
    }

    #[test]
    fn partial_server_table_keeps_other_defaults() {
        let config = Config::from_toml(
            r#"
            graph = "movies"

            [server]
            port = 9000
            "#,
        )
        .expect("parse");

        assert_eq!(config.graph, "movies");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.backend, "redb");
    }

    #[test]
    fn unknown_keys_rejected() {
        let err = Config::from_toml("grpah = \"x\"").expect_err("typo");
        assert!(matches!(err, TripathError::InvalidArgument(_)));
    }

    #[test]
    fn environment_overrides_file() {
        let mut config = Config::from_toml("backend = \"file\"").expect("parse");
        let env: BTreeMap<&str, &str> = [
            ("TRIPATH_BACKEND", "memory"),
            ("TRIPATH_RATE_LIMIT", "7"),
            ("TRIPATH_API_KEY", ""),
        ]
        .into_iter()
        .collect();
        config
            .apply_env(|k| env.get(k).map(|v| (*v).to_string()))
            .expect("env");

        assert_eq!(config.backend_kind().expect("kind"), BackendKind::Memory);
        assert_eq!(config.server.rate_limit, 7);
        assert_eq!(config.server.api_key, None);
    }

    #[test]
    fn bad_rate_limit_rejected() {
        let mut config = Config::default();
        let result = config.apply_env(|k| (k == "TRIPATH_RATE_LIMIT").then(|| "fast".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn validate_checks_graph_and_backend() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());
        config.graph = "Not Valid".to_string();
        assert!(config.validate().is_err());
        config.graph = "ok".to_string();
        config.backend = "sqlite".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn reads_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("tripath.toml");
        std::fs::write(&path, "data_dir = \"/tmp/x\"\n").expect("write");
        let config = Config::from_file(&path).expect("load");
        assert_eq!(config.data_dir, PathBuf::from("/tmp/x"));
        assert!(Config::from_file(&dir.path().join("missing.toml")).is_err());
    }
}
