//! # tripath HTTP API Module
//!
//! This module implements the HTTP REST API server using axum.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /status` - Node and edge counts
//! - `GET /scan?limit=&kind=` - List nodes or edges
//! - `POST /triples` - Store a triple
//! - `POST /triples/batch` - Store many triples
//! - `POST /triples/delete` - Remove a triple
//! - `POST /query` - Run a text chain or a JSON step list
//! - `POST /view` - Node-link view of a query, or of the whole graph
//! - `POST /clear` - Remove every triple
//! - `POST /export` - Canonical export, base64 encoded
//!
//! ## Security Configuration
//!
//! Taken from [`ServerConfig`]: CORS origins (localhost only by default),
//! a global rate limit, and an optional bearer API key.

mod auth;
mod handlers;
mod middleware;
mod types;

pub use auth::keys_match;
pub use handlers::{ApiError, ApiResult};
pub use middleware::create_rate_limiter;
pub use types::{
    BatchRequest, ClearResponse, DeleteResponse, ErrorResponse, ExportResponse, HealthResponse,
    PutResponse, QueryRequest, ScanParams, StatusResponse, StepRequest, TripleRequest,
    ViewRequest, WHOLE_GRAPH_VIEW,
};

use crate::config::ServerConfig;
use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tripath_core::{Session, TripathError};

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state containing the graph session.
#[derive(Clone)]
pub struct AppState {
    /// The session serving every request.
    pub session: Arc<RwLock<Session>>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// State with default server settings.
    #[must_use]
    pub fn new(session: Session) -> Self {
        Self::with_config(session, ServerConfig::default())
    }

    #[must_use]
    pub fn with_config(session: Session, config: ServerConfig) -> Self {
        Self {
            session: Arc::new(RwLock::new(session)),
            config: Arc::new(config),
        }
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

/// Build the CORS layer.
///
/// - `*`: allows all origins
/// - unset: localhost only
/// - otherwise: the comma-separated list of origins
fn build_cors_layer(origins: Option<&str>) -> CorsLayer {
    match origins.map(str::trim) {
        Some("*") => {
            tracing::warn!("CORS: Allowing ALL origins. This is insecure for production!");
            CorsLayer::permissive()
        }
        Some(origins) => {
            let allowed_origins: Vec<HeaderValue> = origins
                .split(',')
                .filter_map(|s| {
                    let trimmed = s.trim();
                    match trimmed.parse::<HeaderValue>() {
                        Ok(hv) => {
                            tracing::info!("CORS: Allowing origin: {}", trimmed);
                            Some(hv)
                        }
                        Err(e) => {
                            tracing::warn!("CORS: Invalid origin '{}': {}", trimmed, e);
                            None
                        }
                    }
                })
                .collect();

            if allowed_origins.is_empty() {
                tracing::warn!("CORS: No valid origins configured, defaulting to localhost only");
                build_localhost_cors()
            } else {
                restricted_cors(allowed_origins)
            }
        }
        None => {
            tracing::info!("CORS: No origins configured, defaulting to localhost only");
            build_localhost_cors()
        }
    }
}

fn restricted_cors(origins: Vec<HeaderValue>) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// Build a restrictive CORS layer that only allows localhost origins.
fn build_localhost_cors() -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        "http://localhost:3000",
        "http://localhost:8080",
        "http://127.0.0.1:3000",
        "http://127.0.0.1:8080",
    ]
    .iter()
    .filter_map(|o| o.parse::<HeaderValue>().ok())
    .collect();

    restricted_cors(origins)
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner):
/// 1. Tracing - logs all requests
/// 2. CORS - handles preflight requests
/// 3. Body limit
/// 4. Rate Limiting - if enabled
/// 5. Authentication - if an API key is configured
pub fn create_router(state: AppState) -> Router {
    let config = Arc::clone(&state.config);

    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/status", get(handlers::status_handler))
        .route("/scan", get(handlers::scan_handler))
        .route("/triples", post(handlers::put_handler))
        .route("/triples/batch", post(handlers::batch_handler))
        .route("/triples/delete", post(handlers::delete_handler))
        .route("/query", post(handlers::query_handler))
        .route("/view", post(handlers::view_handler))
        .route("/clear", post(handlers::clear_handler))
        .route("/export", post(handlers::export_handler));

    match config.api_key.as_deref().filter(|k| !k.is_empty()) {
        Some(key) => {
            tracing::info!("API key authentication enabled");
            router = router.layer(axum_middleware::from_fn_with_state(
                auth::ApiKey::from(key),
                auth::api_key_auth_middleware,
            ));
        }
        None => tracing::warn!(
            "API key authentication DISABLED - all endpoints are publicly accessible! \
             Set server.api_key or TRIPATH_API_KEY to enable authentication."
        ),
    }

    match create_rate_limiter(config.rate_limit) {
        Some(limiter) => {
            tracing::info!("Rate limiting enabled: {} requests/second", config.rate_limit);
            router = router.layer(axum_middleware::from_fn_with_state(
                limiter,
                middleware::rate_limit_middleware,
            ));
        }
        None => tracing::info!("Rate limiting disabled"),
    }

    router
        .layer(axum::extract::DefaultBodyLimit::max(config.body_limit_bytes))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors_layer(config.cors_origins.as_deref())),
        )
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Bind `host:port` from the state's config and serve until Ctrl+C.
pub async fn run_server(state: AppState) -> Result<(), TripathError> {
    let addr = format!("{}:{}", state.config.host, state.config.port);
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| TripathError::StorageFailure(format!("Bind {} failed: {}", addr, e)))?;

    tracing::info!("tripath HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| TripathError::StorageFailure(format!("Server error: {}", e)))
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutting down"),
        Err(e) => {
            tracing::error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
