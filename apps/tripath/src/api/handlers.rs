//! # API Endpoint Handlers
//!
//! This module implements the actual HTTP endpoint handlers.
//!
//! Every handler returns `ApiResult<T>`: a JSON body on success, or an
//! [`ApiError`] that renders as `{"success": false, "error": "..."}` with a
//! status derived from the engine error.

use super::{
    AppState,
    types::{
        BatchRequest, ClearResponse, DeleteResponse, ErrorResponse, ExportResponse,
        HealthResponse, PutResponse, QueryRequest, ScanParams, StatusResponse, TripleRequest,
        ViewRequest,
    },
};
use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tripath_core::{
    QueryOutput, ScanKind, ScanResult, Triple, TripathError, TripleStore, View,
    primitives::STATS_SCAN_LIMIT,
};

// =============================================================================
// ERROR MAPPING
// =============================================================================

/// An engine error on its way to becoming an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub TripathError);

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self.0 {
            TripathError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            TripathError::NotFound(_) => StatusCode::NOT_FOUND,
            TripathError::StorageFailure(_) | TripathError::SerializationError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<TripathError> for ApiError {
    fn from(e: TripathError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        } else {
            tracing::debug!(error = %self.0, "request rejected");
        }
        (status, Json(ErrorResponse::new(self.0.to_string()))).into_response()
    }
}

pub type ApiResult<T> = Result<Json<T>, ApiError>;

// =============================================================================
// HEALTH HANDLER
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

// =============================================================================
// STATUS & SCAN HANDLERS
// =============================================================================

/// Get graph status.
pub async fn status_handler(State(state): State<AppState>) -> ApiResult<StatusResponse> {
    let session = state.session.read().await;
    let stats = session.stats()?;

    Ok(Json(StatusResponse {
        node_count: stats.nodes,
        edge_count: stats.edges,
        truncated: stats.truncated,
        persistent: session.is_persistent(),
    }))
}

/// List nodes or edges.
///
/// `limit` defaults to the listing size and is capped at the stats bound.
pub async fn scan_handler(
    State(state): State<AppState>,
    Query(params): Query<ScanParams>,
) -> ApiResult<ScanResult> {
    let kind = match &params.kind {
        Some(kind) => kind.parse::<ScanKind>()?,
        None => ScanKind::Node,
    };
    let limit = params.limit_or_default().min(STATS_SCAN_LIMIT);

    let session = state.session.read().await;
    Ok(Json(session.scan(limit, kind)?))
}

// =============================================================================
// TRIPLE HANDLERS
// =============================================================================

/// Store one triple.
pub async fn put_handler(
    State(state): State<AppState>,
    Json(request): Json<TripleRequest>,
) -> ApiResult<PutResponse> {
    let mut session = state.session.write().await;
    let added = session.put(&request.subject, &request.predicate, &request.object)?;

    Ok(Json(PutResponse {
        success: true,
        added: usize::from(added),
        received: 1,
    }))
}

/// Store many triples; nothing is stored if any of them is invalid.
pub async fn batch_handler(
    State(state): State<AppState>,
    Json(request): Json<BatchRequest>,
) -> ApiResult<PutResponse> {
    let triples: Vec<Triple> = request.triples.into_iter().map(Triple::from).collect();
    let received = triples.len();

    let mut session = state.session.write().await;
    let added = session.put_batch(&triples)?;
    tracing::info!(added, received, "batch stored");

    Ok(Json(PutResponse {
        success: true,
        added,
        received,
    }))
}

/// Remove one triple. Removing an absent triple is not an error.
pub async fn delete_handler(
    State(state): State<AppState>,
    Json(request): Json<TripleRequest>,
) -> ApiResult<DeleteResponse> {
    let mut session = state.session.write().await;
    let removed = session.delete(&request.subject, &request.predicate, &request.object)?;

    Ok(Json(DeleteResponse {
        success: true,
        removed,
    }))
}

/// Remove every triple.
pub async fn clear_handler(State(state): State<AppState>) -> ApiResult<ClearResponse> {
    let mut session = state.session.write().await;
    session.delete_all()?;
    tracing::info!("graph cleared");

    Ok(Json(ClearResponse { success: true }))
}

// =============================================================================
// QUERY & VIEW HANDLERS
// =============================================================================

/// Run a text chain or a JSON step list.
pub async fn query_handler(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> ApiResult<QueryOutput> {
    let parsed = request.to_parsed()?;
    tracing::debug!(query = %parsed.query, "query");

    let session = state.session.read().await;
    Ok(Json(session.execute(&parsed)?))
}

/// Build a node-link view; without a query, of the whole graph.
pub async fn view_handler(
    State(state): State<AppState>,
    Json(request): Json<ViewRequest>,
) -> ApiResult<View> {
    let (query, name) = request.to_query()?;

    let session = state.session.read().await;
    Ok(Json(session.view(&query, &name)?))
}

// =============================================================================
// EXPORT HANDLER
// =============================================================================

/// Export graph in canonical format.
pub async fn export_handler(State(state): State<AppState>) -> ApiResult<ExportResponse> {
    let session = state.session.read().await;
    let data = session.export_canonical()?;
    let checksum = session.checksum()?;
    let triple_count = session.store().triple_count()?;

    Ok(Json(ExportResponse::new(&data, checksum, triple_count)))
}
