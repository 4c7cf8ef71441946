//! Unit tests for API types serialization/deserialization.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use tripath::api::{
    BatchRequest, ErrorResponse, ExportResponse, HealthResponse, PutResponse, QueryRequest,
    ScanParams, StatusResponse, StepRequest, TripleRequest, ViewRequest, WHOLE_GRAPH_VIEW,
};
use tripath_core::{Terminal, Triple, parse};

// =============================================================================
// HEALTH & STATUS RESPONSE TESTS
// =============================================================================

#[test]
fn test_health_response_default() {
    let health = HealthResponse::default();
    assert_eq!(health.status, "ok");
    assert!(!health.version.is_empty());
}

#[test]
fn test_health_response_deserialization() {
    let json = r#"{"status":"healthy","version":"1.0.0"}"#;
    let health: HealthResponse = serde_json::from_str(json).unwrap();

    assert_eq!(health.status, "healthy");
    assert_eq!(health.version, "1.0.0");
}

#[test]
fn test_status_response_serialization() {
    let status = StatusResponse {
        node_count: 100,
        edge_count: 250,
        truncated: false,
        persistent: true,
    };

    let json = serde_json::to_string(&status).unwrap();
    assert!(json.contains("\"node_count\":100"));
    assert!(json.contains("\"edge_count\":250"));
    assert!(json.contains("\"truncated\":false"));
    assert!(json.contains("\"persistent\":true"));
}

// =============================================================================
// TRIPLE REQUEST TESTS
// =============================================================================

#[test]
fn test_triple_request_into_triple() {
    let json = r#"{"subject":"Alice","predicate":"follows","object":"Bob"}"#;
    let request: TripleRequest = serde_json::from_str(json).unwrap();

    // Conversion keeps raw terms; the engine normalizes on put.
    assert_eq!(Triple::from(request), Triple::new("Alice", "follows", "Bob"));
}

#[test]
fn test_triple_request_missing_field_rejected() {
    let json = r#"{"subject":"alice","predicate":"follows"}"#;
    assert!(serde_json::from_str::<TripleRequest>(json).is_err());
}

#[test]
fn test_batch_request_deserialization() {
    let json = r#"{"triples":[{"subject":"a","predicate":"x","object":"b"}]}"#;
    let batch: BatchRequest = serde_json::from_str(json).unwrap();
    assert_eq!(batch.triples.len(), 1);
    assert_eq!(batch.triples[0].object, "b");
}

#[test]
fn test_put_response_serialization() {
    let response = PutResponse {
        success: true,
        added: 2,
        received: 3,
    };
    let json = serde_json::to_string(&response).unwrap();
    assert_eq!(json, r#"{"success":true,"added":2,"received":3}"#);
}

// =============================================================================
// SCAN PARAMS TESTS
// =============================================================================

#[test]
fn test_scan_params_default_limit() {
    let params = ScanParams::default();
    assert_eq!(
        params.limit_or_default(),
        tripath_core::primitives::LISTING_SCAN_LIMIT
    );

    let params = ScanParams {
        limit: Some(5),
        kind: None,
    };
    assert_eq!(params.limit_or_default(), 5);
}

// =============================================================================
// STEP REQUEST TESTS
// =============================================================================

#[test]
fn test_step_request_tagged_by_step() {
    let json = r#"[
        {"step": "v", "nodes": ["alice"]},
        {"step": "out", "predicate": "follows"},
        {"step": "in"},
        {"step": "has", "predicate": "likes", "value": "python"},
        {"step": "tag", "name": "x"},
        {"step": "unique"},
        {"step": "limit", "n": 3}
    ]"#;
    let steps: Vec<StepRequest> = serde_json::from_str(json).unwrap();

    assert_eq!(steps.len(), 7);
    assert!(matches!(&steps[0], StepRequest::V { nodes: Some(nodes) } if nodes == &["alice"]));
    assert!(matches!(&steps[1], StepRequest::Out { predicate: Some(p) } if p == "follows"));
    assert!(matches!(&steps[2], StepRequest::In { predicate: None }));
    assert!(matches!(&steps[6], StepRequest::Limit { n: 3 }));
}

#[test]
fn test_step_request_unknown_step_rejected() {
    let json = r#"{"step": "teleport"}"#;
    assert!(serde_json::from_str::<StepRequest>(json).is_err());
}

// =============================================================================
// QUERY REQUEST TESTS
// =============================================================================

#[test]
fn test_query_request_text() {
    let request = QueryRequest::text("v('alice').out('follows').count()");
    let parsed = request.to_parsed().unwrap();

    assert_eq!(parsed.terminal, Terminal::Count);
    assert_eq!(parsed, parse("v('alice').out('follows').count()").unwrap());
}

#[test]
fn test_query_request_steps_equal_text() {
    let json = r#"{"steps":[{"step":"v","nodes":["alice"]},{"step":"out","predicate":"follows"}]}"#;
    let request: QueryRequest = serde_json::from_str(json).unwrap();
    let parsed = request.to_parsed().unwrap();

    assert_eq!(parsed.terminal, Terminal::All);
    assert_eq!(
        parsed.query,
        parse("v('alice').out('follows')").unwrap().query
    );
}

#[test]
fn test_query_request_steps_must_start_with_v() {
    let json = r#"{"steps":[{"step":"out"}]}"#;
    let request: QueryRequest = serde_json::from_str(json).unwrap();
    assert!(request.to_parsed().is_err());
}

#[test]
fn test_query_request_second_seed_rejected() {
    let json = r#"{"steps":[{"step":"v"},{"step":"v","nodes":["a"]}]}"#;
    let request: QueryRequest = serde_json::from_str(json).unwrap();
    assert!(request.to_parsed().is_err());
}

#[test]
fn test_query_request_seed_list_forms() {
    let missing: QueryRequest = serde_json::from_str(r#"{"steps":[{"step":"v"}]}"#).unwrap();
    assert_eq!(missing.to_parsed().unwrap(), parse("v()").unwrap());

    // An explicit empty list is an error in both forms.
    let empty: QueryRequest =
        serde_json::from_str(r#"{"steps":[{"step":"v","nodes":[]}]}"#).unwrap();
    assert!(empty.to_parsed().is_err());
    assert!(QueryRequest::text("v([])").to_parsed().is_err());
}

#[test]
fn test_query_request_needs_one_form() {
    assert!(QueryRequest::default().to_parsed().is_err());

    let both = QueryRequest {
        query: Some("v()".to_string()),
        steps: Some(vec![StepRequest::V { nodes: None }]),
        count: false,
    };
    assert!(both.to_parsed().is_err());
}

// =============================================================================
// VIEW REQUEST TESTS
// =============================================================================

#[test]
fn test_view_request_defaults_to_whole_graph() {
    let (query, name) = ViewRequest::default().to_query().unwrap();

    assert_eq!(name, "view");
    assert_eq!(query, parse(WHOLE_GRAPH_VIEW).unwrap().query);
}

#[test]
fn test_view_request_name_precedence() {
    let request = ViewRequest {
        query: Some("v().tag('a').out().view('chain')".to_string()),
        ..ViewRequest::default()
    };
    assert_eq!(request.to_query().unwrap().1, "chain");

    let request = ViewRequest {
        name: Some("explicit".to_string()),
        ..request
    };
    assert_eq!(request.to_query().unwrap().1, "explicit");
}

// =============================================================================
// ERROR & EXPORT RESPONSE TESTS
// =============================================================================

#[test]
fn test_error_response_shape() {
    let json = serde_json::to_string(&ErrorResponse::new("bad input")).unwrap();
    assert_eq!(json, r#"{"success":false,"error":"bad input"}"#);
}

#[test]
fn test_export_response_encodes_base64() {
    let response = ExportResponse::new(b"TPX", 7, 1);

    assert!(response.success);
    assert_eq!(response.data, "VFBY");
    assert_eq!(response.checksum, 7);
    assert_eq!(response.triple_count, 1);
}
