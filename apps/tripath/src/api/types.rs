//! # API Request/Response Types
//!
//! This module defines the JSON structures for the HTTP API.
//!
//! Query, scan and view responses reuse the engine's own serializable types
//! (`ResultSet`, `ScanResult`, `View`), so the HTTP body of a query is the
//! same JSON a library caller would serialize.

use serde::{Deserialize, Serialize};
use tripath_core::{
    ParsedQuery, Pipeline, Query, Seed, Step, Terminal, Triple, TripathError, parse,
    primitives::LISTING_SCAN_LIMIT,
};

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// STATUS RESPONSE
// =============================================================================

/// Graph status response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub node_count: usize,
    pub edge_count: usize,
    /// Counts are capped at the stats scan bound.
    pub truncated: bool,
    pub persistent: bool,
}

// =============================================================================
// TRIPLE REQUESTS/RESPONSES
// =============================================================================

/// One raw triple, normalized by the engine on the way in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripleRequest {
    pub subject: String,
    pub predicate: String,
    pub object: String,
}

impl From<TripleRequest> for Triple {
    fn from(req: TripleRequest) -> Self {
        Triple::new(req.subject, req.predicate, req.object)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRequest {
    pub triples: Vec<TripleRequest>,
}

/// Response to `POST /triples` and `POST /triples/batch`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PutResponse {
    pub success: bool,
    /// How many triples were new.
    pub added: usize,
    /// How many triples the request carried.
    pub received: usize,
}

/// Response to `POST /triples/delete`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub removed: bool,
}

/// Response to `POST /clear`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearResponse {
    pub success: bool,
}

// =============================================================================
// SCAN QUERY
// =============================================================================

/// `GET /scan?limit=&kind=`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanParams {
    pub limit: Option<usize>,
    /// `node` (default) or `edge`.
    pub kind: Option<String>,
}

impl ScanParams {
    #[must_use]
    pub fn limit_or_default(&self) -> usize {
        self.limit.unwrap_or(LISTING_SCAN_LIMIT)
    }
}

// =============================================================================
// QUERY REQUEST
// =============================================================================

/// One pipeline step in JSON form, e.g. `{"step": "out", "predicate": "follows"}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum StepRequest {
    /// Seed. A missing node list means every node; an empty one is rejected.
    V {
        #[serde(default)]
        nodes: Option<Vec<String>>,
    },
    Out {
        #[serde(default)]
        predicate: Option<String>,
    },
    In {
        #[serde(default)]
        predicate: Option<String>,
    },
    Both {
        #[serde(default)]
        predicate: Option<String>,
    },
    Has {
        predicate: String,
        value: String,
    },
    Is {
        nodes: Vec<String>,
    },
    Tag {
        name: String,
    },
    Back {
        name: String,
    },
    Unique,
    Limit {
        n: i64,
    },
    Skip {
        n: i64,
    },
}

fn seed(nodes: Option<Vec<String>>) -> Seed {
    match nodes {
        Some(nodes) => Seed::Nodes(nodes),
        None => Seed::All,
    }
}

impl StepRequest {
    fn apply(self, p: Pipeline) -> Pipeline {
        match self {
            // A second seed is recorded and rejected by build().
            StepRequest::V { nodes } => p.step(Step::Seed(seed(nodes))),
            StepRequest::Out { predicate } => match predicate {
                Some(pred) => p.out(&pred),
                None => p.out_any(),
            },
            StepRequest::In { predicate } => match predicate {
                Some(pred) => p.inc(&pred),
                None => p.inc_any(),
            },
            StepRequest::Both { predicate } => match predicate {
                Some(pred) => p.both(&pred),
                None => p.both_any(),
            },
            StepRequest::Has { predicate, value } => p.has(&predicate, &value),
            StepRequest::Is { nodes } => p.is(nodes),
            StepRequest::Tag { name } => p.tag(&name),
            StepRequest::Back { name } => p.back(&name),
            StepRequest::Unique => p.unique(),
            StepRequest::Limit { n } => p.try_limit(n),
            StepRequest::Skip { n } => p.try_skip(n),
        }
    }
}

/// Body of `POST /query`: either a text chain or a step list.
///
/// ```json
/// {"query": "v('alice').out('follows').all()"}
/// {"steps": [{"step": "v", "nodes": ["alice"]}, {"step": "out", "predicate": "follows"}], "count": true}
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub steps: Option<Vec<StepRequest>>,
    /// Step lists only: return `{"count": n}` instead of the results.
    #[serde(default)]
    pub count: bool,
}

impl QueryRequest {
    /// A text-chain request.
    pub fn text(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            ..Self::default()
        }
    }

    /// Validate the request into a runnable query.
    pub fn to_parsed(&self) -> Result<ParsedQuery, TripathError> {
        match (&self.query, &self.steps) {
            (Some(_), Some(_)) => Err(TripathError::invalid(
                "give either 'query' or 'steps', not both",
            )),
            (Some(text), None) => parse(text),
            (None, Some(steps)) => {
                let query = build_steps(steps.clone())?;
                let terminal = if self.count {
                    Terminal::Count
                } else {
                    Terminal::All
                };
                Ok(ParsedQuery { query, terminal })
            }
            (None, None) => Err(TripathError::invalid("missing 'query' or 'steps'")),
        }
    }
}

fn build_steps(steps: Vec<StepRequest>) -> Result<Query, TripathError> {
    let mut steps = steps.into_iter();
    let Some(StepRequest::V { nodes }) = steps.next() else {
        return Err(TripathError::invalid(
            "'steps' must start with {\"step\": \"v\"}",
        ));
    };
    steps
        .fold(Pipeline::v(seed(nodes)), |p, step| step.apply(p))
        .build()
}

// =============================================================================
// VIEW REQUEST
// =============================================================================

/// Chain used by `POST /view` when no query is given: every edge, as
/// `from -> to` pairs.
pub const WHOLE_GRAPH_VIEW: &str = "v().tag('from').out().tag('to')";

/// Body of `POST /view`. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ViewRequest {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub steps: Option<Vec<StepRequest>>,
    #[serde(default)]
    pub name: Option<String>,
}

impl ViewRequest {
    /// The pipeline to render and the view name.
    pub fn to_query(&self) -> Result<(Query, String), TripathError> {
        let parsed = match (&self.query, &self.steps) {
            (None, None) => parse(WHOLE_GRAPH_VIEW)?,
            _ => QueryRequest {
                query: self.query.clone(),
                steps: self.steps.clone(),
                count: false,
            }
            .to_parsed()?,
        };
        let name = match (&self.name, parsed.terminal) {
            (Some(name), _) => name.clone(),
            (None, Terminal::View(name)) => name,
            (None, _) => "view".to_string(),
        };
        Ok((parsed.query, name))
    }
}

// =============================================================================
// ERROR / EXPORT RESPONSES
// =============================================================================

/// Body of every failed request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            error: msg.into(),
        }
    }
}

/// Export response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportResponse {
    pub success: bool,
    pub data: String, // Base64 encoded
    pub checksum: u64,
    pub triple_count: usize,
}

impl ExportResponse {
    pub fn new(data: &[u8], checksum: u64, triple_count: usize) -> Self {
        Self {
            success: true,
            data: base64::Engine::encode(&base64::engine::general_purpose::STANDARD, data),
            checksum,
            triple_count,
        }
    }
}
