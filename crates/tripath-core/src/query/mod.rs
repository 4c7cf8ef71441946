//! # Query Module
//!
//! The path-query pipeline: an immutable, ordered list of traversal steps.
//!
//! - Building is pure: no step touches storage until materialization
//! - Each chaining call consumes the pipeline and returns a new one
//! - Construction mistakes surface from [`Pipeline::build`], never later
//!
//! ```
//! use tripath_core::{Pipeline, Session};
//!
//! let mut session = Session::new();
//! session.put("alice", "follows", "bob").expect("put");
//!
//! let query = Pipeline::v("alice").out("follows").build().expect("build");
//! let result = session.all(&query).expect("all");
//! assert_eq!(result.ids(), vec!["bob"]);
//! ```

pub mod parse;

pub use parse::{ParsedQuery, Terminal, parse};

use crate::ingestor::Ingestor;
use crate::primitives::{MAX_PIPELINE_STEPS, MAX_SEED_NODES};
use crate::TripathError;
use std::collections::BTreeSet;
use std::fmt;

// =============================================================================
// SEED
// =============================================================================

/// Where a traversal starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Seed {
    /// Every node. Left deferred until the first step that needs it.
    All,
    /// An explicit set of starting nodes, in the given order.
    Nodes(Vec<String>),
}

impl From<&str> for Seed {
    fn from(node: &str) -> Self {
        Self::Nodes(vec![node.to_string()])
    }
}

impl From<String> for Seed {
    fn from(node: String) -> Self {
        Self::Nodes(vec![node])
    }
}

impl From<Vec<String>> for Seed {
    fn from(nodes: Vec<String>) -> Self {
        Self::Nodes(nodes)
    }
}

impl<const N: usize> From<[&str; N]> for Seed {
    fn from(nodes: [&str; N]) -> Self {
        Self::Nodes(nodes.iter().map(|n| (*n).to_string()).collect())
    }
}

// =============================================================================
// STEP
// =============================================================================

/// One stage of a traversal pipeline.
///
/// `None` on an edge step means "any predicate".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Seed(Seed),
    Out(Option<String>),
    In(Option<String>),
    Both(Option<String>),
    Has { predicate: String, value: String },
    Is(Vec<String>),
    Tag(String),
    Back(String),
    Unique,
    Limit(usize),
    Skip(usize),
}

fn write_quoted(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    write!(f, "\"")?;
    for c in s.chars() {
        if c == '"' || c == '\\' {
            write!(f, "\\")?;
        }
        write!(f, "{}", c)?;
    }
    write!(f, "\"")
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[String]) -> fmt::Result {
    if let [single] = items {
        return write_quoted(f, single);
    }
    write!(f, "[")?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write_quoted(f, item)?;
    }
    write!(f, "]")
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let edge = |f: &mut fmt::Formatter<'_>, name: &str, p: &Option<String>| {
            write!(f, ".{}(", name)?;
            if let Some(p) = p {
                write_quoted(f, p)?;
            }
            write!(f, ")")
        };
        match self {
            Step::Seed(Seed::All) => write!(f, "v()"),
            Step::Seed(Seed::Nodes(nodes)) => {
                write!(f, "v(")?;
                write_list(f, nodes)?;
                write!(f, ")")
            }
            Step::Out(p) => edge(f, "out", p),
            Step::In(p) => edge(f, "inc", p),
            Step::Both(p) => edge(f, "both", p),
            Step::Has { predicate, value } => {
                write!(f, ".has(")?;
                write_quoted(f, predicate)?;
                write!(f, ", ")?;
                write_quoted(f, value)?;
                write!(f, ")")
            }
            Step::Is(nodes) => {
                write!(f, ".is(")?;
                write_list(f, nodes)?;
                write!(f, ")")
            }
            Step::Tag(name) => {
                write!(f, ".tag(")?;
                write_quoted(f, name)?;
                write!(f, ")")
            }
            Step::Back(name) => {
                write!(f, ".back(")?;
                write_quoted(f, name)?;
                write!(f, ")")
            }
            Step::Unique => write!(f, ".unique()"),
            Step::Limit(n) => write!(f, ".limit({})", n),
            Step::Skip(n) => write!(f, ".skip({})", n),
        }
    }
}

// =============================================================================
// PIPELINE (BUILDER)
// =============================================================================

/// An unvalidated, chainable pipeline.
///
/// Node names and predicates are normalized the same way triples are, so
/// `v("Alice")` finds the node stored as `alice`. Tag names are only trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    steps: Vec<Step>,
    /// First construction error, reported by `build`.
    error: Option<String>,
}

impl Pipeline {
    /// Start a traversal from `seed`.
    #[must_use]
    pub fn v(seed: impl Into<Seed>) -> Self {
        let seed = match seed.into() {
            Seed::All => Seed::All,
            Seed::Nodes(nodes) => Seed::Nodes(normalize_all(nodes)),
        };
        Self {
            steps: vec![Step::Seed(seed)],
            error: None,
        }
    }

    /// Start a traversal from every node.
    #[must_use]
    pub fn v_all() -> Self {
        Self::v(Seed::All)
    }

    fn push(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    fn fail(mut self, msg: String) -> Self {
        if self.error.is_none() {
            self.error = Some(msg);
        }
        self
    }

    /// Append an already-formed step. Names are normalized like the typed methods.
    #[must_use]
    pub fn step(self, step: Step) -> Self {
        match step {
            Step::Seed(_) => self.fail("v() may only start a pipeline".to_string()),
            Step::Out(p) => self.push(Step::Out(p.map(|p| Ingestor::normalize_term(&p)))),
            Step::In(p) => self.push(Step::In(p.map(|p| Ingestor::normalize_term(&p)))),
            Step::Both(p) => self.push(Step::Both(p.map(|p| Ingestor::normalize_term(&p)))),
            Step::Has { predicate, value } => self.push(Step::Has {
                predicate: Ingestor::normalize_term(&predicate),
                value: Ingestor::normalize_term(&value),
            }),
            Step::Is(nodes) => self.push(Step::Is(normalize_all(nodes))),
            Step::Tag(name) => self.push(Step::Tag(name.trim().to_string())),
            Step::Back(name) => self.push(Step::Back(name.trim().to_string())),
            other => self.push(other),
        }
    }

    /// Follow outgoing edges labeled `predicate`.
    #[must_use]
    pub fn out(self, predicate: &str) -> Self {
        self.step(Step::Out(Some(predicate.to_string())))
    }

    /// Follow every outgoing edge.
    #[must_use]
    pub fn out_any(self) -> Self {
        self.push(Step::Out(None))
    }

    /// Follow incoming edges labeled `predicate`.
    #[must_use]
    pub fn inc(self, predicate: &str) -> Self {
        self.step(Step::In(Some(predicate.to_string())))
    }

    /// Follow every incoming edge.
    #[must_use]
    pub fn inc_any(self) -> Self {
        self.push(Step::In(None))
    }

    /// Follow edges labeled `predicate` in both directions.
    #[must_use]
    pub fn both(self, predicate: &str) -> Self {
        self.step(Step::Both(Some(predicate.to_string())))
    }

    #[must_use]
    pub fn both_any(self) -> Self {
        self.push(Step::Both(None))
    }

    /// Keep nodes that are the subject of a `(predicate, value)` triple.
    #[must_use]
    pub fn has(self, predicate: &str, value: &str) -> Self {
        self.step(Step::Has {
            predicate: predicate.to_string(),
            value: value.to_string(),
        })
    }

    /// Keep bindings whose current node is one of `nodes`.
    #[must_use]
    pub fn is<I, T>(self, nodes: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.step(Step::Is(nodes.into_iter().map(Into::into).collect()))
    }

    /// Record the current node under `name`.
    #[must_use]
    pub fn tag(self, name: &str) -> Self {
        self.step(Step::Tag(name.to_string()))
    }

    /// Return to the node recorded under `name`.
    #[must_use]
    pub fn back(self, name: &str) -> Self {
        self.step(Step::Back(name.to_string()))
    }

    /// Drop repeated current nodes, keeping the first occurrence.
    #[must_use]
    pub fn unique(self) -> Self {
        self.push(Step::Unique)
    }

    /// Keep the first `n` bindings.
    #[must_use]
    pub fn limit(self, n: usize) -> Self {
        self.push(Step::Limit(n))
    }

    /// Drop the first `n` bindings.
    #[must_use]
    pub fn skip(self, n: usize) -> Self {
        self.push(Step::Skip(n))
    }

    /// `limit` from untyped input; a negative count fails at build time.
    #[must_use]
    pub fn try_limit(self, n: i64) -> Self {
        match usize::try_from(n) {
            Ok(n) => self.limit(n),
            Err(_) => self.fail(format!("limit must be non-negative, got {}", n)),
        }
    }

    /// `skip` from untyped input; a negative count fails at build time.
    #[must_use]
    pub fn try_skip(self, n: i64) -> Self {
        match usize::try_from(n) {
            Ok(n) => self.skip(n),
            Err(_) => self.fail(format!("skip must be non-negative, got {}", n)),
        }
    }

    /// Steps appended so far.
    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Validate and freeze the pipeline.
    ///
    /// # Errors
    ///
    /// Returns `TripathError::InvalidArgument` if:
    /// - A count was negative
    /// - The seed is an empty node list
    /// - A predicate, value, node or tag name is empty
    /// - A tag is named `id` (reserved for the current node)
    /// - `back` names a tag not recorded earlier
    /// - The pipeline has more than `MAX_PIPELINE_STEPS` steps
    pub fn build(&self) -> Result<Query, TripathError> {
        if let Some(msg) = &self.error {
            return Err(TripathError::invalid(msg.clone()));
        }
        if self.steps.len() > MAX_PIPELINE_STEPS {
            return Err(TripathError::invalid(format!(
                "pipeline has {} steps, maximum is {}",
                self.steps.len(),
                MAX_PIPELINE_STEPS
            )));
        }

        let mut steps = Vec::with_capacity(self.steps.len());
        let mut tags: Vec<String> = Vec::new();

        for (i, step) in self.steps.iter().enumerate() {
            let step = match step {
                Step::Seed(_) if i > 0 => {
                    return Err(TripathError::invalid("v() may only start a pipeline"));
                }
                Step::Seed(Seed::Nodes(nodes)) if nodes.is_empty() => {
                    return Err(TripathError::invalid(
                        "v() was given an empty node list; use v() for every node",
                    ));
                }
                Step::Seed(Seed::Nodes(nodes)) => Step::Seed(Seed::Nodes(node_set(nodes, "v")?)),
                Step::Is(nodes) => Step::Is(node_set(nodes, "is")?),
                Step::Out(Some(p)) | Step::In(Some(p)) | Step::Both(Some(p)) if p.is_empty() => {
                    return Err(TripathError::invalid("predicate must not be empty"));
                }
                Step::Has { predicate, value } if predicate.is_empty() || value.is_empty() => {
                    return Err(TripathError::invalid(
                        "has() needs a non-empty predicate and value",
                    ));
                }
                Step::Tag(name) => {
                    if name.is_empty() {
                        return Err(TripathError::invalid("tag name must not be empty"));
                    }
                    if name == "id" {
                        return Err(TripathError::invalid("tag name 'id' is reserved"));
                    }
                    if !tags.contains(name) {
                        tags.push(name.clone());
                    }
                    step.clone()
                }
                Step::Back(name) if !tags.contains(name) => {
                    return Err(TripathError::invalid(format!(
                        "back('{}') refers to a tag not recorded earlier",
                        name
                    )));
                }
                other => other.clone(),
            };
            steps.push(step);
        }

        if !matches!(steps.first(), Some(Step::Seed(_))) {
            return Err(TripathError::invalid("pipeline must start with v()"));
        }

        Ok(Query { steps, tags })
    }
}

fn normalize_all(nodes: Vec<String>) -> Vec<String> {
    nodes.iter().map(|n| Ingestor::normalize_term(n)).collect()
}

/// Deduplicate while keeping first-seen order; reject empty names.
fn node_set(nodes: &[String], op: &str) -> Result<Vec<String>, TripathError> {
    if nodes.len() > MAX_SEED_NODES {
        return Err(TripathError::invalid(format!(
            "{}() takes at most {} nodes, got {}",
            op,
            MAX_SEED_NODES,
            nodes.len()
        )));
    }
    let mut seen = BTreeSet::new();
    let mut out = Vec::with_capacity(nodes.len());
    for node in nodes {
        if node.is_empty() {
            return Err(TripathError::invalid(format!(
                "{}() node names must not be empty",
                op
            )));
        }
        if seen.insert(node.as_str()) {
            out.push(node.clone());
        }
    }
    Ok(out)
}

// =============================================================================
// QUERY (VALIDATED)
// =============================================================================

/// A validated pipeline, ready to materialize any number of times.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    steps: Vec<Step>,
    tags: Vec<String>,
}

impl Query {
    /// The steps, starting with the seed.
    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Distinct tag names in the order they are first recorded.
    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for step in &self.steps {
            write!(f, "{}", step)?;
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

    #[test]
    fn builder_is_immutable_value() {
        let base = Pipeline::v("alice").out("follows");
        let a = base.clone().limit(1);
        let b = base.clone().unique();
        assert_eq!(base.steps().len(), 2);
        assert_eq!(a.steps().last(), Some(&Step::Limit(1)));
        assert_eq!(b.steps().last(), Some(&Step::Unique));
    }

    #[test]
    fn names_are_normalized() {
        let q = Pipeline::v(" Alice ")
            .out("FOLLOWS")
            .has("Likes", "Python")
            .tag(" From ")
            .build()
            .expect("build");
        assert_eq!(
            q.steps(),
            &[
                Step::Seed(Seed::Nodes(vec!["alice".to_string()])),
                Step::Out(Some("follows".to_string())),
                Step::Has {
                    predicate: "likes".to_string(),
                    value: "python".to_string()
                },
                Step::Tag("From".to_string()),
            ]
        );
    }

    #[test]
    fn seed_nodes_are_deduplicated_in_order() {
        let q = Pipeline::v(["b", "a", "B"]).build().expect("build");
        assert_eq!(
            q.steps()[0],
            Step::Seed(Seed::Nodes(vec!["b".to_string(), "a".to_string()]))
        );
    }

    #[test]
    fn negative_limit_fails_at_build() {
        let p = Pipeline::v_all().try_limit(-1);
        assert!(matches!(p.build(), Err(TripathError::InvalidArgument(_))));

        let p = Pipeline::v_all().try_skip(-5).limit(3);
        assert!(matches!(p.build(), Err(TripathError::InvalidArgument(_))));

        assert!(Pipeline::v_all().try_limit(0).build().is_ok());
    }

    #[test]
    fn empty_names_rejected() {
        assert!(Pipeline::v_all().out("  ").build().is_err());
        assert!(Pipeline::v_all().tag("").build().is_err());
        assert!(Pipeline::v_all().has("likes", "").build().is_err());
        assert!(Pipeline::v("").build().is_err());
        assert!(Pipeline::v(Vec::<String>::new()).build().is_err());
    }

    #[test]
    fn back_needs_earlier_tag() {
        assert!(Pipeline::v_all().back("start").build().is_err());
        assert!(Pipeline::v_all().out_any().back("start").tag("start").build().is_err());
        assert!(Pipeline::v_all().tag("start").out_any().back("start").build().is_ok());
    }

    #[test]
    fn reserved_tag_rejected() {
        assert!(Pipeline::v_all().tag("id").build().is_err());
    }

    #[test]
    fn seed_only_at_start() {
        let p = Pipeline::v_all().step(Step::Seed(Seed::All));
        assert!(p.build().is_err());
    }

    #[test]
    fn step_count_bounded() {
        let mut p = Pipeline::v_all();
        for _ in 0..MAX_PIPELINE_STEPS {
            p = p.unique();
        }
        assert!(p.build().is_err());
    }

    #[test]
    fn tags_listed_once_in_order() {
        let q = Pipeline::v_all()
            .tag("a")
            .out_any()
            .tag("b")
            .out_any()
            .tag("a")
            .build()
            .expect("build");
        assert_eq!(q.tags(), &["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn display_renders_chain() {
        let q = Pipeline::v(["a", "b"])
            .out_any()
            .inc("knows")
            .tag("t")
            .limit(2)
            .build()
            .expect("build");
        assert_eq!(
            q.to_string(),
            r#"v(["a", "b"]).out().inc("knows").tag("t").limit(2)"#
        );
    }
}
