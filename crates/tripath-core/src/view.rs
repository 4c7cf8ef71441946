//! # View Builder
//!
//! Turns a tagged result set into a node-link structure that a renderer can
//! draw. The engine only supplies the data; no markup is produced here.
//!
//! Each result contributes a path: its tag values in the order the query
//! records them, followed by its current node. Consecutive path entries
//! become links. When the query joins two entries with a single `out`, `in`
//! or `both` step, the links are exactly the stored triples that step could
//! have followed. So `v().tag("from").out().tag("to").view("graph")` draws
//! every edge of the graph, self-loops included, and
//! `v("alice").tag("a").out("follows").tag("b")` draws only `follows` edges.
//! Entries further apart are linked by any joining triple, or by one
//! unlabeled link when none exists.

use crate::query::{Query, Step};
use crate::store::TripleStore;
use crate::{ResultSet, TripathError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewNode {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ViewLink {
    pub source: String,
    pub target: String,
    /// Predicate of the joining triple; `None` if the two nodes are not
    /// directly connected (e.g. tags several hops apart).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// A named node-link diagram.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct View {
    pub name: String,
    pub nodes: Vec<ViewNode>,
    pub links: Vec<ViewLink>,
}

/// A step that moves the current node.
#[derive(Debug, Clone, Copy)]
enum Hop<'q> {
    Out(Option<&'q str>),
    In(Option<&'q str>),
    Both(Option<&'q str>),
    Back,
}

/// One path entry: a tag (`None` for the current node) and the hops taken
/// since the previous entry.
#[derive(Debug)]
struct Mark<'q> {
    tag: Option<&'q str>,
    hops: Vec<Hop<'q>>,
}

/// Path entries of `query` in step order.
///
/// A re-recorded tag only keeps its last position, so the hops leading to
/// the earlier one are carried into the entry after it.
fn marks(query: &Query) -> Vec<Mark<'_>> {
    let mut marks: Vec<Mark<'_>> = Vec::new();
    let mut hops = Vec::new();

    for step in query.steps() {
        match step {
            Step::Out(p) => hops.push(Hop::Out(p.as_deref())),
            Step::In(p) => hops.push(Hop::In(p.as_deref())),
            Step::Both(p) => hops.push(Hop::Both(p.as_deref())),
            Step::Back(_) => hops.push(Hop::Back),
            Step::Tag(name) => {
                if let Some(i) = marks.iter().position(|m| m.tag == Some(name.as_str())) {
                    let mut earlier = marks.remove(i).hops;
                    let next = match marks.get_mut(i) {
                        Some(next) => &mut next.hops,
                        None => &mut hops,
                    };
                    earlier.append(next);
                    *next = earlier;
                }
                marks.push(Mark {
                    tag: Some(name.as_str()),
                    hops: std::mem::take(&mut hops),
                });
            }
            _ => {}
        }
    }

    marks.push(Mark { tag: None, hops });
    marks
}

impl View {
    /// Build a view of `query`'s `results`, reading the store only to label
    /// links.
    ///
    /// Nodes and links appear in first-seen order, each once.
    pub fn build<S: TripleStore + ?Sized>(
        store: &S,
        name: &str,
        query: &Query,
        results: &ResultSet,
    ) -> Result<Self, TripathError> {
        let mut view = View {
            name: name.to_string(),
            ..View::default()
        };
        let mut seen_nodes = BTreeSet::new();
        let mut seen_links = BTreeSet::new();
        let marks = marks(query);

        for binding in &results.result {
            let mut previous: Option<&str> = None;
            let mut hops: Vec<Hop<'_>> = Vec::new();

            for mark in &marks {
                hops.extend_from_slice(&mark.hops);
                let node = match mark.tag {
                    Some(tag) => binding.tag(tag),
                    None => Some(binding.node.as_str()),
                };
                let Some(node) = node else {
                    continue;
                };

                if seen_nodes.insert(node.to_string()) {
                    view.nodes.push(ViewNode {
                        id: node.to_string(),
                    });
                }
                if let Some(from) = previous {
                    for link in links_between(store, from, node, &hops)? {
                        if seen_links.insert(link.clone()) {
                            view.links.push(link);
                        }
                    }
                }
                previous = Some(node);
                hops.clear();
            }
        }

        Ok(view)
    }
}

/// Links for a path segment `from -> to` reached through `hops`.
fn links_between<S: TripleStore + ?Sized>(
    store: &S,
    from: &str,
    to: &str,
    hops: &[Hop<'_>],
) -> Result<Vec<ViewLink>, TripathError> {
    match hops {
        [] => Ok(Vec::new()),
        [Hop::Out(p)] => edges(store, from, to, *p),
        [Hop::In(p)] => edges(store, to, from, *p),
        [Hop::Both(p)] => {
            let mut links = edges(store, from, to, *p)?;
            links.extend(edges(store, to, from, *p)?);
            Ok(links)
        }
        _ => {
            let forward = edges(store, from, to, None)?;
            if !forward.is_empty() {
                return Ok(forward);
            }
            let reverse = edges(store, to, from, None)?;
            if !reverse.is_empty() || from == to {
                return Ok(reverse);
            }
            Ok(vec![ViewLink {
                source: from.to_string(),
                target: to.to_string(),
                label: None,
            }])
        }
    }
}

/// Stored triples `source -> target`, restricted to `predicate` if given.
fn edges<S: TripleStore + ?Sized>(
    store: &S,
    source: &str,
    target: &str,
    predicate: Option<&str>,
) -> Result<Vec<ViewLink>, TripathError> {
    Ok(store
        .triples_by_subject(source)?
        .into_iter()
        .filter(|t| t.object == target && predicate.is_none_or(|p| t.predicate == p))
        .map(|t| ViewLink {
            source: t.subject,
            target: t.object,
            label: Some(t.predicate),
        })
        .collect())
}

// =============================================================================
// TESTS
// =============================================================================
