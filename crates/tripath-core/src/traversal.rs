//! # Result Materializer
//!
//! Executes a validated [`Query`] against any [`TripleStore`].
//!
//! The working set is threaded through the steps in order. It starts either
//! as an explicit list of bindings or as the deferred "every node" wildcard,
//! which the first step resolves through the cheapest index it can:
//!
//! | First step     | Resolution                                   |
//! |----------------|----------------------------------------------|
//! | `out(p)`       | predicate index, objects                     |
//! | `inc(p)`       | predicate index, subjects                    |
//! | `out()`/`inc()`| all triples                                  |
//! | `has(p, v)`    | predicate-object index, subjects             |
//! | `limit(n)`     | first `n` nodes                              |
//! | anything else  | full node list, in order of first appearance |
//!
//! Index answers are regrouped by the node each match is reached from, in
//! node order, so a shortcut never changes the output of the step it
//! replaces: `v().out(p)` equals `v().tag(t).out(p)`.
//!
//! Materialization only reads the store. Running the same query twice over
//! an unchanged store yields identical output.

use crate::query::{ParsedQuery, Query, Seed, Step, Terminal};
use crate::store::TripleStore;
use crate::view::View;
use crate::{Binding, Direction, ResultSet, Triple, TripathError};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// The output of a parsed query, shaped by its terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum QueryOutput {
    /// `{"result": [...]}`
    Results(ResultSet),
    /// `{"count": n}`
    Count { count: usize },
    View(View),
}

/// Working set between two steps.
enum WorkingSet {
    /// Every node, not yet enumerated.
    Deferred,
    Bindings(Vec<Binding>),
}

/// Runs queries against a borrowed store.
pub struct Materializer<'a, S: TripleStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: TripleStore + ?Sized> Materializer<'a, S> {
    #[must_use]
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Every result, in traversal order.
    pub fn all(&self, query: &Query) -> Result<ResultSet, TripathError> {
        let mut working = WorkingSet::Deferred;
        for step in query.steps() {
            working = self.apply(working, step)?;
        }
        Ok(ResultSet::new(self.force(working)?))
    }

    /// Number of results.
    pub fn count(&self, query: &Query) -> Result<usize, TripathError> {
        Ok(self.all(query)?.len())
    }

    /// Node-link view of the results.
    pub fn view(&self, query: &Query, name: &str) -> Result<View, TripathError> {
        let results = self.all(query)?;
        View::build(self.store, name, query, &results)
    }

    /// Materialize according to the query's terminal.
    pub fn execute(&self, parsed: &ParsedQuery) -> Result<QueryOutput, TripathError> {
        Ok(match &parsed.terminal {
            Terminal::All => QueryOutput::Results(self.all(&parsed.query)?),
            Terminal::Count => QueryOutput::Count {
                count: self.count(&parsed.query)?,
            },
            Terminal::View(name) => QueryOutput::View(self.view(&parsed.query, name)?),
        })
    }

    fn apply(&self, working: WorkingSet, step: &Step) -> Result<WorkingSet, TripathError> {
        // Steps that can answer the wildcard from an index.
        if let WorkingSet::Deferred = working {
            match step {
                Step::Out(p) => {
                    let triples = self.universe_edges(p.as_deref())?;
                    return Ok(WorkingSet::Bindings(
                        self.in_node_order(&triples, |t| &t.subject, |t| &t.object)?,
                    ));
                }
                Step::In(p) => {
                    let triples = self.universe_edges(p.as_deref())?;
                    return Ok(WorkingSet::Bindings(
                        self.in_node_order(&triples, |t| &t.object, |t| &t.subject)?,
                    ));
                }
                Step::Has { predicate, value } => {
                    let triples = self.store.triples_by_predicate_object(predicate, value)?;
                    return Ok(WorkingSet::Bindings(
                        self.in_node_order(&triples, |t| &t.subject, |t| &t.subject)?,
                    ));
                }
                Step::Limit(n) => {
                    let nodes = self.store.scan_nodes(*n)?;
                    return Ok(WorkingSet::Bindings(
                        nodes.into_iter().map(Binding::new).collect(),
                    ));
                }
                _ => {}
            }
        }

        let bindings = match step {
            Step::Seed(Seed::All) => return Ok(WorkingSet::Deferred),
            Step::Seed(Seed::Nodes(nodes)) => {
                let mut bindings = Vec::with_capacity(nodes.len());
                for node in nodes {
                    if self.store.contains_node(node)? {
                        bindings.push(Binding::new(node.clone()));
                    }
                }
                return Ok(WorkingSet::Bindings(bindings));
            }
            _ => self.force(working)?,
        };

        let next = match step {
            Step::Seed(_) => bindings,
            Step::Out(p) => self.hop(bindings, &[Direction::Out], p.as_deref())?,
            Step::In(p) => self.hop(bindings, &[Direction::In], p.as_deref())?,
            Step::Both(p) => self.hop(bindings, &[Direction::Out, Direction::In], p.as_deref())?,
            Step::Has { predicate, value } => {
                let mut kept = Vec::with_capacity(bindings.len());
                for binding in bindings {
                    let wanted = Triple::new(binding.node.as_str(), predicate.as_str(), value.as_str());
                    if self.store.contains_triple(&wanted)? {
                        kept.push(binding);
                    }
                }
                kept
            }
            Step::Is(nodes) => {
                let allowed: BTreeSet<&str> = nodes.iter().map(String::as_str).collect();
                bindings
                    .into_iter()
                    .filter(|b| allowed.contains(b.node.as_str()))
                    .collect()
            }
            Step::Tag(name) => bindings
                .into_iter()
                .map(|mut b| {
                    b.tags.insert(name.clone(), b.node.clone());
                    b
                })
                .collect(),
            Step::Back(name) => bindings
                .into_iter()
                .filter_map(|b| {
                    let target = b.tag(name)?.to_string();
                    Some(b.moved_to(target))
                })
                .collect(),
            Step::Unique => {
                let mut seen = BTreeSet::new();
                bindings
                    .into_iter()
                    .filter(|b| seen.insert(b.node.clone()))
                    .collect()
            }
            Step::Limit(n) => bindings.into_iter().take(*n).collect(),
            Step::Skip(n) => bindings.into_iter().skip(*n).collect(),
        };
        Ok(WorkingSet::Bindings(next))
    }

    fn force(&self, working: WorkingSet) -> Result<Vec<Binding>, TripathError> {
        match working {
            WorkingSet::Bindings(bindings) => Ok(bindings),
            WorkingSet::Deferred => Ok(self
                .store
                .scan_nodes(usize::MAX)?
                .into_iter()
                .map(Binding::new)
                .collect()),
        }
    }

    fn universe_edges(&self, predicate: Option<&str>) -> Result<Vec<Triple>, TripathError> {
        match predicate {
            Some(p) => self.store.triples_by_predicate(p),
            None => self.store.scan_triples(usize::MAX),
        }
    }

    /// Bindings for `to(t)` of each matched triple, grouped by `from(t)`.
    ///
    /// Groups follow node first-appearance order and keep edge order inside,
    /// the order a per-node hop over the expanded wildcard would produce.
    fn in_node_order(
        &self,
        triples: &[Triple],
        from: impl Fn(&Triple) -> &String,
        to: impl Fn(&Triple) -> &String,
    ) -> Result<Vec<Binding>, TripathError> {
        let mut groups: BTreeMap<&str, Vec<Binding>> = BTreeMap::new();
        for t in triples {
            groups
                .entry(from(t).as_str())
                .or_default()
                .push(Binding::new(to(t).as_str()));
        }
        if groups.len() <= 1 {
            return Ok(groups.into_values().flatten().collect());
        }

        let mut bindings = Vec::with_capacity(triples.len());
        for node in self.store.scan_nodes(usize::MAX)? {
            if let Some(group) = groups.remove(node.as_str()) {
                bindings.extend(group);
                if groups.is_empty() {
                    break;
                }
            }
        }
        Ok(bindings)
    }

    /// Fan out every binding along `directions`, in binding order, then
    /// direction order, then edge order.
    fn hop(
        &self,
        bindings: Vec<Binding>,
        directions: &[Direction],
        predicate: Option<&str>,
    ) -> Result<Vec<Binding>, TripathError> {
        let mut next = Vec::new();
        for binding in &bindings {
            for &direction in directions {
                let edges = match direction {
                    Direction::Out => self.store.triples_by_subject(&binding.node)?,
                    Direction::In => self.store.triples_by_object(&binding.node)?,
                };
                for edge in edges {
                    if predicate.is_some_and(|p| p != edge.predicate) {
                        continue;
                    }
                    next.push(binding.moved_to(edge.endpoint(direction)));
                }
            }
        }
        Ok(next)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Pipeline;
    use crate::store::MemoryStore;

    fn store(triples: &[(&str, &str, &str)]) -> MemoryStore {
        MemoryStore::from_triples(triples.iter().map(|(s, p, o)| Triple::new(*s, *p, *o)))
    }

    fn ids(store: &MemoryStore, pipeline: Pipeline) -> Vec<String> {
        let query = pipeline.build().expect("build");
        Materializer::new(store)
            .all(&query)
            .expect("all")
            .ids()
            .into_iter()
            .map(String::from)
            .collect()
    }

    #[test]
    fn out_follows_chain() {
        let s = store(&[("alice", "follows", "bob"), ("bob", "follows", "charlie")]);
        assert_eq!(ids(&s, Pipeline::v("alice").out("follows")), vec!["bob"]);
        assert_eq!(
            ids(&s, Pipeline::v("alice").out("follows").out("follows")),
            vec!["charlie"]
        );
        assert_eq!(ids(&s, Pipeline::v("charlie").inc("follows")), vec!["bob"]);
    }

    #[test]
    fn fan_out_keeps_duplicates_until_unique() {
        let s = store(&[("a", "x", "c"), ("b", "x", "c")]);
        assert_eq!(ids(&s, Pipeline::v_all().out("x")), vec!["c", "c"]);
        assert_eq!(ids(&s, Pipeline::v_all().out("x").unique()), vec!["c"]);
    }

    #[test]
    fn fan_out_order_is_binding_then_edge() {
        let s = store(&[
            ("b", "x", "b1"),
            ("a", "x", "a1"),
            ("a", "x", "a2"),
            ("b", "x", "b2"),
        ]);
        assert_eq!(
            ids(&s, Pipeline::v(["a", "b"]).out("x")),
            vec!["a1", "a2", "b1", "b2"]
        );
        // Node order is first appearance: b before a.
        assert_eq!(
            ids(&s, Pipeline::v_all().out("x")),
            vec!["b1", "b2", "a1", "a2"]
        );
    }

    #[test]
    fn indexed_wildcard_matches_expanded_wildcard() {
        let s = store(&[
            ("b", "x", "b1"),
            ("a", "x", "a1"),
            ("a", "x", "a2"),
            ("b", "x", "b2"),
            ("a", "likes", "py"),
            ("c", "likes", "py"),
            ("b", "likes", "py"),
        ]);
        let steps: [fn(Pipeline) -> Pipeline; 5] = [
            |p| p.out("x"),
            |p| p.out_any(),
            |p| p.inc("x"),
            |p| p.inc_any(),
            |p| p.has("likes", "py"),
        ];
        for step in steps {
            let indexed = ids(&s, step(Pipeline::v_all()));
            assert_eq!(indexed, ids(&s, step(Pipeline::v_all().tag("t"))));
            assert_eq!(indexed, ids(&s, step(Pipeline::v_all().limit(100))));
        }
        assert_eq!(ids(&s, Pipeline::v_all().has("likes", "py")), vec!["b", "a", "c"]);
    }

    #[test]
    fn has_on_universe_and_on_traversal() {
        let s = store(&[
            ("alice", "likes", "python"),
            ("bob", "likes", "rust"),
            ("charlie", "likes", "python"),
            ("alice", "knows", "bob"),
            ("alice", "knows", "charlie"),
        ]);
        let set: BTreeSet<String> = ids(&s, Pipeline::v_all().has("likes", "python"))
            .into_iter()
            .collect();
        assert_eq!(set, ["alice", "charlie"].iter().map(|s| s.to_string()).collect());

        assert_eq!(
            ids(&s, Pipeline::v("alice").out("knows").has("likes", "python")),
            vec!["charlie"]
        );
    }

    #[test]
    fn missing_seed_is_empty_not_error() {
        let s = store(&[("a", "x", "b")]);
        assert!(ids(&s, Pipeline::v("ghost").out_any()).is_empty());
        assert!(ids(&s, Pipeline::v("ghost")).is_empty());
    }

    #[test]
    fn limit_and_skip() {
        let s = store(&[("a", "x", "b"), ("b", "x", "c"), ("c", "x", "d")]);
        assert!(ids(&s, Pipeline::v_all().limit(0)).is_empty());
        assert_eq!(ids(&s, Pipeline::v_all().limit(2)), vec!["a", "b"]);
        assert_eq!(ids(&s, Pipeline::v_all().limit(100)).len(), 4);
        assert_eq!(ids(&s, Pipeline::v_all().skip(3)), vec!["d"]);
        assert_eq!(ids(&s, Pipeline::v_all().skip(1).limit(1)), vec!["b"]);
    }

    #[test]
    fn tags_and_back() {
        let s = store(&[("alice", "follows", "bob"), ("bob", "likes", "rust")]);
        let query = Pipeline::v("alice")
            .tag("start")
            .out("follows")
            .tag("friend")
            .out("likes")
            .build()
            .expect("build");
        let result = Materializer::new(&s).all(&query).expect("all");
        assert_eq!(result.len(), 1);
        assert_eq!(result.result[0].node, "rust");
        assert_eq!(result.result[0].tag("start"), Some("alice"));
        assert_eq!(result.result[0].tag("friend"), Some("bob"));

        let back = Pipeline::v("alice")
            .tag("start")
            .out("follows")
            .out("likes")
            .back("start");
        assert_eq!(ids(&s, back), vec!["alice"]);
    }

    #[test]
    fn both_and_is() {
        let s = store(&[("a", "x", "b"), ("c", "x", "b"), ("b", "y", "d")]);
        assert_eq!(ids(&s, Pipeline::v("b").both_any()), vec!["d", "a", "c"]);
        assert_eq!(ids(&s, Pipeline::v("b").both("x")), vec!["a", "c"]);
        assert_eq!(ids(&s, Pipeline::v_all().is(["c", "a"])), vec!["a", "c"]);
    }

    #[test]
    fn rematerialization_is_identical() {
        let s = store(&[("a", "x", "b"), ("a", "y", "c"), ("b", "x", "c")]);
        let query = Pipeline::v_all().out_any().tag("t").inc_any().build().expect("build");
        let m = Materializer::new(&s);
        assert_eq!(m.all(&query).expect("first"), m.all(&query).expect("second"));
    }

    #[test]
    fn execute_honors_terminal() {
        let s = store(&[("a", "x", "b"), ("b", "x", "c")]);
        let m = Materializer::new(&s);

        let count = m
            .execute(&crate::query::parse("v().out().count()").expect("parse"))
            .expect("count");
        assert_eq!(count, QueryOutput::Count { count: 2 });
        assert_eq!(
            serde_json::to_value(&count).expect("json"),
            serde_json::json!({"count": 2})
        );

        let all = m
            .execute(&crate::query::parse("v('a').out()").expect("parse"))
            .expect("all");
        assert_eq!(
            serde_json::to_value(&all).expect("json"),
            serde_json::json!({"result": [{"id": "b"}]})
        );
    }
}
