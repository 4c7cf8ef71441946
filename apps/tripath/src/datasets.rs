//! Built-in example datasets for `tripath seed`.

use tripath_core::{Session, Triple, TripathError};

type Raw = (&'static str, &'static str, &'static str);

/// A named set of example triples.
#[derive(Debug, Clone, Copy)]
pub struct Dataset {
    /// Short name used on the command line.
    pub key: &'static str,
    pub title: &'static str,
    triples: &'static [Raw],
}

impl Dataset {
    #[must_use]
    pub fn triples(&self) -> Vec<Triple> {
        self.triples
            .iter()
            .map(|&(s, p, o)| Triple::new(s, p, o))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.triples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    /// Store every triple. Returns how many were new.
    pub fn load_into(&self, session: &mut Session) -> Result<usize, TripathError> {
        session.put_batch(&self.triples())
    }
}

const SOCIAL: &[Raw] = &[
    ("alice", "follows", "bob"),
    ("bob", "follows", "charlie"),
    ("charlie", "follows", "alice"),
    ("alice", "likes", "python"),
    ("bob", "likes", "javascript"),
    ("charlie", "likes", "python"),
    ("alice", "works_at", "startup"),
    ("bob", "works_at", "bigcorp"),
    ("charlie", "works_at", "startup"),
];

const MOVIES: &[Raw] = &[
    ("inception", "directed_by", "christopher_nolan"),
    ("interstellar", "directed_by", "christopher_nolan"),
    ("the_dark_knight", "directed_by", "christopher_nolan"),
    ("inception", "stars", "leonardo_dicaprio"),
    ("inception", "genre", "scifi"),
    ("interstellar", "genre", "scifi"),
    ("the_dark_knight", "genre", "action"),
    ("leonardo_dicaprio", "born_in", "los_angeles"),
    ("christopher_nolan", "born_in", "london"),
];

const KNOWLEDGE: &[Raw] = &[
    ("python", "is_a", "programming_language"),
    ("javascript", "is_a", "programming_language"),
    ("python", "used_for", "data_science"),
    ("python", "used_for", "web_development"),
    ("javascript", "used_for", "web_development"),
    ("rust", "is_a", "programming_language"),
    ("rust", "used_for", "systems_programming"),
    ("tripath", "written_in", "rust"),
    ("tripath", "is_a", "graph_database"),
];

pub const DATASETS: &[Dataset] = &[
    Dataset {
        key: "social",
        title: "Social Network",
        triples: SOCIAL,
    },
    Dataset {
        key: "movies",
        title: "Movies",
        triples: MOVIES,
    },
    Dataset {
        key: "knowledge",
        title: "Knowledge Base",
        triples: KNOWLEDGE,
    },
];

/// Look a dataset up by key or title, ignoring case.
pub fn find(name: &str) -> Result<&'static Dataset, TripathError> {
    let name = name.trim();
    DATASETS
        .iter()
        .find(|d| d.key.eq_ignore_ascii_case(name) || d.title.eq_ignore_ascii_case(name))
        .ok_or_else(|| {
            let keys: Vec<&str> = DATASETS.iter().map(|d| d.key).collect();
            TripathError::invalid(format!(
                "unknown dataset '{}': use one of {}",
                name,
                keys.join(", ")
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_key_or_title() {
        assert_eq!(find("social").expect("key").key, "social");
        assert_eq!(find("Knowledge Base").expect("title").key, "knowledge");
        assert!(find("weather").is_err());
    }

    #[test]
    fn datasets_load_and_are_idempotent() {
        for dataset in DATASETS {
            let mut session = Session::new();
            assert_eq!(dataset.load_into(&mut session).expect("load"), dataset.len());
            assert_eq!(dataset.load_into(&mut session).expect("again"), 0);
            assert_eq!(session.count_edges().expect("edges"), dataset.len());
        }
    }

    #[test]
    fn social_network_answers_follow_query() {
        let mut session = Session::new();
        find("social").expect("social").load_into(&mut session).expect("load");
        let out = session
            .query("v().has('likes', 'python').count()")
            .expect("query");
        assert_eq!(out, tripath_core::QueryOutput::Count { count: 2 });
    }
}
