//! Relation reasoning.
//!
//! Expands a term with every tag that satisfies it through relations:
//! `T` reaches `X` when a relation `T -> X` of any kind exists, or when
//! `X -[is_equivalent]-> T` exists. Inclusion therefore only travels
//! forward while equivalence travels both ways.

use crate::query::{TagQuery, TagTerm};
use crate::stats::Stats;
use crate::store::TagStore;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// One AND slot after reasoning: the term and its alternatives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TermAlternatives {
    pub term: TagTerm,
    pub related: Vec<TagTerm>,
}

impl TermAlternatives {
    pub fn plain(term: TagTerm) -> Self {
        Self {
            term,
            related: Vec::new(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &TagTerm> {
        std::iter::once(&self.term).chain(self.related.iter())
    }
}

/// Scratch copy of a query's branches with per-slot alternatives. Built for
/// one resolution and dropped with it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReasonedQuery {
    pub branches: Vec<Vec<TermAlternatives>>,
}

impl ReasonedQuery {
    /// The query without any expansion.
    pub fn plain(query: &TagQuery) -> Self {
        Self {
            branches: query
                .branches
                .iter()
                .map(|branch| branch.iter().cloned().map(TermAlternatives::plain).collect())
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.branches.iter().all(|branch| branch.is_empty())
    }
}

#[derive(Clone)]
pub struct Reasoner {
    store: TagStore,
    stats: Arc<Stats>,
}

impl Reasoner {
    pub fn new(store: TagStore, stats: Arc<Stats>) -> Self {
        Self { store, stats }
    }

    /// Tags implied by `term`, excluding `term` itself. Comparison triples
    /// do not name a single tag and are never expanded.
    pub fn expand(&self, term: &TagTerm) -> Vec<TagTerm> {
        if !term.is_equality() {
            return Vec::new();
        }

        let caches = self.store.caches();
        if caches.enabled() {
            if let Some(related) = caches.reasoner.get(term) {
                self.stats.record_reasoner_lookup(true);
                return related;
            }
            self.stats.record_reasoner_lookup(false);
        }

        let generation = caches.reasoner.generation();
        let mut chain = vec![term.clone()];
        let mut seen: HashSet<String> = HashSet::from([term.cache_key()]);
        self.collect(term, &mut chain, &mut seen);
        let related = chain.split_off(1);

        if caches.enabled()
            && !caches
                .reasoner
                .insert_if_current(term, related.clone(), generation)
        {
            debug!(tag = %term, "Relations changed during expansion; not caching");
        }
        debug!(tag = %term, related = related.len(), "Expanded term");
        related
    }

    /// Depth-first walk appending every tag not already in `chain`.
    fn collect(&self, term: &TagTerm, chain: &mut Vec<TagTerm>, seen: &mut HashSet<String>) {
        let found = match self.store.related_tags(term) {
            Ok(found) => found,
            Err(err) => {
                warn!(tag = %term, "Relation lookup failed, expansion stops here: {}", err);
                return;
            }
        };
        for tag in found {
            if seen.insert(tag.cache_key()) {
                chain.push(tag.clone());
                self.collect(&tag, chain, seen);
            }
        }
    }

    /// Attach alternatives to every slot when the query asks for reasoning.
    pub fn reason(&self, query: &TagQuery) -> ReasonedQuery {
        let mut reasoned = ReasonedQuery::plain(query);
        if !query.do_reasoning {
            return reasoned;
        }
        for slot in reasoned.branches.iter_mut().flatten() {
            slot.related = self.expand(&slot.term);
        }
        reasoned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Caches;
    use crate::query::TagOperator;
    use crate::store::RelationKind;
    use tagvfs_db::{ensure_schema, DbConnection};

    fn reasoner(dir: &tempfile::TempDir) -> (Reasoner, TagStore) {
        let conn = DbConnection::open_duckdb_memory().unwrap();
        ensure_schema(&conn).unwrap();
        let store = TagStore::new(conn, dir.path(), Arc::new(Caches::new(true)));
        (Reasoner::new(store.clone(), Arc::new(Stats::default())), store)
    }

    fn query(terms: &[&str], do_reasoning: bool) -> TagQuery {
        TagQuery {
            branches: vec![terms.iter().map(|t| TagTerm::flat(*t)).collect()],
            complete: true,
            do_reasoning,
            ..TagQuery::default()
        }
    }

    #[test]
    fn reasoning_off_leaves_slots_plain() {
        let dir = tempfile::TempDir::new().unwrap();
        let (reasoner, store) = reasoner(&dir);
        store
            .create_relation(&TagTerm::flat("a"), RelationKind::Includes, &TagTerm::flat("b"))
            .unwrap();

        let reasoned = reasoner.reason(&query(&["a"], false));
        assert_eq!(reasoned, ReasonedQuery::plain(&query(&["a"], false)));

        let reasoned = reasoner.reason(&query(&["a"], true));
        assert_eq!(reasoned.branches[0][0].related, vec![TagTerm::flat("b")]);
    }

    #[test]
    fn backward_steps_only_follow_equivalence() {
        let dir = tempfile::TempDir::new().unwrap();
        let (reasoner, store) = reasoner(&dir);
        store
            .create_relation(&TagTerm::flat("x"), RelationKind::Includes, &TagTerm::flat("y"))
            .unwrap();
        store
            .create_relation(&TagTerm::flat("z"), RelationKind::IsEquivalent, &TagTerm::flat("y"))
            .unwrap();

        assert_eq!(reasoner.expand(&TagTerm::flat("y")), vec![TagTerm::flat("z")]);
        assert_eq!(
            reasoner.expand(&TagTerm::flat("x")),
            vec![TagTerm::flat("y"), TagTerm::flat("z")]
        );
    }

    #[test]
    fn comparisons_are_not_expanded() {
        let dir = tempfile::TempDir::new().unwrap();
        let (reasoner, _store) = reasoner(&dir);
        let term = TagTerm::triple("geo", "city", TagOperator::Greater, "m");
        assert!(reasoner.expand(&term).is_empty());
        assert!(TermAlternatives::plain(term.clone()).iter().eq([&term]));
    }
}
