//! Filetree resolution: a reasoned query becomes a list of objects.
//!
//! Each OR-branch is evaluated by the configured [`SetBuilder`]; branch
//! results are merged by inode, and names carried by more than one inode
//! are rendered as `<inode>___<name>`.

mod set_builder;

pub use set_builder::{
    select_builder, BranchQuery, NativeIntersect, NestedSubquery, SetBuilder,
};

use crate::error::Result;
use crate::query::with_inode_prefix;
use crate::reasoner::{ReasonedQuery, TermAlternatives};
use crate::stats::Stats;
use crate::store::{FileHandle, TagStore};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
pub struct Resolver {
    store: TagStore,
    builder: Arc<dyn SetBuilder>,
    stats: Arc<Stats>,
}

impl Resolver {
    pub fn new(store: TagStore, builder: Box<dyn SetBuilder>, stats: Arc<Stats>) -> Self {
        Self {
            store,
            builder: Arc::from(builder),
            stats,
        }
    }

    pub fn strategy(&self) -> &'static str {
        self.builder.name()
    }

    /// Objects matching any branch, one entry per inode, disambiguated.
    /// An empty query resolves to nothing.
    pub fn resolve(&self, query: &ReasonedQuery) -> Result<Vec<FileHandle>> {
        self.stats.record_resolve();
        let mut by_inode: BTreeMap<i64, String> = BTreeMap::new();
        for branch in query.branches.iter().filter(|b| !b.is_empty()) {
            for handle in self.resolve_branch(branch)? {
                by_inode.entry(handle.inode).or_insert(handle.name);
            }
        }
        Ok(disambiguate(by_inode))
    }

    fn resolve_branch(&self, branch: &[TermAlternatives]) -> Result<Vec<FileHandle>> {
        let caches = self.store.caches();
        let key = branch_key(self.builder.name(), branch);
        if caches.enabled() {
            if let Some(handles) = caches.and_sets.get(&key) {
                self.stats.record_and_set_lookup(true);
                return Ok(handles);
            }
            self.stats.record_and_set_lookup(false);
        }

        let generation = caches.and_sets.generation();
        let query = self.builder.branch_query(branch);
        let rows = self.store.connection().query_all(&query.sql, &query.params)?;
        let mut handles = Vec::with_capacity(rows.len());
        for row in rows {
            handles.push(FileHandle::new(row.get::<String>(1)?, row.get(0)?));
        }
        debug!(
            strategy = self.builder.name(),
            slots = branch.len(),
            matched = handles.len(),
            "Resolved branch"
        );

        if caches.enabled() {
            let tags: HashSet<String> = branch
                .iter()
                .flat_map(|slot| slot.iter().map(|term| term.name().to_string()))
                .collect();
            caches
                .and_sets
                .insert_if_current(key, handles.clone(), tags, generation);
        }
        Ok(handles)
    }
}

fn branch_key(strategy: &str, branch: &[TermAlternatives]) -> String {
    let slots = serde_json::to_string(branch).unwrap_or_else(|_| format!("{:?}", branch));
    format!("{}:{}", strategy, slots)
}

/// Prefix every name shared by two or more inodes with its inode.
pub fn disambiguate(by_inode: BTreeMap<i64, String>) -> Vec<FileHandle> {
    let mut name_counts: HashMap<&str, usize> = HashMap::new();
    for name in by_inode.values() {
        *name_counts.entry(name.as_str()).or_default() += 1;
    }

    let mut handles: Vec<FileHandle> = by_inode
        .iter()
        .map(|(&inode, name)| {
            if name_counts.get(name.as_str()).copied().unwrap_or(0) > 1 {
                FileHandle::new(with_inode_prefix(inode, name), inode)
            } else {
                FileHandle::new(name.as_str(), inode)
            }
        })
        .collect();
    handles.sort();
    handles
}
