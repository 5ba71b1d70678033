//! Process-wide memoization shared by the reasoner, the resolver and
//! path lookups.
//!
//! Each cache is a `HashMap` behind its own `RwLock`: lookups share the
//! lock, invalidation takes it exclusively. Invalidation is always targeted
//! at the entries an update can affect; nothing flushes a whole cache.

use crate::query::TagTerm;
use crate::store::FileHandle;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// Reasoner expansions keyed by [`TagTerm::cache_key`].
#[derive(Debug, Default)]
pub struct ReasonerCache {
    entries: RwLock<HashMap<String, Vec<TagTerm>>>,
    /// Bumped by every invalidation.
    generation: AtomicU64,
}

impl ReasonerCache {
    pub fn get(&self, term: &TagTerm) -> Option<Vec<TagTerm>> {
        read(&self.entries).get(&term.cache_key()).cloned()
    }

    pub fn insert(&self, term: &TagTerm, related: Vec<TagTerm>) {
        write(&self.entries).insert(term.cache_key(), related);
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Insert unless an invalidation ran since `generation` was read.
    /// Returns whether the entry was stored.
    pub fn insert_if_current(&self, term: &TagTerm, related: Vec<TagTerm>, generation: u64) -> bool {
        let mut entries = write(&self.entries);
        if self.generation.load(Ordering::Acquire) != generation {
            return false;
        }
        entries.insert(term.cache_key(), related);
        true
    }

    /// Drop every expansion that starts at, or passed through, any of `tags`.
    pub fn invalidate(&self, tags: &[&TagTerm]) {
        let keys: HashSet<String> = tags.iter().map(|t| t.cache_key()).collect();
        let mut entries = write(&self.entries);
        self.generation.fetch_add(1, Ordering::AcqRel);
        entries.retain(|key, related| {
            !keys.contains(key) && !related.iter().any(|t| keys.contains(&t.cache_key()))
        });
    }

    pub fn len(&self) -> usize {
        read(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Object path to inode, with the tag names the path was resolved through.
#[derive(Debug, Default)]
pub struct InodeCache {
    entries: RwLock<HashMap<String, (i64, HashSet<String>)>>,
}

impl InodeCache {
    pub fn get(&self, path: &str) -> Option<i64> {
        read(&self.entries).get(path).map(|(inode, _)| *inode)
    }

    pub fn insert(&self, path: &str, inode: i64, tags: HashSet<String>) {
        write(&self.entries).insert(path.to_string(), (inode, tags));
    }

    /// Point every path resolving to `from` at `to`.
    pub fn rewrite(&self, from: i64, to: i64) {
        for (inode, _) in write(&self.entries).values_mut() {
            if *inode == from {
                *inode = to;
            }
        }
    }

    pub fn forget_inode(&self, inode: i64) {
        write(&self.entries).retain(|_, (cached, _)| *cached != inode);
    }

    /// Drop every path resolved through `tagname`.
    pub fn invalidate_tag(&self, tagname: &str) {
        write(&self.entries).retain(|_, (_, tags)| !tags.contains(tagname));
    }

    pub fn len(&self) -> usize {
        read(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone)]
struct AndSetEntry {
    handles: Vec<FileHandle>,
    /// `tagname` of every term and alternative that produced the set.
    tags: HashSet<String>,
}

/// Resolved OR-branches keyed by their reasoned terms.
#[derive(Debug, Default)]
pub struct AndSetCache {
    entries: RwLock<HashMap<String, AndSetEntry>>,
    /// Bumped by every invalidation or rewrite.
    generation: AtomicU64,
}

impl AndSetCache {
    pub fn get(&self, key: &str) -> Option<Vec<FileHandle>> {
        read(&self.entries).get(key).map(|entry| entry.handles.clone())
    }

    pub fn insert(&self, key: String, handles: Vec<FileHandle>, tags: HashSet<String>) {
        write(&self.entries).insert(key, AndSetEntry { handles, tags });
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Insert unless the cache changed since `generation` was read.
    pub fn insert_if_current(
        &self,
        key: String,
        handles: Vec<FileHandle>,
        tags: HashSet<String>,
        generation: u64,
    ) -> bool {
        let mut entries = write(&self.entries);
        if self.generation.load(Ordering::Acquire) != generation {
            return false;
        }
        entries.insert(key, AndSetEntry { handles, tags });
        true
    }

    /// Drop every set built from `tagname` (a flat name or a namespace).
    pub fn invalidate_tag(&self, tagname: &str) {
        let mut entries = write(&self.entries);
        self.generation.fetch_add(1, Ordering::AcqRel);
        entries.retain(|_, entry| !entry.tags.contains(tagname));
    }

    /// Replace `from` by `to` (named `name`) in every cached set.
    pub fn rewrite_inode(&self, from: i64, to: i64, name: &str) {
        let mut entries = write(&self.entries);
        self.generation.fetch_add(1, Ordering::AcqRel);
        for entry in entries.values_mut() {
            if !entry.handles.iter().any(|h| h.inode == from) {
                continue;
            }
            let already_present = from != to && entry.handles.iter().any(|h| h.inode == to);
            entry.handles.retain(|h| h.inode != from);
            if !already_present {
                entry.handles.push(FileHandle::new(name, to));
            }
        }
    }

    pub fn forget_inode(&self, inode: i64) {
        let mut entries = write(&self.entries);
        self.generation.fetch_add(1, Ordering::AcqRel);
        for entry in entries.values_mut() {
            entry.handles.retain(|h| h.inode != inode);
        }
    }

    pub fn len(&self) -> usize {
        read(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// All caches. When disabled, callers skip lookups and inserts, so
/// invalidation runs over empty maps.
#[derive(Debug)]
pub struct Caches {
    enabled: bool,
    pub reasoner: ReasonerCache,
    pub inodes: InodeCache,
    pub and_sets: AndSetCache,
}

impl Caches {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            reasoner: ReasonerCache::default(),
            inodes: InodeCache::default(),
            and_sets: AndSetCache::default(),
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// A relation between `a` and `b` was created or removed.
    pub fn relation_changed(&self, a: &TagTerm, b: &TagTerm) {
        self.reasoner.invalidate(&[a, b]);
        for tagname in [a.name(), b.name()] {
            self.inodes.invalidate_tag(tagname);
        }
    }

    /// An object changed identity or disappeared: `to = None` forgets it.
    pub fn object_moved(&self, from: i64, to: Option<(i64, &str)>) {
        match to {
            Some((inode, name)) => {
                self.inodes.rewrite(from, inode);
                self.and_sets.rewrite_inode(from, inode, name);
            }
            None => {
                self.inodes.forget_inode(from);
                self.and_sets.forget_inode(from);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reasoner_invalidation_hits_key_and_chains() {
        let cache = ReasonerCache::default();
        let a = TagTerm::flat("a");
        let b = TagTerm::flat("b");
        let c = TagTerm::flat("c");
        let x = TagTerm::flat("x");

        cache.insert(&a, vec![b.clone()]);
        cache.insert(&x, vec![a.clone(), c.clone()]);
        cache.insert(&c, vec![]);

        cache.invalidate(&[&a, &TagTerm::flat("unrelated")]);
        assert!(cache.get(&a).is_none());
        assert!(cache.get(&x).is_none());
        assert_eq!(cache.get(&c), Some(vec![]));
    }

    #[test]
    fn stale_expansion_is_not_stored() {
        let cache = ReasonerCache::default();
        let a = TagTerm::flat("a");
        let seen = cache.generation();
        cache.invalidate(&[&TagTerm::flat("b")]);
        assert!(!cache.insert_if_current(&a, vec![TagTerm::flat("b")], seen));
        assert!(cache.get(&a).is_none());
        assert!(cache.insert_if_current(&a, vec![], cache.generation()));
    }

    #[test]
    fn inode_cache_rewrites_and_forgets() {
        let cache = InodeCache::default();
        let tags = |names: &[&str]| names.iter().map(|n| n.to_string()).collect();
        cache.insert("/tags/a/=/x", 5, tags(&["a"]));
        cache.insert("/tags/b/=/x", 5, tags(&["b", "c"]));
        cache.insert("/tags/b/=/y", 6, tags(&["b"]));

        cache.rewrite(5, 2);
        assert_eq!(cache.get("/tags/a/=/x"), Some(2));
        assert_eq!(cache.get("/tags/b/=/x"), Some(2));

        cache.forget_inode(6);
        assert_eq!(cache.get("/tags/b/=/y"), None);
        assert_eq!(cache.len(), 2);

        cache.invalidate_tag("c");
        assert_eq!(cache.get("/tags/b/=/x"), None);
        assert_eq!(cache.get("/tags/a/=/x"), Some(2));
    }

    #[test]
    fn and_set_rewrite_keeps_one_handle_per_inode() {
        let cache = AndSetCache::default();
        cache.insert(
            "k1".into(),
            vec![FileHandle::new("copy.txt", 9), FileHandle::new("orig.txt", 3)],
            HashSet::from(["t1".to_string()]),
        );
        cache.insert(
            "k2".into(),
            vec![FileHandle::new("copy.txt", 9)],
            HashSet::from(["t2".to_string()]),
        );

        cache.rewrite_inode(9, 3, "orig.txt");
        assert_eq!(cache.get("k1").unwrap(), vec![FileHandle::new("orig.txt", 3)]);
        assert_eq!(cache.get("k2").unwrap(), vec![FileHandle::new("orig.txt", 3)]);

        cache.invalidate_tag("t2");
        assert!(cache.get("k2").is_none());
        assert!(cache.get("k1").is_some());
    }
}
