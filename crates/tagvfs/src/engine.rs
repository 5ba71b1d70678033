//! Path operations.
//!
//! [`TagFs`] is what a filesystem bridge talks to: every call takes a path,
//! parses it, and delegates to the reasoner, resolver, catalogue or
//! deduplication engine. Errors carry an errno via [`TagvfsError::errno`].

use crate::cache::Caches;
use crate::config::{Config, DedupMode};
use crate::dedup::{DedupEngine, DedupOutcome, DedupQueue, DedupWorker};
use crate::error::{Result, TagvfsError};
use crate::query::{
    self, split_inode_prefix, with_inode_prefix, QueryKind, QueryTree, RelationPath, TagOperator,
    TagQuery, TagTerm, END_MARKER, NO_REASONING_MARKER, OR_MARKER, REASONING_MARKER,
    ROOT_ARCHIVE, ROOT_RELATIONS, ROOT_STATS, ROOT_TAGS,
};
use crate::reasoner::{ReasonedQuery, Reasoner};
use crate::resolver::{select_builder, Resolver};
use crate::stats::{Stats, StatsSnapshot};
use crate::store::{FileHandle, ObjectRecord, RelationKind, Tag, TagStore};
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use std::fs::{self, File, OpenOptions};
use std::sync::{Arc, Mutex, PoisonError};
use tagvfs_db::{ensure_schema, DbConnection};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Directory,
    Object,
    Counter,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirEntry {
    pub name: String,
    pub kind: EntryKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inode: Option<i64>,
}

impl DirEntry {
    fn dir(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Directory,
            inode: None,
        }
    }

    fn object(handle: FileHandle) -> Self {
        Self {
            name: handle.name,
            kind: EntryKind::Object,
            inode: Some(handle.inode),
        }
    }

    fn counter(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: EntryKind::Counter,
            inode: None,
        }
    }
}

/// Result of a content write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriteOutcome {
    pub inode: i64,
    /// `None` when the pass was queued on the background worker.
    pub dedup: Option<DedupOutcome>,
}

pub struct TagFs {
    config: Config,
    store: TagStore,
    reasoner: Reasoner,
    resolver: Resolver,
    dedup: Arc<DedupEngine>,
    worker: Mutex<Option<DedupWorker>>,
    stats: Arc<Stats>,
}

impl TagFs {
    /// Open the repository described by `config`, creating it if needed.
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;
        fs::create_dir_all(config.archive_dir())?;

        let conn = if config.store.in_memory {
            DbConnection::open_duckdb_memory()?
        } else if config.store.read_only {
            DbConnection::open_duckdb_readonly(&config.database_path())?
        } else {
            DbConnection::open_duckdb(&config.database_path())?
        };
        if conn.is_writable() {
            ensure_schema(&conn)?;
        }

        let caches = Arc::new(Caches::new(config.cache.enabled));
        let stats = Arc::new(Stats::default());
        let store = TagStore::new(conn.clone(), config.archive_dir(), caches);
        let reasoner = Reasoner::new(store.clone(), stats.clone());
        let builder = select_builder(config.store.intersect, conn.capabilities());
        let resolver = Resolver::new(store.clone(), builder, stats.clone());
        let dedup = Arc::new(DedupEngine::new(
            store.clone(),
            stats.clone(),
            config.dedup.chunk_size,
        ));

        let worker = if config.dedup.mode == DedupMode::Background && conn.is_writable() {
            Some(DedupWorker::start(
                dedup.clone(),
                config.dedup.queue_capacity,
                stats.clone(),
            )?)
        } else {
            None
        };

        info!(
            repository = %config.repository.display(),
            strategy = resolver.strategy(),
            dedup = ?config.dedup.mode,
            "Opened tag store"
        );
        Ok(Self {
            config,
            store,
            reasoner,
            resolver,
            dedup,
            worker: Mutex::new(worker),
            stats,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &TagStore {
        &self.store
    }

    /// Name of the set-builder strategy in use.
    pub fn strategy(&self) -> &'static str {
        self.resolver.strategy()
    }

    // ------------------------------------------------------------------
    // Core interface
    // ------------------------------------------------------------------

    pub fn parse(&self, path: &str) -> QueryTree {
        query::parse(path, self.config.reasoner.enabled)
    }

    /// Objects matching a tag query.
    pub fn resolve(&self, tree: &QueryTree) -> Result<Vec<FileHandle>> {
        match &tree.kind {
            QueryKind::Tags(query) => self.resolve_query(query),
            QueryKind::Malformed { reason } => Err(TagvfsError::not_found(reason.clone())),
            _ => Err(TagvfsError::invalid(format!(
                "{} is not a tag query",
                tree.path
            ))),
        }
    }

    fn resolve_query(&self, query: &TagQuery) -> Result<Vec<FileHandle>> {
        let reasoned = self.reasoner.reason(query);
        self.resolver.resolve(&reasoned)
    }

    /// Like `resolve_query`, also returning every tag name the reasoned
    /// query was built from.
    fn resolve_with_tags(&self, query: &TagQuery) -> Result<(Vec<FileHandle>, HashSet<String>)> {
        let reasoned = self.reasoner.reason(query);
        let tags = reasoned
            .branches
            .iter()
            .flatten()
            .flat_map(|slot| slot.iter().map(|term| term.name().to_string()))
            .collect();
        Ok((self.resolver.resolve(&reasoned)?, tags))
    }

    /// Per-slot alternatives the resolver would use for `query`.
    pub fn reason(&self, query: &TagQuery) -> ReasonedQuery {
        self.reasoner.reason(query)
    }

    pub fn expand(&self, term: &TagTerm) -> Vec<TagTerm> {
        self.reasoner.expand(term)
    }

    pub fn deduplicate(&self, inode: i64) -> DedupOutcome {
        self.dedup.deduplicate(inode)
    }

    pub fn deduplicate_all(&self) -> Result<Vec<DedupOutcome>> {
        self.dedup.deduplicate_all()
    }

    // ------------------------------------------------------------------
    // Listing and lookup
    // ------------------------------------------------------------------

    pub fn readdir(&self, path: &str) -> Result<Vec<DirEntry>> {
        let tree = self.parse(path);
        match &tree.kind {
            QueryKind::Root => Ok([ROOT_TAGS, ROOT_ARCHIVE, ROOT_RELATIONS, ROOT_STATS]
                .into_iter()
                .map(DirEntry::dir)
                .collect()),
            QueryKind::Malformed { reason } => Err(TagvfsError::not_found(reason.clone())),
            QueryKind::Tags(query) => self.readdir_tags(&tree, query),
            QueryKind::Archive { object_path } => {
                if !object_path.is_empty() {
                    self.lookup(path)?;
                    return Err(TagvfsError::NotADirectory(path.to_string()));
                }
                Ok(self
                    .store
                    .list_objects()?
                    .into_iter()
                    .map(|record| {
                        DirEntry::object(FileHandle::new(
                            with_inode_prefix(record.inode, &record.name),
                            record.inode,
                        ))
                    })
                    .collect())
            }
            QueryKind::Relations(relation) => self.readdir_relations(relation),
            QueryKind::Stats { counter: None } => Ok(StatsSnapshot::COUNTER_NAMES
                .into_iter()
                .map(DirEntry::counter)
                .collect()),
            QueryKind::Stats { counter: Some(_) } => {
                Err(TagvfsError::NotADirectory(path.to_string()))
            }
        }
    }

    fn readdir_tags(&self, tree: &QueryTree, query: &TagQuery) -> Result<Vec<DirEntry>> {
        if query.complete {
            if tree.points_to_object() {
                self.lookup(&tree.path)?;
                return Err(TagvfsError::NotADirectory(tree.path.clone()));
            }
            return Ok(self
                .resolve_query(query)?
                .into_iter()
                .map(DirEntry::object)
                .collect());
        }

        if let Some(partial) = &query.partial {
            let names: Vec<String> = match (&partial.key, partial.operator) {
                (None, _) => self.store.list_namespace_keys(&partial.namespace)?,
                (Some(_), None) => TagOperator::ALL
                    .iter()
                    .map(|op| op.symbol().to_string())
                    .collect(),
                (Some(key), Some(_)) => self.store.list_namespace_values(&partial.namespace, key)?,
            };
            return Ok(names.into_iter().map(DirEntry::dir).collect());
        }

        // distinct flat names and namespaces
        let names: BTreeSet<String> = self
            .store
            .list_tags()?
            .into_iter()
            .map(|tag| tag.name)
            .collect();
        let mut entries: Vec<DirEntry> = names.into_iter().map(DirEntry::dir).collect();
        if !query.branches.is_empty() {
            for marker in [OR_MARKER, REASONING_MARKER, NO_REASONING_MARKER, END_MARKER] {
                entries.push(DirEntry::dir(marker));
            }
        }
        Ok(entries)
    }

    fn readdir_relations(&self, relation: &RelationPath) -> Result<Vec<DirEntry>> {
        let Some(source) = &relation.source else {
            // triples are listed under their namespace
            let sources: BTreeSet<String> = self
                .store
                .list_relations(None, None)?
                .into_iter()
                .map(|rel| rel.source.name)
                .collect();
            return Ok(sources.into_iter().map(DirEntry::dir).collect());
        };
        let Some(kind) = &relation.kind else {
            return Ok(RelationKind::ALL
                .iter()
                .map(|kind| DirEntry::dir(kind.as_str()))
                .collect());
        };
        let kind: RelationKind = kind.parse()?;
        let relations = self.store.list_relations(Some(source), Some(kind))?;

        match &relation.target {
            None => {
                let targets: BTreeSet<String> = relations
                    .iter()
                    .map(|rel| rel.target.name.clone())
                    .collect();
                Ok(targets.into_iter().map(DirEntry::dir).collect())
            }
            Some(target) => {
                if relations.iter().any(|rel| rel.target.term() == *target) {
                    Ok(Vec::new())
                } else {
                    Err(TagvfsError::not_found(format!(
                        "relation {} {} {}",
                        source, kind, target
                    )))
                }
            }
        }
    }

    /// Resolve a path to the object it names.
    ///
    /// A plain name shared by several objects in the listing resolves to the
    /// lowest inode; `<inode>___<name>` picks one explicitly.
    pub fn lookup(&self, path: &str) -> Result<ObjectRecord> {
        let tree = self.parse(path);
        if tree.is_malformed() || !tree.points_to_object() || tree.object_path().contains('/') {
            return Err(TagvfsError::not_found(path.to_string()));
        }

        let caches = self.store.caches();
        if caches.enabled() {
            if let Some(inode) = caches.inodes.get(path) {
                if let Some(record) = self.store.get_object(inode)? {
                    return Ok(record);
                }
                caches.inodes.forget_inode(inode);
            }
        }

        let name = tree
            .object_name()
            .ok_or_else(|| TagvfsError::not_found(path.to_string()))?;
        let wanted_inode = tree.object_inode();

        let mut tags = HashSet::new();
        let record = match &tree.kind {
            QueryKind::Tags(query) => {
                let (handles, used) = self.resolve_with_tags(query)?;
                tags = used;
                let found = handles
                    .iter()
                    .filter(|handle| {
                        let (prefix, base) = split_inode_prefix(&handle.name);
                        match wanted_inode {
                            Some(inode) => handle.inode == inode && base == name,
                            None => base == name && prefix.map_or(true, |p| p == handle.inode),
                        }
                    })
                    .map(|handle| handle.inode)
                    .min();
                match found {
                    Some(inode) => self.store.get_object(inode)?,
                    None => None,
                }
            }
            QueryKind::Archive { .. } => match wanted_inode {
                Some(inode) => self
                    .store
                    .get_object(inode)?
                    .filter(|record| record.name == name),
                None => self.store.find_objects_by_name(name)?.into_iter().next(),
            },
            _ => None,
        };

        let record = record.ok_or_else(|| TagvfsError::not_found(path.to_string()))?;
        if caches.enabled() {
            caches.inodes.insert(path, record.inode, tags);
        }
        Ok(record)
    }

    /// What `path` is, without listing it. Incomplete tag paths exist when
    /// their last tag does.
    pub fn stat(&self, path: &str) -> Result<EntryKind> {
        let tree = self.parse(path);
        match &tree.kind {
            QueryKind::Malformed { reason } => Err(TagvfsError::not_found(reason.clone())),
            QueryKind::Root => Ok(EntryKind::Directory),
            QueryKind::Tags(query) => {
                if tree.points_to_object() {
                    self.lookup(path)?;
                    return Ok(EntryKind::Object);
                }
                if query.complete || query.partial.is_some() {
                    return Ok(EntryKind::Directory);
                }
                match tree.last_tag() {
                    Some(term) if term.is_equality() && self.store.find_tag(term)?.is_none() => {
                        Err(TagvfsError::not_found(format!("tag {}", term)))
                    }
                    _ => Ok(EntryKind::Directory),
                }
            }
            QueryKind::Archive { .. } => {
                if tree.points_to_object() {
                    self.lookup(path)?;
                    Ok(EntryKind::Object)
                } else {
                    Ok(EntryKind::Directory)
                }
            }
            QueryKind::Relations(_) => {
                self.readdir(path)?;
                Ok(EntryKind::Directory)
            }
            QueryKind::Stats { counter: None } => Ok(EntryKind::Directory),
            QueryKind::Stats {
                counter: Some(counter),
            } => {
                if StatsSnapshot::COUNTER_NAMES.contains(&counter.as_str()) {
                    Ok(EntryKind::Counter)
                } else {
                    Err(TagvfsError::not_found(path.to_string()))
                }
            }
        }
    }

    /// Tags carried by the object at `path`.
    pub fn object_tags(&self, path: &str) -> Result<Vec<Tag>> {
        let record = self.lookup(path)?;
        self.store.object_tags(record.inode)
    }

    // ------------------------------------------------------------------
    // Objects
    // ------------------------------------------------------------------

    /// Terms a new or linked object receives at a taggable path.
    fn taggable_terms(tree: &QueryTree) -> Result<&[TagTerm]> {
        let query = match &tree.kind {
            QueryKind::Tags(query) if tree.is_taggable() => query,
            _ => {
                return Err(TagvfsError::invalid(format!(
                    "{} is not a taggable path",
                    tree.path
                )))
            }
        };
        let [branch] = query.branches.as_slice() else {
            return Err(TagvfsError::invalid(format!(
                "{} has more than one OR-branch",
                tree.path
            )));
        };
        if let Some(term) = branch.iter().find(|term| !term.is_equality()) {
            return Err(TagvfsError::invalid(format!(
                "cannot tag with comparison {}",
                term
            )));
        }
        Ok(branch.as_slice())
    }

    /// Create an empty object at a taggable path or under `/archive`.
    pub fn create(&self, path: &str) -> Result<ObjectRecord> {
        let tree = self.parse(path);
        if tree.is_malformed() {
            return Err(TagvfsError::not_found(path.to_string()));
        }
        if tree.object_inode().is_some() {
            return Err(TagvfsError::invalid(
                "new objects cannot carry an inode prefix",
            ));
        }

        let terms: &[TagTerm] = match &tree.kind {
            QueryKind::Tags(_) => Self::taggable_terms(&tree)?,
            QueryKind::Archive { object_path }
                if !object_path.is_empty() && !object_path.contains('/') =>
            {
                &[]
            }
            _ => {
                return Err(TagvfsError::invalid(format!(
                    "cannot create an object at {}",
                    path
                )))
            }
        };

        match self.lookup(path) {
            Ok(_) => return Err(TagvfsError::AlreadyExists(path.to_string())),
            Err(TagvfsError::NotFound(_)) => {}
            Err(err) => return Err(err),
        }

        let name = tree
            .object_name()
            .ok_or_else(|| TagvfsError::invalid("missing object name"))?;
        let record = self.store.create_object(name)?;
        for term in terms {
            if let Err(err) = self.store.tag_object(record.inode, term) {
                if let Err(cleanup) = self.store.erase_object(record.inode) {
                    warn!(inode = record.inode, "Failed to roll back object: {}", cleanup);
                }
                return Err(err);
            }
        }
        if self.store.caches().enabled() {
            let tags = terms.iter().map(|term| term.name().to_string()).collect();
            self.store.caches().inodes.insert(path, record.inode, tags);
        }
        info!(inode = record.inode, path, "Created object");
        Ok(record)
    }

    /// Mark the object dirty and open its backing file for writing.
    /// Call [`TagFs::finalize`] once the content is complete.
    pub fn open_for_write(&self, inode: i64) -> Result<File> {
        let record = self.store.require_object(inode)?;
        self.store.invalidate_checksum(inode)?;
        let file = OpenOptions::new()
            .write(true)
            .truncate(true)
            .create(true)
            .open(&record.path)?;
        Ok(file)
    }

    /// Replace the content of the object at `path`, then finalize it.
    pub fn write(&self, path: &str, data: &[u8]) -> Result<WriteOutcome> {
        use std::io::Write;

        let record = self.lookup(path)?;
        let mut file = self.open_for_write(record.inode)?;
        file.write_all(data)?;
        file.sync_all()?;
        drop(file);

        let dedup = self.finalize(record.inode)?;
        Ok(WriteOutcome {
            inode: record.inode,
            dedup,
        })
    }

    /// Content of `inode` is complete: deduplicate now or queue it.
    pub fn finalize(&self, inode: i64) -> Result<Option<DedupOutcome>> {
        match self.dedup_queue()? {
            Some(queue) => {
                queue.submit(inode)?;
                debug!(inode, "Queued dedup pass");
                Ok(None)
            }
            None => Ok(Some(self.dedup.deduplicate(inode))),
        }
    }

    /// Queue of the running worker. The worker lock is released on return.
    fn dedup_queue(&self) -> Result<Option<DedupQueue>> {
        let worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
        let queue = worker.as_ref().map(DedupWorker::queue).transpose()?;
        Ok(queue)
    }

    pub fn read(&self, path: &str) -> Result<Vec<u8>> {
        let tree = self.parse(path);
        if let QueryKind::Stats {
            counter: Some(counter),
        } = &tree.kind
        {
            let value = self
                .stats()?
                .get(counter)
                .ok_or_else(|| TagvfsError::not_found(path.to_string()))?;
            return Ok(format!("{}\n", value).into_bytes());
        }
        let record = self.lookup(path)?;
        Ok(fs::read(&record.path)?)
    }

    /// Tag the object at `existing` with the terms of the taggable `path`.
    pub fn link(&self, existing: &str, path: &str) -> Result<ObjectRecord> {
        let record = self.lookup(existing)?;
        let tree = self.parse(path);
        let terms = Self::taggable_terms(&tree)?;
        if tree.object_name() != Some(record.name.as_str()) {
            return Err(TagvfsError::invalid("link cannot rename an object"));
        }
        for term in terms {
            self.store.tag_object(record.inode, term)?;
        }
        info!(inode = record.inode, path, "Linked object");
        Ok(record)
    }

    /// Remove the object at `path` from this context. Under `/tags` the
    /// path's tags are removed and the object is erased once it has none
    /// left; a path that matches none of the object's own tags is rejected.
    /// Under `/archive` the object is erased outright.
    pub fn unlink(&self, path: &str) -> Result<()> {
        let tree = self.parse(path);
        match &tree.kind {
            QueryKind::Tags(query) => {
                let [branch] = query.branches.as_slice() else {
                    return Err(TagvfsError::invalid(format!(
                        "{} has more than one OR-branch",
                        path
                    )));
                };
                let record = self.lookup(path)?;
                let mut removed = false;
                for term in branch.iter().filter(|term| term.is_equality()) {
                    removed |= self.store.untag_object(record.inode, term)?;
                }
                // Reached only through reasoning or comparisons: nothing to untag.
                if !removed {
                    return Err(TagvfsError::invalid(format!(
                        "{} does not carry the tags of {}",
                        record.name, path
                    )));
                }
                if self.store.count_taggings(record.inode)? == 0 {
                    self.store.erase_object(record.inode)?;
                }
                Ok(())
            }
            QueryKind::Archive { .. } => {
                let record = self.lookup(path)?;
                self.store.erase_object(record.inode)
            }
            QueryKind::Malformed { .. } => Err(TagvfsError::not_found(path.to_string())),
            _ => Err(TagvfsError::invalid(format!("cannot unlink {}", path))),
        }
    }

    /// Rename an object; source and destination must be the same context.
    pub fn rename(&self, from: &str, to: &str) -> Result<ObjectRecord> {
        let from_tree = self.parse(from);
        let to_tree = self.parse(to);
        let same_context = match (&from_tree.kind, &to_tree.kind) {
            (QueryKind::Tags(a), QueryKind::Tags(b)) => a.branches == b.branches,
            (QueryKind::Archive { .. }, QueryKind::Archive { .. }) => true,
            _ => false,
        };
        if !same_context {
            return Err(TagvfsError::invalid(
                "rename across tag contexts is not supported",
            ));
        }
        if !to_tree.points_to_object() || to_tree.object_path().contains('/') {
            return Err(TagvfsError::invalid(format!("bad rename target {}", to)));
        }

        let record = self.lookup(from)?;
        match self.lookup(to) {
            Ok(existing) if existing.inode != record.inode => {
                return Err(TagvfsError::AlreadyExists(to.to_string()))
            }
            Ok(_) | Err(TagvfsError::NotFound(_)) => {}
            Err(err) => return Err(err),
        }
        let new_name = to_tree
            .object_name()
            .ok_or_else(|| TagvfsError::invalid("missing object name"))?;
        self.store.rename_object(record.inode, new_name)
    }

    // ------------------------------------------------------------------
    // Tags and relations
    // ------------------------------------------------------------------

    /// `/tags/.../<tag>` creates the last tag; `/relations/<a>/<kind>/<b>`
    /// creates a relation.
    pub fn mkdir(&self, path: &str) -> Result<()> {
        let tree = self.parse(path);
        match &tree.kind {
            QueryKind::Tags(query) if !query.complete && query.partial.is_none() => {
                let term = tree
                    .last_tag()
                    .ok_or_else(|| TagvfsError::AlreadyExists(path.to_string()))?;
                if !term.is_equality() {
                    return Err(TagvfsError::invalid(format!(
                        "cannot create comparison {}",
                        term
                    )));
                }
                if self.store.find_tag(term)?.is_some() {
                    return Err(TagvfsError::AlreadyExists(term.to_string()));
                }
                self.store.get_or_create_tag(term)?;
                info!(tag = %term, "Created tag");
                Ok(())
            }
            QueryKind::Relations(RelationPath {
                source: Some(source),
                kind: Some(kind),
                target: Some(target),
            }) => {
                let kind: RelationKind = kind.parse()?;
                self.store.create_relation(source, kind, target)?;
                Ok(())
            }
            QueryKind::Malformed { .. } => Err(TagvfsError::not_found(path.to_string())),
            _ => Err(TagvfsError::invalid(format!("cannot mkdir {}", path))),
        }
    }

    /// Inverse of [`TagFs::mkdir`].
    pub fn rmdir(&self, path: &str) -> Result<()> {
        let tree = self.parse(path);
        match &tree.kind {
            QueryKind::Tags(query) if !query.complete && query.partial.is_none() => {
                let term = tree
                    .last_tag()
                    .ok_or_else(|| TagvfsError::invalid("cannot remove /tags"))?;
                self.store.delete_tag(term)
            }
            QueryKind::Relations(RelationPath {
                source: Some(source),
                kind: Some(kind),
                target: Some(target),
            }) => {
                let kind: RelationKind = kind.parse()?;
                self.store.delete_relation(source, kind, target)
            }
            QueryKind::Malformed { .. } => Err(TagvfsError::not_found(path.to_string())),
            _ => Err(TagvfsError::invalid(format!("cannot rmdir {}", path))),
        }
    }

    // ------------------------------------------------------------------
    // Diagnostics and lifecycle
    // ------------------------------------------------------------------

    pub fn stats(&self) -> Result<StatsSnapshot> {
        Ok(self.stats.snapshot(self.store.counts()?))
    }

    /// Wait for queued dedup passes to finish.
    pub fn flush(&self) -> Result<()> {
        match self.dedup_queue()? {
            Some(queue) => queue.flush(),
            None => Ok(()),
        }
    }

    /// Drain the dedup queue and stop the worker. Later writes deduplicate
    /// inline.
    pub fn shutdown(&self) {
        let worker = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(mut worker) = worker {
            worker.shutdown();
        }
    }
}

impl Drop for TagFs {
    fn drop(&mut self) {
        self.shutdown();
    }
}
