//! Tagging catalogue.
//!
//! Every read and write of tags, objects, taggings and relations goes
//! through [`TagStore`]. Mutations invalidate the caches they can make stale
//! before returning.

mod types;

pub use types::{FileHandle, ObjectRecord, Relation, RelationKind, Tag};

use crate::cache::Caches;
use crate::error::{Result, TagvfsError};
use crate::query::{with_inode_prefix, TagTerm};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tagvfs_db::{BackendError, DbConnection, DbRow, DbTransaction, DbValue};
use tracing::{debug, info, warn};

/// Live catalogue sizes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CatalogueCounts {
    pub tags: i64,
    pub objects: i64,
    pub taggings: i64,
    pub relations: i64,
}

/// `alias.tagname = ? AND alias.tag_key = ? AND alias.tag_value = ?` for
/// the stored tag an equality term names.
pub(crate) fn tag_identity(alias: &str, term: &TagTerm, params: &mut Vec<DbValue>) -> String {
    let (name, key, value) = term.stored_columns();
    params.push(name.into());
    params.push(key.into());
    params.push(value.into());
    format!(
        "{a}.tagname = ? AND {a}.tag_key = ? AND {a}.tag_value = ?",
        a = alias
    )
}

fn tag_from_row(row: &DbRow, offset: usize) -> Result<Tag> {
    Ok(Tag {
        id: row.get(offset)?,
        name: row.get(offset + 1)?,
        key: row.get(offset + 2)?,
        value: row.get(offset + 3)?,
    })
}

fn object_from_row(row: &DbRow) -> Result<ObjectRecord> {
    Ok(ObjectRecord {
        inode: row.get(0)?,
        name: row.get(1)?,
        path: row.get(2)?,
        checksum: row.get(3)?,
    })
}

fn remove_backing_file(path: &str) {
    if path.is_empty() {
        return;
    }
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => warn!(path, "Failed to remove object file: {}", err),
    }
}

const OBJECT_COLUMNS: &str = "inode, objectname, path, checksum";

#[derive(Clone)]
pub struct TagStore {
    conn: DbConnection,
    archive_dir: PathBuf,
    caches: Arc<Caches>,
}

impl TagStore {
    pub fn new(conn: DbConnection, archive_dir: impl Into<PathBuf>, caches: Arc<Caches>) -> Self {
        Self {
            conn,
            archive_dir: archive_dir.into(),
            caches,
        }
    }

    pub fn connection(&self) -> &DbConnection {
        &self.conn
    }

    pub fn archive_dir(&self) -> &Path {
        &self.archive_dir
    }

    pub fn caches(&self) -> &Arc<Caches> {
        &self.caches
    }

    // ------------------------------------------------------------------
    // Tags
    // ------------------------------------------------------------------

    pub fn find_tag(&self, term: &TagTerm) -> Result<Option<Tag>> {
        let mut params = Vec::new();
        let cond = tag_identity("t", term, &mut params);
        let row = self.conn.query_optional(
            &format!(
                "SELECT t.tag_id, t.tagname, t.tag_key, t.tag_value FROM tags t WHERE {}",
                cond
            ),
            &params,
        )?;
        row.map(|row| tag_from_row(&row, 0)).transpose()
    }

    /// Look up the tag `term` names, creating it if missing.
    pub fn get_or_create_tag(&self, term: &TagTerm) -> Result<Tag> {
        Ok(self.conn.transaction(|tx| get_or_create_tag_in(tx, term))?)
    }

    pub fn list_tags(&self) -> Result<Vec<Tag>> {
        let rows = self.conn.query_all(
            "SELECT tag_id, tagname, tag_key, tag_value FROM tags \
             ORDER BY tagname, tag_key, tag_value",
            &[],
        )?;
        rows.iter().map(|row| tag_from_row(row, 0)).collect()
    }

    pub fn list_namespace_keys(&self, namespace: &str) -> Result<Vec<String>> {
        let rows = self.conn.query_all(
            "SELECT DISTINCT tag_key FROM tags WHERE tagname = ? AND tag_key <> '' \
             ORDER BY tag_key",
            &[namespace.into()],
        )?;
        rows.iter()
            .map(|row| row.get(0).map_err(TagvfsError::from))
            .collect()
    }

    pub fn list_namespace_values(&self, namespace: &str, key: &str) -> Result<Vec<String>> {
        let rows = self.conn.query_all(
            "SELECT DISTINCT tag_value FROM tags WHERE tagname = ? AND tag_key = ? \
             ORDER BY tag_value",
            &[namespace.into(), key.into()],
        )?;
        rows.iter()
            .map(|row| row.get(0).map_err(TagvfsError::from))
            .collect()
    }

    /// Delete a tag with its taggings and every relation touching it.
    pub fn delete_tag(&self, term: &TagTerm) -> Result<()> {
        let tag = self
            .find_tag(term)?
            .ok_or_else(|| TagvfsError::not_found(format!("tag {}", term)))?;

        let tagged: Vec<i64> = self
            .conn
            .query_all("SELECT inode FROM tagging WHERE tag_id = ?", &[tag.id.into()])?
            .iter()
            .map(|row| row.get(0))
            .collect::<std::result::Result<_, _>>()?;

        self.conn.transaction(|tx| {
            tx.execute("DELETE FROM tagging WHERE tag_id = ?", &[tag.id.into()])?;
            tx.execute(
                "DELETE FROM relations WHERE tag1_id = ? OR tag2_id = ?",
                &[tag.id.into(), tag.id.into()],
            )?;
            tx.execute("DELETE FROM tags WHERE tag_id = ?", &[tag.id.into()])?;
            Ok(())
        })?;

        self.caches.reasoner.invalidate(&[term]);
        self.caches.and_sets.invalidate_tag(term.name());
        self.caches.inodes.invalidate_tag(term.name());
        for inode in tagged {
            self.caches.inodes.forget_inode(inode);
        }
        info!(tag = %term, "Deleted tag");
        Ok(())
    }

    pub fn object_tags(&self, inode: i64) -> Result<Vec<Tag>> {
        let rows = self.conn.query_all(
            "SELECT t.tag_id, t.tagname, t.tag_key, t.tag_value \
             FROM tagging tg JOIN tags t ON t.tag_id = tg.tag_id \
             WHERE tg.inode = ? ORDER BY t.tagname, t.tag_key, t.tag_value",
            &[inode.into()],
        )?;
        rows.iter().map(|row| tag_from_row(row, 0)).collect()
    }

    // ------------------------------------------------------------------
    // Objects
    // ------------------------------------------------------------------

    fn backing_path(&self, inode: i64, name: &str) -> PathBuf {
        self.archive_dir.join(with_inode_prefix(inode, name))
    }

    /// Create a catalogue record and its empty backing file.
    pub fn create_object(&self, name: &str) -> Result<ObjectRecord> {
        if name.is_empty() || name.contains('/') {
            return Err(TagvfsError::invalid(format!("bad object name '{}'", name)));
        }
        fs::create_dir_all(&self.archive_dir)?;

        let record = self.conn.transaction(|tx| {
            let inode: i64 = tx.query_scalar("SELECT nextval('objects_seq')", &[])?;
            let path = self.backing_path(inode, name).display().to_string();
            tx.execute(
                "INSERT INTO objects (inode, objectname, path) VALUES (?, ?, ?)",
                &[inode.into(), name.into(), path.as_str().into()],
            )?;
            Ok(ObjectRecord {
                inode,
                name: name.to_string(),
                path,
                checksum: String::new(),
            })
        })?;

        if let Err(err) = fs::File::create(&record.path) {
            self.conn
                .execute("DELETE FROM objects WHERE inode = ?", &[record.inode.into()])?;
            return Err(err.into());
        }
        debug!(inode = record.inode, name, "Created object");
        Ok(record)
    }

    pub fn get_object(&self, inode: i64) -> Result<Option<ObjectRecord>> {
        let row = self.conn.query_optional(
            &format!("SELECT {} FROM objects WHERE inode = ?", OBJECT_COLUMNS),
            &[inode.into()],
        )?;
        row.map(|row| object_from_row(&row)).transpose()
    }

    pub fn require_object(&self, inode: i64) -> Result<ObjectRecord> {
        self.get_object(inode)?
            .ok_or_else(|| TagvfsError::not_found(format!("inode {}", inode)))
    }

    /// Objects named `name`, lowest inode first.
    pub fn find_objects_by_name(&self, name: &str) -> Result<Vec<ObjectRecord>> {
        let rows = self.conn.query_all(
            &format!(
                "SELECT {} FROM objects WHERE objectname = ? ORDER BY inode",
                OBJECT_COLUMNS
            ),
            &[name.into()],
        )?;
        rows.iter().map(object_from_row).collect()
    }

    pub fn list_objects(&self) -> Result<Vec<ObjectRecord>> {
        let rows = self.conn.query_all(
            &format!("SELECT {} FROM objects ORDER BY inode", OBJECT_COLUMNS),
            &[],
        )?;
        rows.iter().map(object_from_row).collect()
    }

    pub fn rename_object(&self, inode: i64, new_name: &str) -> Result<ObjectRecord> {
        if new_name.is_empty() || new_name.contains('/') {
            return Err(TagvfsError::invalid(format!(
                "bad object name '{}'",
                new_name
            )));
        }
        let old = self.require_object(inode)?;
        let new_path = self.backing_path(inode, new_name).display().to_string();

        if !old.path.is_empty() && Path::new(&old.path).exists() {
            fs::rename(&old.path, &new_path)?;
        }
        self.conn.execute(
            "UPDATE objects SET objectname = ?, path = ? WHERE inode = ?",
            &[new_name.into(), new_path.as_str().into(), inode.into()],
        )?;

        self.caches.inodes.forget_inode(inode);
        self.caches.and_sets.rewrite_inode(inode, inode, new_name);
        info!(inode, from = %old.name, to = new_name, "Renamed object");
        Ok(ObjectRecord {
            name: new_name.to_string(),
            path: new_path,
            ..old
        })
    }

    /// Remove an object: taggings, record and backing file.
    pub fn erase_object(&self, inode: i64) -> Result<()> {
        let record = self.require_object(inode)?;
        let tags = self.object_tags(inode)?;

        self.conn.transaction(|tx| {
            tx.execute("DELETE FROM tagging WHERE inode = ?", &[inode.into()])?;
            tx.execute("DELETE FROM objects WHERE inode = ?", &[inode.into()])?;
            Ok(())
        })?;
        remove_backing_file(&record.path);

        self.caches.object_moved(inode, None);
        for tag in &tags {
            self.caches.and_sets.invalidate_tag(&tag.name);
        }
        info!(inode, name = %record.name, "Erased object");
        Ok(())
    }

    pub fn tag_object(&self, inode: i64, term: &TagTerm) -> Result<Tag> {
        if !term.is_equality() {
            return Err(TagvfsError::invalid(format!(
                "cannot tag with comparison {}",
                term
            )));
        }
        let tag = self.conn.transaction(|tx| {
            let tag = get_or_create_tag_in(tx, term)?;
            tx.execute(
                "INSERT OR IGNORE INTO tagging (inode, tag_id) VALUES (?, ?)",
                &[inode.into(), tag.id.into()],
            )?;
            Ok(tag)
        })?;
        self.caches.and_sets.invalidate_tag(term.name());
        self.caches.inodes.invalidate_tag(term.name());
        debug!(inode, tag = %term, "Tagged object");
        Ok(tag)
    }

    /// Returns whether a tagging was removed.
    pub fn untag_object(&self, inode: i64, term: &TagTerm) -> Result<bool> {
        let Some(tag) = self.find_tag(term)? else {
            return Ok(false);
        };
        let removed = self.conn.execute(
            "DELETE FROM tagging WHERE inode = ? AND tag_id = ?",
            &[inode.into(), tag.id.into()],
        )?;
        self.caches.and_sets.invalidate_tag(term.name());
        self.caches.inodes.forget_inode(inode);
        debug!(inode, tag = %term, removed, "Untagged object");
        Ok(removed > 0)
    }

    pub fn count_taggings(&self, inode: i64) -> Result<i64> {
        Ok(self.conn.query_scalar(
            "SELECT COUNT(*) FROM tagging WHERE inode = ?",
            &[inode.into()],
        )?)
    }

    /// Mark content dirty.
    pub fn invalidate_checksum(&self, inode: i64) -> Result<()> {
        self.conn.execute(
            "UPDATE objects SET checksum = '' WHERE inode = ?",
            &[inode.into()],
        )?;
        Ok(())
    }

    pub fn set_checksum(&self, inode: i64, checksum: &str) -> Result<()> {
        self.conn.execute(
            "UPDATE objects SET checksum = ? WHERE inode = ?",
            &[checksum.into(), inode.into()],
        )?;
        Ok(())
    }

    pub fn lowest_inode_with_checksum(&self, checksum: &str) -> Result<Option<i64>> {
        Ok(self.conn.query_scalar(
            "SELECT MIN(inode) FROM objects WHERE checksum = ?",
            &[checksum.into()],
        )?)
    }

    pub fn inodes_with_checksum_above(&self, checksum: &str, inode: i64) -> Result<Vec<i64>> {
        let rows = self.conn.query_all(
            "SELECT inode FROM objects WHERE checksum = ? AND inode > ? ORDER BY inode",
            &[checksum.into(), inode.into()],
        )?;
        rows.iter()
            .map(|row| row.get(0).map_err(TagvfsError::from))
            .collect()
    }

    /// Move every tagging of `loser` onto `canonical`, then drop `loser`'s
    /// taggings, record and backing file.
    pub fn merge_object_into(&self, loser: i64, canonical: i64) -> Result<()> {
        if loser == canonical {
            return Err(TagvfsError::invalid("cannot merge an object into itself"));
        }
        let loser_record = self.require_object(loser)?;
        let canonical_record = self.require_object(canonical)?;
        let moved_tags = self.object_tags(loser)?;

        self.conn.transaction(|tx| {
            tx.execute(
                "INSERT OR IGNORE INTO tagging (inode, tag_id) \
                 SELECT ?, tag_id FROM tagging WHERE inode = ?",
                &[canonical.into(), loser.into()],
            )?;
            tx.execute("DELETE FROM tagging WHERE inode = ?", &[loser.into()])?;
            tx.execute("DELETE FROM objects WHERE inode = ?", &[loser.into()])?;
            Ok(())
        })?;
        remove_backing_file(&loser_record.path);

        self.caches
            .object_moved(loser, Some((canonical, &canonical_record.name)));
        // The canonical object now answers queries it did not match before.
        for tag in &moved_tags {
            self.caches.and_sets.invalidate_tag(&tag.name);
            self.caches.inodes.invalidate_tag(&tag.name);
        }
        info!(loser, canonical, "Merged duplicate object");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Relations
    // ------------------------------------------------------------------

    pub fn create_relation(
        &self,
        source: &TagTerm,
        kind: RelationKind,
        target: &TagTerm,
    ) -> Result<Relation> {
        if !source.is_equality() || !target.is_equality() {
            return Err(TagvfsError::invalid("relation endpoints must name tags"));
        }
        if source.cache_key() == target.cache_key() {
            return Err(TagvfsError::invalid(format!(
                "tag {} cannot relate to itself",
                source
            )));
        }

        let relation = self
            .conn
            .transaction(|tx| create_relation_in(tx, source, kind, target))?
            .ok_or_else(|| {
                TagvfsError::AlreadyExists(format!("relation {} {} {}", source, kind, target))
            })?;

        self.caches.relation_changed(source, target);
        info!(source = %source, kind = %kind, target = %target, "Created relation");
        Ok(relation)
    }

    pub fn delete_relation(
        &self,
        source: &TagTerm,
        kind: RelationKind,
        target: &TagTerm,
    ) -> Result<()> {
        let (Some(src), Some(dst)) = (self.find_tag(source)?, self.find_tag(target)?) else {
            return Err(TagvfsError::not_found(format!(
                "relation {} {} {}",
                source, kind, target
            )));
        };
        let removed = self.conn.execute(
            "DELETE FROM relations WHERE tag1_id = ? AND relation = ? AND tag2_id = ?",
            &[src.id.into(), kind.as_str().into(), dst.id.into()],
        )?;
        if removed == 0 {
            return Err(TagvfsError::not_found(format!(
                "relation {} {} {}",
                source, kind, target
            )));
        }
        self.caches.relation_changed(source, target);
        info!(source = %source, kind = %kind, target = %target, "Deleted relation");
        Ok(())
    }

    /// Relations, optionally only those leaving `source` and of `kind`.
    pub fn list_relations(
        &self,
        source: Option<&TagTerm>,
        kind: Option<RelationKind>,
    ) -> Result<Vec<Relation>> {
        let mut sql = String::from(
            "SELECT r.relation_id, r.relation, \
                    t1.tag_id, t1.tagname, t1.tag_key, t1.tag_value, \
                    t2.tag_id, t2.tagname, t2.tag_key, t2.tag_value \
             FROM relations r \
             JOIN tags t1 ON t1.tag_id = r.tag1_id \
             JOIN tags t2 ON t2.tag_id = r.tag2_id \
             WHERE 1 = 1",
        );
        let mut params = Vec::new();
        if let Some(source) = source {
            sql.push_str(" AND ");
            sql.push_str(&tag_identity("t1", source, &mut params));
        }
        if let Some(kind) = kind {
            sql.push_str(" AND r.relation = ?");
            params.push(kind.as_str().into());
        }
        sql.push_str(" ORDER BY r.relation_id");

        let mut relations = Vec::new();
        for row in self.conn.query_all(&sql, &params)? {
            let id: i64 = row.get(0)?;
            let raw_kind: String = row.get(1)?;
            let Ok(kind) = raw_kind.parse::<RelationKind>() else {
                warn!(relation_id = id, kind = %raw_kind, "Skipping relation of unknown kind");
                continue;
            };
            relations.push(Relation {
                id,
                source: tag_from_row(&row, 2)?,
                kind,
                target: tag_from_row(&row, 6)?,
            });
        }
        Ok(relations)
    }

    /// Tags one relation step away from `term`: targets of any relation
    /// leaving it, and sources of `is_equivalent` relations pointing at it.
    pub fn related_tags(&self, term: &TagTerm) -> Result<Vec<TagTerm>> {
        let mut related = Vec::new();

        let mut params = Vec::new();
        let cond = tag_identity("src", term, &mut params);
        let forward = self.conn.query_all(
            &format!(
                "SELECT r.relation_id, dst.tagname, dst.tag_key, dst.tag_value \
                 FROM relations r \
                 JOIN tags src ON src.tag_id = r.tag1_id \
                 LEFT JOIN tags dst ON dst.tag_id = r.tag2_id \
                 WHERE {} ORDER BY r.relation_id",
                cond
            ),
            &params,
        )?;

        let mut params = vec![DbValue::from(RelationKind::IsEquivalent.as_str())];
        let cond = tag_identity("dst", term, &mut params);
        let backward = self.conn.query_all(
            &format!(
                "SELECT r.relation_id, src.tagname, src.tag_key, src.tag_value \
                 FROM relations r \
                 JOIN tags dst ON dst.tag_id = r.tag2_id \
                 LEFT JOIN tags src ON src.tag_id = r.tag1_id \
                 WHERE r.relation = ? AND {} ORDER BY r.relation_id",
                cond
            ),
            &params,
        )?;

        for row in forward.iter().chain(backward.iter()) {
            let relation_id: i64 = row.get(0)?;
            let name: Option<String> = row.get(1)?;
            let Some(name) = name else {
                warn!(relation_id, from = %term, "Relation points at a missing tag");
                continue;
            };
            let tag = Tag {
                id: 0,
                name,
                key: row.get::<Option<String>>(2)?.unwrap_or_default(),
                value: row.get::<Option<String>>(3)?.unwrap_or_default(),
            };
            related.push(tag.term());
        }
        Ok(related)
    }

    pub fn counts(&self) -> Result<CatalogueCounts> {
        let row = self.conn.query_one(
            "SELECT \
                (SELECT COUNT(*) FROM tags), \
                (SELECT COUNT(*) FROM objects), \
                (SELECT COUNT(*) FROM tagging), \
                (SELECT COUNT(*) FROM relations)",
            &[],
        )?;
        Ok(CatalogueCounts {
            tags: row.get(0)?,
            objects: row.get(1)?,
            taggings: row.get(2)?,
            relations: row.get(3)?,
        })
    }
}

fn get_or_create_tag_in(
    tx: &mut DbTransaction<'_>,
    term: &TagTerm,
) -> std::result::Result<Tag, BackendError> {
    let (name, key, value) = term.stored_columns();
    let params = [DbValue::from(name), DbValue::from(key), DbValue::from(value)];

    let existing: Option<i64> = tx
        .query_optional(
            "SELECT tag_id FROM tags WHERE tagname = ? AND tag_key = ? AND tag_value = ?",
            &params,
        )?
        .map(|row| row.get(0))
        .transpose()?;

    let id = match existing {
        Some(id) => id,
        None => tx.insert_returning_id(
            "INSERT INTO tags (tagname, tag_key, tag_value) VALUES (?, ?, ?) RETURNING tag_id",
            &params,
        )?,
    };
    Ok(Tag {
        id,
        name: name.to_string(),
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn create_relation_in(
    tx: &mut DbTransaction<'_>,
    source: &TagTerm,
    kind: RelationKind,
    target: &TagTerm,
) -> std::result::Result<Option<Relation>, BackendError> {
    let src = get_or_create_tag_in(tx, source)?;
    let dst = get_or_create_tag_in(tx, target)?;

    let existing: i64 = tx.query_scalar(
        "SELECT COUNT(*) FROM relations WHERE tag1_id = ? AND relation = ? AND tag2_id = ?",
        &[src.id.into(), kind.as_str().into(), dst.id.into()],
    )?;
    if existing > 0 {
        return Ok(None);
    }

    let id = tx.insert_returning_id(
        "INSERT INTO relations (tag1_id, relation, tag2_id) VALUES (?, ?, ?) RETURNING relation_id",
        &[src.id.into(), kind.as_str().into(), dst.id.into()],
    )?;
    Ok(Some(Relation {
        id,
        source: src,
        kind,
        target: dst,
    }))
}
