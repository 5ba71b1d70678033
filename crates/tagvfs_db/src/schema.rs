//! Tagging store schema.
//!
//! All CREATE statements live here - single source of truth.
//!
//! - `tags`: flat tags (`tag_key`/`tag_value` empty) and structured
//!   `namespace:key=value` triples share one table
//! - `objects`: catalogue of stored objects; an empty `checksum` means stale
//! - `tagging`: (inode, tag) association, unique per pair
//! - `relations`: directed tag-to-tag edges

use crate::backend::{BackendError, DbConnection};
use tracing::info;

/// Bumped whenever a table shape changes.
pub const SCHEMA_VERSION: i64 = 1;

const SEQUENCES: &str = r#"
CREATE SEQUENCE IF NOT EXISTS tags_seq START 1;
CREATE SEQUENCE IF NOT EXISTS objects_seq START 1;
CREATE SEQUENCE IF NOT EXISTS relations_seq START 1;
"#;

const TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS tags (
    tag_id BIGINT PRIMARY KEY DEFAULT nextval('tags_seq'),
    tagname TEXT NOT NULL,
    tag_key TEXT NOT NULL DEFAULT '',
    tag_value TEXT NOT NULL DEFAULT '',
    UNIQUE (tagname, tag_key, tag_value)
);

CREATE TABLE IF NOT EXISTS objects (
    inode BIGINT PRIMARY KEY DEFAULT nextval('objects_seq'),
    objectname TEXT NOT NULL,
    path TEXT NOT NULL DEFAULT '',
    checksum TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS tagging (
    inode BIGINT NOT NULL,
    tag_id BIGINT NOT NULL,
    PRIMARY KEY (inode, tag_id)
);

CREATE TABLE IF NOT EXISTS relations (
    relation_id BIGINT PRIMARY KEY DEFAULT nextval('relations_seq'),
    tag1_id BIGINT NOT NULL,
    relation TEXT NOT NULL,
    tag2_id BIGINT NOT NULL
);

CREATE TABLE IF NOT EXISTS schema_meta (
    key TEXT PRIMARY KEY,
    value BIGINT NOT NULL
);
"#;

/// Ensure all tables exist and record the schema version.
pub fn ensure_schema(conn: &DbConnection) -> Result<(), BackendError> {
    conn.execute_batch(SEQUENCES)?;
    conn.execute_batch(TABLES)?;

    let stored: Option<i64> = conn
        .query_optional(
            "SELECT value FROM schema_meta WHERE key = 'version'",
            &[],
        )?
        .map(|row| row.get(0))
        .transpose()?;

    match stored {
        None => {
            conn.execute(
                "INSERT INTO schema_meta (key, value) VALUES ('version', ?)",
                &[SCHEMA_VERSION.into()],
            )?;
        }
        Some(version) if version > SCHEMA_VERSION => {
            return Err(BackendError::NotAvailable(format!(
                "store schema version {} is newer than supported version {}",
                version, SCHEMA_VERSION
            )));
        }
        Some(_) => {}
    }

    info!(version = SCHEMA_VERSION, "Tagging store schema verified");
    Ok(())
}
