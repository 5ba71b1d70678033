//! Content deduplication.
//!
//! After an object's content is finalized it is hashed, the digest is
//! stored, and the lowest inode carrying the same digest becomes canonical.
//! A higher inode is merged into the canonical one: its taggings move over
//! and its record and file disappear. Failures are logged and leave the
//! store as it was; they never reach the operation that triggered the pass.

mod worker;

pub use worker::{DedupQueue, DedupWorker};

use crate::error::Result;
use crate::stats::Stats;
use crate::store::TagStore;
use serde::Serialize;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DedupOutcome {
    /// The object is the lowest inode with its content. `merged` lists
    /// higher inodes folded into it during this pass.
    Canonical { inode: i64, merged: Vec<i64> },
    /// The object was folded into `canonical` and no longer exists.
    Merged { inode: i64, canonical: i64 },
    /// Nothing changed.
    Skipped { inode: i64, reason: String },
}

impl DedupOutcome {
    pub fn inode(&self) -> i64 {
        match self {
            DedupOutcome::Canonical { inode, .. }
            | DedupOutcome::Merged { inode, .. }
            | DedupOutcome::Skipped { inode, .. } => *inode,
        }
    }

    /// Whether the object survived as canonical.
    pub fn is_canonical(&self) -> bool {
        matches!(self, DedupOutcome::Canonical { .. })
    }
}

/// BLAKE3 hex digest of a file, read `chunk_size` bytes at a time.
pub fn checksum_file(path: &Path, chunk_size: usize) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = blake3::Hasher::new();
    let mut buf = vec![0u8; chunk_size.max(1)];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

pub struct DedupEngine {
    store: TagStore,
    stats: Arc<Stats>,
    chunk_size: usize,
    /// Held from checksum persist to merge so concurrent passes converge.
    critical: Mutex<()>,
}

impl DedupEngine {
    pub fn new(store: TagStore, stats: Arc<Stats>, chunk_size: usize) -> Self {
        Self {
            store,
            stats,
            chunk_size,
            critical: Mutex::new(()),
        }
    }

    fn skipped(inode: i64, reason: impl Into<String>) -> DedupOutcome {
        DedupOutcome::Skipped {
            inode,
            reason: reason.into(),
        }
    }

    pub fn deduplicate(&self, inode: i64) -> DedupOutcome {
        let record = match self.store.get_object(inode) {
            Ok(Some(record)) => record,
            Ok(None) => return Self::skipped(inode, "object no longer exists"),
            Err(err) => {
                warn!(inode, "Dedup lookup failed: {}", err);
                return Self::skipped(inode, err.to_string());
            }
        };

        let digest = match checksum_file(Path::new(&record.path), self.chunk_size) {
            Ok(digest) => digest,
            Err(err) => {
                warn!(inode, path = %record.path, "Checksum read failed, object stays dirty: {}", err);
                return Self::skipped(inode, format!("checksum failed: {}", err));
            }
        };

        let _guard = self.critical.lock().unwrap_or_else(PoisonError::into_inner);
        match self.merge_pass(inode, &digest) {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(inode, "Dedup pass failed: {}", err);
                Self::skipped(inode, err.to_string())
            }
        }
    }

    fn merge_pass(&self, inode: i64, digest: &str) -> Result<DedupOutcome> {
        // merged away by a concurrent pass while we were hashing
        if self.store.get_object(inode)?.is_none() {
            return Ok(Self::skipped(inode, "object no longer exists"));
        }
        self.store.set_checksum(inode, digest)?;

        let canonical = match self.store.lowest_inode_with_checksum(digest)? {
            Some(canonical) if canonical > 0 => canonical,
            other => {
                warn!(inode, ?other, "Inconsistent canonical lookup, skipping merge");
                return Ok(Self::skipped(inode, "inconsistent canonical lookup"));
            }
        };

        if canonical == inode {
            let mut merged = Vec::new();
            for other in self.store.inodes_with_checksum_above(digest, inode)? {
                match self.store.merge_object_into(other, inode) {
                    Ok(()) => merged.push(other),
                    Err(err) => warn!(inode, other, "Failed to merge duplicate: {}", err),
                }
            }
            self.stats.record_dedup_pass(merged.len() as u64);
            debug!(inode, merged = merged.len(), "Object is canonical");
            return Ok(DedupOutcome::Canonical { inode, merged });
        }

        self.store.merge_object_into(inode, canonical)?;
        self.stats.record_dedup_pass(1);
        info!(inode, canonical, "Deduplicated object");
        Ok(DedupOutcome::Merged { inode, canonical })
    }

    /// Run a pass over every object, lowest inode first.
    pub fn deduplicate_all(&self) -> Result<Vec<DedupOutcome>> {
        let mut outcomes = Vec::new();
        for record in self.store.list_objects()? {
            outcomes.push(self.deduplicate(record.inode));
        }
        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn checksum_is_independent_of_chunk_size() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("blob");
        let mut file = File::create(&path).unwrap();
        file.write_all(&vec![7u8; 10_000]).unwrap();
        drop(file);

        let small = checksum_file(&path, 3).unwrap();
        let large = checksum_file(&path, 1 << 20).unwrap();
        assert_eq!(small, large);
        assert_eq!(small, blake3::hash(&vec![7u8; 10_000]).to_hex().to_string());
    }

    #[test]
    fn missing_file_is_an_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        assert!(checksum_file(&tmp.path().join("absent"), 64).is_err());
    }
}
