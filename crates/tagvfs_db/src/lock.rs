//! Process-level store locking.
//!
//! DuckDB only allows one writer process at a time. A sidecar `.lock` file
//! next to the database coordinates access across tagvfs processes (a
//! mounted filesystem and an admin CLI, for instance).
//!
//! Uses the `fs2` crate for cross-platform file locking.

use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Errors from lock operations.
#[derive(Debug, Error)]
pub enum LockError {
    #[error("Store is locked by another process: {0}")]
    Locked(PathBuf),

    #[error("Failed to create lock file: {0}")]
    CreateFailed(#[source] io::Error),

    #[error("Failed to acquire lock: {0}")]
    AcquireFailed(#[source] io::Error),
}

/// A guard that holds a lock on a store file.
///
/// The lock is released when the guard is dropped.
pub struct DbLockGuard {
    _file: File,
    lock_path: PathBuf,
}

impl DbLockGuard {
    /// Get the path to the lock file.
    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }
}

impl Drop for DbLockGuard {
    fn drop(&mut self) {
        // flock/LockFileEx locks go away with the file handle
        debug!("Releasing store lock: {}", self.lock_path.display());
    }
}

impl std::fmt::Debug for DbLockGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbLockGuard")
            .field("lock_path", &self.lock_path)
            .finish()
    }
}

/// Get the lock file path for a store path.
///
/// Examples:
/// - `/repo/tags.duckdb` → `/repo/tags.duckdb.lock`
/// - `/repo/tags` → `/repo/tags.lock` (no double-dot)
pub fn lock_path_for(db_path: &Path) -> PathBuf {
    let mut lock_path = db_path.to_path_buf();
    match lock_path.extension() {
        Some(ext) => {
            let new_ext = format!("{}.lock", ext.to_string_lossy());
            lock_path.set_extension(new_ext);
        }
        None => {
            lock_path.set_extension("lock");
        }
    }
    lock_path
}

fn open_lock_file(lock_path: &Path) -> Result<File, LockError> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(lock_path)
        .map_err(LockError::CreateFailed)
}

/// Try to acquire an exclusive lock on a store file.
///
/// Non-blocking: if another process holds the lock this returns
/// `Err(LockError::Locked)` immediately.
pub fn try_lock_exclusive(db_path: &Path) -> Result<DbLockGuard, LockError> {
    let lock_path = lock_path_for(db_path);
    debug!("Attempting to acquire exclusive lock: {}", lock_path.display());

    let file = open_lock_file(&lock_path)?;

    // Fully qualified so std's File::try_lock_exclusive (1.89+) is never picked
    match FileExt::try_lock_exclusive(&file) {
        Ok(()) => {
            info!("Acquired exclusive store lock: {}", lock_path.display());
            Ok(DbLockGuard {
                _file: file,
                lock_path,
            })
        }
        Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
            debug!("Store is locked by another process");
            Err(LockError::Locked(db_path.to_path_buf()))
        }
        Err(e) => Err(LockError::AcquireFailed(e)),
    }
}

/// Try to acquire a shared (read) lock on a store file.
///
/// Multiple readers may hold shared locks at once; a writer's exclusive
/// lock excludes them.
pub fn try_lock_shared(db_path: &Path) -> Result<DbLockGuard, LockError> {
    let lock_path = lock_path_for(db_path);
    debug!("Attempting to acquire shared lock: {}", lock_path.display());

    let file = open_lock_file(&lock_path)?;

    match FileExt::try_lock_shared(&file) {
        Ok(()) => Ok(DbLockGuard {
            _file: file,
            lock_path,
        }),
        Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
            debug!("Store has an exclusive lock held by another process");
            Err(LockError::Locked(db_path.to_path_buf()))
        }
        Err(e) => Err(LockError::AcquireFailed(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_lock_path_for() {
        let lock = lock_path_for(Path::new("/repo/tags.duckdb"));
        assert_eq!(lock, PathBuf::from("/repo/tags.duckdb.lock"));

        let lock_no_ext = lock_path_for(Path::new("/repo/tags"));
        assert_eq!(lock_no_ext, PathBuf::from("/repo/tags.lock"));
    }

    #[test]
    fn test_relock_after_drop() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("tags.duckdb");

        let guard = try_lock_exclusive(&db_path).unwrap();
        assert!(guard.lock_path().exists());
        drop(guard);

        let _guard2 = try_lock_exclusive(&db_path).unwrap();
    }

    #[test]
    fn test_lock_contention() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("tags.duckdb");

        let _guard = try_lock_exclusive(&db_path).unwrap();
        let result = try_lock_exclusive(&db_path);
        assert!(matches!(result, Err(LockError::Locked(_))));
    }

    #[test]
    fn test_shared_locks_coexist_but_exclude_writer() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("tags.duckdb");

        let _reader1 = try_lock_shared(&db_path).unwrap();
        let _reader2 = try_lock_shared(&db_path).unwrap();
        let writer = try_lock_exclusive(&db_path);
        assert!(matches!(writer, Err(LockError::Locked(_))));
    }
}
