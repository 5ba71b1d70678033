//! Error types for the tagvfs core

use std::io;
use thiserror::Error;

/// Core error type.
///
/// Every variant maps onto one filesystem-visible code through
/// [`TagvfsError::errno`]; internal store error codes never reach the caller.
#[derive(Error, Debug)]
pub enum TagvfsError {
    #[error("Store error: {0}")]
    Store(#[from] tagvfs_db::BackendError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Not a directory: {0}")]
    NotADirectory(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Unknown relation kind: {0}")]
    UnknownRelation(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl TagvfsError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidOperation(msg.into())
    }

    /// POSIX errno the filesystem bridge reports for this error.
    pub fn errno(&self) -> i32 {
        match self {
            TagvfsError::NotFound(_) => libc::ENOENT,
            TagvfsError::AlreadyExists(_) => libc::EEXIST,
            TagvfsError::NotADirectory(_) => libc::ENOTDIR,
            TagvfsError::InvalidOperation(_) | TagvfsError::UnknownRelation(_) => libc::EINVAL,
            TagvfsError::Io(err) => err.raw_os_error().unwrap_or(libc::EIO),
            TagvfsError::Store(_) | TagvfsError::Config(_) => libc::EIO,
        }
    }
}

/// Result alias for core operations.
pub type Result<T> = std::result::Result<T, TagvfsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errno_mapping() {
        assert_eq!(TagvfsError::not_found("x").errno(), libc::ENOENT);
        assert_eq!(
            TagvfsError::AlreadyExists("x".into()).errno(),
            libc::EEXIST
        );
        assert_eq!(
            TagvfsError::UnknownRelation("excludes".into()).errno(),
            libc::EINVAL
        );
        assert_eq!(
            TagvfsError::Store(tagvfs_db::BackendError::Connection("gone".into())).errno(),
            libc::EIO
        );
        let io = io::Error::from_raw_os_error(libc::EACCES);
        assert_eq!(TagvfsError::Io(io).errno(), libc::EACCES);
    }
}
