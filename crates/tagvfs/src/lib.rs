//! tagvfs: a tag-based object store addressed by query paths.
//!
//! Objects carry tags instead of living in directories. A directory path is
//! a boolean query over tags:
//!
//! ```text
//! /tags/holiday/2020/+/trip/@/=/photo.jpg
//!        \___ AND ___/ OR \_/ |  \_ object
//!                             reasoning on
//! ```
//!
//! - [`query`] parses paths into [`QueryTree`]s
//! - [`reasoner`] expands terms through tag relations
//! - [`resolver`] turns reasoned queries into object listings
//! - [`dedup`] folds byte-identical objects into one canonical inode
//! - [`TagFs`] composes them behind path operations

pub mod cache;
pub mod config;
pub mod dedup;
pub mod engine;
pub mod error;
pub mod query;
pub mod reasoner;
pub mod resolver;
pub mod stats;
pub mod store;

pub use config::Config;
pub use dedup::DedupOutcome;
pub use engine::{DirEntry, EntryKind, TagFs, WriteOutcome};
pub use error::{Result, TagvfsError};
pub use query::{QueryTree, TagTerm};
pub use store::{FileHandle, ObjectRecord, RelationKind, Tag, TagStore};
