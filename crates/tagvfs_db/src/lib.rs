//! Tagging store connection layer for tagvfs.
//!
//! This crate is the only place that talks to the database engine. The core
//! issues parameterized statements through [`DbConnection`] and consumes
//! [`DbRow`]s; it never owns connection or schema lifecycle.
//!
//! # Usage
//!
//! ```rust,ignore
//! use tagvfs_db::{ensure_schema, DbConnection, DbValue};
//!
//! let conn = DbConnection::open_from_url("duckdb:/home/me/.tagvfs/tags.duckdb")?;
//! ensure_schema(&conn)?;
//!
//! let tag_id = conn.insert_returning_id(
//!     "INSERT INTO tags (tagname) VALUES (?) RETURNING tag_id",
//!     &[DbValue::from("holiday")],
//! )?;
//! ```

mod backend;
pub mod lock;
mod schema;

pub use backend::{
    AccessMode, BackendError, Capabilities, DbConnection, DbRow, DbTransaction, DbValue,
    FromDbValue, MAX_CONNECT_ATTEMPTS,
};
pub use schema::{ensure_schema, SCHEMA_VERSION};

/// Result alias for store operations.
pub type Result<T> = std::result::Result<T, BackendError>;
