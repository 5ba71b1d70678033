//! Tagging store connection.
//!
//! Synchronous DuckDB backend shared by every filesystem worker thread.
//! - One connection behind one mutex: statements and transactions never interleave
//! - Single writer process enforced via file lock
//! - A lost connection is reopened a bounded number of times

use crate::lock::{try_lock_exclusive, try_lock_shared, DbLockGuard, LockError};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug_span, info, warn};

/// Attempts made to (re)open a lost connection before giving up.
pub const MAX_CONNECT_ATTEMPTS: u32 = 3;

const RECONNECT_BACKOFF: Duration = Duration::from_millis(50);

/// Errors from database backend operations.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Store is locked by another process: {0}")]
    Locked(String),

    #[error("Operation requires write access but store is read-only")]
    ReadOnly,

    #[error("Query error: {0}")]
    Query(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Type conversion error: {0}")]
    TypeConversion(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Backend not available: {0}")]
    NotAvailable(String),

    #[error("Connection lost: {0}")]
    Connection(String),

    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),
}

impl BackendError {
    /// Whether the connection itself is unusable and must be reopened.
    pub fn is_connection_loss(&self) -> bool {
        match self {
            BackendError::Connection(_) => true,
            // DuckDB refuses all further work on an instance after a fatal error
            BackendError::DuckDb(err) => err
                .to_string()
                .contains("database has been invalidated"),
            _ => false,
        }
    }
}

/// Database access mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// Read-write access (requires exclusive lock)
    ReadWrite,
    /// Read-only access (can coexist with other readers)
    ReadOnly,
}

/// Value type for query parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum DbValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
    Boolean(bool),
}

impl From<i32> for DbValue {
    fn from(v: i32) -> Self {
        DbValue::Integer(v as i64)
    }
}

impl From<i64> for DbValue {
    fn from(v: i64) -> Self {
        DbValue::Integer(v)
    }
}

impl From<f64> for DbValue {
    fn from(v: f64) -> Self {
        DbValue::Real(v)
    }
}

impl From<String> for DbValue {
    fn from(v: String) -> Self {
        DbValue::Text(v)
    }
}

impl From<&str> for DbValue {
    fn from(v: &str) -> Self {
        DbValue::Text(v.to_string())
    }
}

impl From<bool> for DbValue {
    fn from(v: bool) -> Self {
        DbValue::Boolean(v)
    }
}

impl From<Vec<u8>> for DbValue {
    fn from(v: Vec<u8>) -> Self {
        DbValue::Blob(v)
    }
}

impl<T: Into<DbValue>> From<Option<T>> for DbValue {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => DbValue::Null,
        }
    }
}

/// Row data from a query result.
#[derive(Debug, Clone)]
pub struct DbRow {
    columns: Vec<String>,
    values: Vec<DbValue>,
}

impl DbRow {
    /// Create a new row with column names and values.
    pub fn new(columns: Vec<String>, values: Vec<DbValue>) -> Self {
        Self { columns, values }
    }

    /// Get a value by column index.
    pub fn get<T: FromDbValue>(&self, index: usize) -> Result<T, BackendError> {
        self.values
            .get(index)
            .ok_or_else(|| {
                BackendError::TypeConversion(format!("Column index {} out of bounds", index))
            })
            .and_then(|v| T::from_db_value(v))
    }

    /// Get a value by column name.
    pub fn get_by_name<T: FromDbValue>(&self, name: &str) -> Result<T, BackendError> {
        let index =
            self.columns.iter().position(|c| c == name).ok_or_else(|| {
                BackendError::TypeConversion(format!("Column '{}' not found", name))
            })?;
        self.get(index)
    }

    /// Get the number of columns.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the row is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Get the column names.
    pub fn column_names(&self) -> &[String] {
        &self.columns
    }
}

/// Trait for converting from DbValue.
pub trait FromDbValue: Sized {
    fn from_db_value(value: &DbValue) -> Result<Self, BackendError>;
}

impl FromDbValue for i64 {
    fn from_db_value(value: &DbValue) -> Result<Self, BackendError> {
        match value {
            DbValue::Integer(v) => Ok(*v),
            DbValue::Null => Err(BackendError::TypeConversion(
                "i64 field is NULL - use Option<i64> for nullable columns".to_string(),
            )),
            _ => Err(BackendError::TypeConversion("Expected integer".to_string())),
        }
    }
}

impl FromDbValue for f64 {
    fn from_db_value(value: &DbValue) -> Result<Self, BackendError> {
        match value {
            DbValue::Real(v) => Ok(*v),
            DbValue::Integer(v) => Ok(*v as f64),
            DbValue::Null => Err(BackendError::TypeConversion(
                "f64 field is NULL - use Option<f64> for nullable columns".to_string(),
            )),
            _ => Err(BackendError::TypeConversion("Expected real".to_string())),
        }
    }
}

impl FromDbValue for String {
    fn from_db_value(value: &DbValue) -> Result<Self, BackendError> {
        match value {
            DbValue::Text(v) => Ok(v.clone()),
            DbValue::Null => Err(BackendError::TypeConversion(
                "String field is NULL - use Option<String> for nullable columns".to_string(),
            )),
            _ => Err(BackendError::TypeConversion("Expected text".to_string())),
        }
    }
}

impl FromDbValue for bool {
    fn from_db_value(value: &DbValue) -> Result<Self, BackendError> {
        match value {
            DbValue::Boolean(v) => Ok(*v),
            DbValue::Integer(v) => Ok(*v != 0),
            DbValue::Null => Err(BackendError::TypeConversion(
                "bool field is NULL - use Option<bool> for nullable columns".to_string(),
            )),
            _ => Err(BackendError::TypeConversion("Expected boolean".to_string())),
        }
    }
}

impl<T: FromDbValue> FromDbValue for Option<T> {
    fn from_db_value(value: &DbValue) -> Result<Self, BackendError> {
        match value {
            DbValue::Null => Ok(None),
            _ => T::from_db_value(value).map(Some),
        }
    }
}

/// What the backend's SQL dialect can express natively.
///
/// Consulted once, when query strategies are selected at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// `SELECT ... INTERSECT SELECT ...` is available.
    pub native_intersect: bool,
}

#[derive(Debug, Clone)]
enum DbTarget {
    File(PathBuf),
    Memory,
}

impl DbTarget {
    fn open(&self, access_mode: AccessMode) -> Result<duckdb::Connection, BackendError> {
        match (self, access_mode) {
            (DbTarget::File(path), AccessMode::ReadWrite) => Ok(duckdb::Connection::open(path)?),
            (DbTarget::File(path), AccessMode::ReadOnly) => {
                use duckdb::{AccessMode as DuckAccessMode, Config};

                let config = Config::default()
                    .access_mode(DuckAccessMode::ReadOnly)
                    .map_err(BackendError::from)?;
                Ok(duckdb::Connection::open_with_flags(path, config)?)
            }
            (DbTarget::Memory, _) => Ok(duckdb::Connection::open_in_memory()?),
        }
    }

    /// In-memory databases die with their connection.
    fn can_reopen(&self) -> bool {
        matches!(self, DbTarget::File(_))
    }
}

struct Shared {
    conn: Mutex<Option<duckdb::Connection>>,
    target: DbTarget,
    access_mode: AccessMode,
    /// Holds the file lock via RAII - not read, but dropping it releases the lock.
    _lock_guard: Option<DbLockGuard>,
}

/// Process-wide store connection.
///
/// Cloning is cheap and every clone shares the same underlying connection
/// and the same critical section.
#[derive(Clone)]
pub struct DbConnection {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for DbConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbConnection")
            .field("backend", &"DuckDB")
            .field("target", &self.shared.target)
            .field("access_mode", &self.shared.access_mode)
            .finish()
    }
}

impl DbConnection {
    /// Open a database from a URL.
    ///
    /// Supported schemes: `duckdb:<path>` and `duckdb::memory:`.
    pub fn open_from_url(url: &str) -> Result<Self, BackendError> {
        if url == "duckdb::memory:" {
            return Self::open_duckdb_memory();
        }
        if let Some(path) = strip_url_prefix(url, "duckdb:") {
            return Self::open_duckdb(Path::new(&path));
        }

        Err(BackendError::NotAvailable(format!(
            "Unsupported database URL: {}",
            url
        )))
    }

    /// Open a DuckDB database with exclusive write lock.
    pub fn open_duckdb(path: &Path) -> Result<Self, BackendError> {
        let lock_guard = try_lock_exclusive(path).map_err(lock_error)?;
        let target = DbTarget::File(path.to_path_buf());
        let conn = target.open(AccessMode::ReadWrite)?;
        info!("Opened DuckDB store with exclusive lock: {}", path.display());

        Ok(Self::from_parts(
            conn,
            target,
            AccessMode::ReadWrite,
            Some(lock_guard),
        ))
    }

    /// Open a DuckDB database in read-only mode (shared lock).
    pub fn open_duckdb_readonly(path: &Path) -> Result<Self, BackendError> {
        let lock_guard = try_lock_shared(path).map_err(lock_error)?;
        let target = DbTarget::File(path.to_path_buf());
        let conn = target.open(AccessMode::ReadOnly)?;
        info!("Opened DuckDB store (read-only): {}", path.display());

        Ok(Self::from_parts(
            conn,
            target,
            AccessMode::ReadOnly,
            Some(lock_guard),
        ))
    }

    /// Open an in-memory DuckDB database (for testing).
    pub fn open_duckdb_memory() -> Result<Self, BackendError> {
        let target = DbTarget::Memory;
        let conn = target.open(AccessMode::ReadWrite)?;
        info!("Opened in-memory DuckDB store");

        Ok(Self::from_parts(conn, target, AccessMode::ReadWrite, None))
    }

    fn from_parts(
        conn: duckdb::Connection,
        target: DbTarget,
        access_mode: AccessMode,
        lock_guard: Option<DbLockGuard>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                conn: Mutex::new(Some(conn)),
                target,
                access_mode,
                _lock_guard: lock_guard,
            }),
        }
    }

    /// Get the access mode.
    pub fn access_mode(&self) -> AccessMode {
        self.shared.access_mode
    }

    /// Check if this connection has write access.
    pub fn is_writable(&self) -> bool {
        self.shared.access_mode == AccessMode::ReadWrite
    }

    /// Get the backend name.
    pub fn backend_name(&self) -> &'static str {
        "DuckDB"
    }

    /// Dialect capabilities of this backend.
    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            native_intersect: true,
        }
    }

    /// Execute a SQL statement (no results).
    pub fn execute(&self, sql: &str, params: &[DbValue]) -> Result<u64, BackendError> {
        self.ensure_writable()?;
        self.with_conn(|conn| execute_on_conn(conn, sql, params))
    }

    /// Execute a batch of SQL statements.
    pub fn execute_batch(&self, sql: &str) -> Result<(), BackendError> {
        self.ensure_writable()?;
        self.with_conn(|conn| execute_batch_on_conn(conn, sql))
    }

    /// Run an `INSERT ... RETURNING <id>` statement and return the generated id.
    ///
    /// The statement runs inside the connection's critical section, so the
    /// id always belongs to this caller's row.
    pub fn insert_returning_id(&self, sql: &str, params: &[DbValue]) -> Result<i64, BackendError> {
        self.ensure_writable()?;
        self.query_scalar(sql, params)
    }

    /// Query and return all rows.
    pub fn query_all(&self, sql: &str, params: &[DbValue]) -> Result<Vec<DbRow>, BackendError> {
        self.with_conn(|conn| query_on_conn(conn, sql, params))
    }

    /// Query and return the first row, if any.
    pub fn query_optional(
        &self,
        sql: &str,
        params: &[DbValue],
    ) -> Result<Option<DbRow>, BackendError> {
        let rows = self.query_all(sql, params)?;
        Ok(rows.into_iter().next())
    }

    /// Query and return exactly one row.
    pub fn query_one(&self, sql: &str, params: &[DbValue]) -> Result<DbRow, BackendError> {
        self.query_optional(sql, params)?
            .ok_or_else(|| BackendError::Query("Expected one row, got none".to_string()))
    }

    /// Query and return a single scalar value.
    pub fn query_scalar<T: FromDbValue>(
        &self,
        sql: &str,
        params: &[DbValue],
    ) -> Result<T, BackendError> {
        let row = self.query_one(sql, params)?;
        row.get(0)
    }

    /// Execute a transaction.
    ///
    /// The connection lock is held from `BEGIN` to `COMMIT`/`ROLLBACK`, so no
    /// other statement can interleave with the closure's statements.
    pub fn transaction<T, F>(&self, op: F) -> Result<T, BackendError>
    where
        F: FnOnce(&mut DbTransaction<'_>) -> Result<T, BackendError>,
    {
        self.ensure_writable()?;
        let mut guard = self.acquire()?;
        let conn = guard
            .as_ref()
            .ok_or_else(|| BackendError::Connection("connection unavailable".to_string()))?;

        conn.execute_batch("BEGIN")?;
        let mut tx = DbTransaction { conn };
        let result = op(&mut tx);

        let outcome = match result {
            Ok(value) => conn.execute_batch("COMMIT").map(|_| value).map_err(BackendError::from),
            Err(err) => match conn.execute_batch("ROLLBACK") {
                Ok(()) => Err(err),
                Err(rollback_err) => Err(BackendError::Transaction(format!(
                    "Transaction failed: {}; rollback failed: {}",
                    err, rollback_err
                ))),
            },
        };

        if let Err(err) = &outcome {
            if err.is_connection_loss() {
                warn!("Store connection lost inside transaction: {}", err);
                *guard = None;
            }
        }
        outcome
    }

    fn ensure_writable(&self) -> Result<(), BackendError> {
        if self.shared.access_mode == AccessMode::ReadOnly {
            return Err(BackendError::ReadOnly);
        }
        Ok(())
    }

    fn lock_conn(&self) -> MutexGuard<'_, Option<duckdb::Connection>> {
        match self.shared.conn.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                // A thread panicked mid-statement; its transaction state is unknown.
                warn!("Store connection lock poisoned; dropping connection");
                let mut guard = poisoned.into_inner();
                *guard = None;
                self.shared.conn.clear_poison();
                guard
            }
        }
    }

    /// Lock the connection, reopening it first if it was lost.
    fn acquire(&self) -> Result<MutexGuard<'_, Option<duckdb::Connection>>, BackendError> {
        let mut guard = self.lock_conn();
        let mut attempt = 0;
        while guard.is_none() {
            if !self.shared.target.can_reopen() {
                return Err(BackendError::Connection(
                    "in-memory store cannot be reopened".to_string(),
                ));
            }
            attempt += 1;
            match self.shared.target.open(self.shared.access_mode) {
                Ok(conn) => {
                    info!(attempt, "Reopened store connection");
                    *guard = Some(conn);
                }
                Err(err) if attempt < MAX_CONNECT_ATTEMPTS => {
                    warn!(attempt, "Failed to reopen store connection: {}", err);
                    thread::sleep(RECONNECT_BACKOFF * attempt);
                }
                Err(err) => {
                    return Err(BackendError::Connection(format!(
                        "gave up after {} attempts: {}",
                        attempt, err
                    )));
                }
            }
        }
        Ok(guard)
    }

    fn with_conn<T, F>(&self, mut op: F) -> Result<T, BackendError>
    where
        F: FnMut(&duckdb::Connection) -> Result<T, BackendError>,
    {
        let mut retries = 0;
        loop {
            let mut guard = self.acquire()?;
            let conn = guard
                .as_ref()
                .ok_or_else(|| BackendError::Connection("connection unavailable".to_string()))?;
            match op(conn) {
                Err(err) if err.is_connection_loss() => {
                    warn!(retries, "Store connection lost: {}", err);
                    *guard = None;
                    retries += 1;
                    if retries >= MAX_CONNECT_ATTEMPTS || !self.shared.target.can_reopen() {
                        return Err(err);
                    }
                }
                other => return other,
            }
        }
    }
}

/// Statements issued inside [`DbConnection::transaction`].
pub struct DbTransaction<'a> {
    conn: &'a duckdb::Connection,
}

impl<'a> DbTransaction<'a> {
    pub fn execute(&mut self, sql: &str, params: &[DbValue]) -> Result<u64, BackendError> {
        execute_on_conn(self.conn, sql, params)
    }

    pub fn query_all(&mut self, sql: &str, params: &[DbValue]) -> Result<Vec<DbRow>, BackendError> {
        query_on_conn(self.conn, sql, params)
    }

    pub fn query_optional(
        &mut self,
        sql: &str,
        params: &[DbValue],
    ) -> Result<Option<DbRow>, BackendError> {
        let rows = self.query_all(sql, params)?;
        Ok(rows.into_iter().next())
    }

    pub fn query_scalar<T: FromDbValue>(
        &mut self,
        sql: &str,
        params: &[DbValue],
    ) -> Result<T, BackendError> {
        self.query_optional(sql, params)?
            .ok_or_else(|| BackendError::Query("Expected one row, got none".to_string()))?
            .get(0)
    }

    pub fn insert_returning_id(
        &mut self,
        sql: &str,
        params: &[DbValue],
    ) -> Result<i64, BackendError> {
        self.query_scalar(sql, params)
    }
}

fn execute_on_conn(
    conn: &duckdb::Connection,
    sql: &str,
    params: &[DbValue],
) -> Result<u64, BackendError> {
    let op = sql_op_name(sql);
    let sql_hash = hash_sql(sql);
    let span = debug_span!(
        "db.exec",
        op = op,
        sql_hash = %sql_hash,
        duration_ms = tracing::field::Empty
    );
    let _guard = span.enter();
    let start = Instant::now();

    let mut stmt = conn.prepare(sql)?;
    let duckdb_params = to_duckdb_params(params);
    let param_refs: Vec<&dyn duckdb::ToSql> = duckdb_params
        .iter()
        .map(|v| v as &dyn duckdb::ToSql)
        .collect();
    let rows = stmt.execute(param_refs.as_slice())?;
    span.record("duration_ms", start.elapsed().as_millis() as u64);
    Ok(rows as u64)
}

fn execute_batch_on_conn(conn: &duckdb::Connection, sql: &str) -> Result<(), BackendError> {
    let sql_hash = hash_sql(sql);
    let span = debug_span!(
        "db.exec_batch",
        op = "BATCH",
        sql_hash = %sql_hash,
        duration_ms = tracing::field::Empty
    );
    let _guard = span.enter();
    let start = Instant::now();
    conn.execute_batch(sql)?;
    span.record("duration_ms", start.elapsed().as_millis() as u64);
    Ok(())
}

fn query_on_conn(
    conn: &duckdb::Connection,
    sql: &str,
    params: &[DbValue],
) -> Result<Vec<DbRow>, BackendError> {
    let op = sql_op_name(sql);
    let sql_hash = hash_sql(sql);
    let span = debug_span!(
        "db.query",
        op = op,
        sql_hash = %sql_hash,
        rows = tracing::field::Empty,
        duration_ms = tracing::field::Empty
    );
    let _guard = span.enter();
    let start = Instant::now();

    let mut stmt = conn.prepare(sql)?;
    let duckdb_params = to_duckdb_params(params);
    let param_refs: Vec<&dyn duckdb::ToSql> = duckdb_params
        .iter()
        .map(|v| v as &dyn duckdb::ToSql)
        .collect();

    let mut rows_iter = stmt.query(param_refs.as_slice())?;

    let (column_count, columns) = if let Some(stmt_ref) = rows_iter.as_ref() {
        let count = stmt_ref.column_count();
        let cols: Vec<String> = (0..count)
            .map(|i| {
                stmt_ref
                    .column_name(i)
                    .map(|s| s.to_string())
                    .unwrap_or_else(|_| format!("col{}", i))
            })
            .collect();
        (count, cols)
    } else {
        return Ok(Vec::new());
    };

    let mut result = Vec::new();
    while let Some(row) = rows_iter.next()? {
        let mut values = Vec::with_capacity(column_count);
        for i in 0..column_count {
            values.push(duckdb_value_to_db_value(row, i)?);
        }
        result.push(DbRow::new(columns.clone(), values));
    }

    span.record("rows", result.len() as u64);
    span.record("duration_ms", start.elapsed().as_millis() as u64);
    Ok(result)
}

fn to_duckdb_params(params: &[DbValue]) -> Vec<duckdb::types::Value> {
    params
        .iter()
        .map(|p| match p {
            DbValue::Null => duckdb::types::Value::Null,
            DbValue::Integer(v) => duckdb::types::Value::BigInt(*v),
            DbValue::Real(v) => duckdb::types::Value::Double(*v),
            DbValue::Text(v) => duckdb::types::Value::Text(v.clone()),
            DbValue::Blob(v) => duckdb::types::Value::Blob(v.clone()),
            DbValue::Boolean(v) => duckdb::types::Value::Boolean(*v),
        })
        .collect()
}

fn duckdb_value_to_db_value(row: &duckdb::Row, index: usize) -> Result<DbValue, duckdb::Error> {
    use duckdb::types::ValueRef;

    match row.get_ref(index)? {
        ValueRef::Null => Ok(DbValue::Null),
        ValueRef::Boolean(v) => Ok(DbValue::Boolean(v)),
        ValueRef::TinyInt(v) => Ok(DbValue::Integer(v as i64)),
        ValueRef::SmallInt(v) => Ok(DbValue::Integer(v as i64)),
        ValueRef::Int(v) => Ok(DbValue::Integer(v as i64)),
        ValueRef::BigInt(v) => Ok(DbValue::Integer(v)),
        ValueRef::HugeInt(v) => Ok(DbValue::Integer(v as i64)),
        ValueRef::UTinyInt(v) => Ok(DbValue::Integer(v as i64)),
        ValueRef::USmallInt(v) => Ok(DbValue::Integer(v as i64)),
        ValueRef::UInt(v) => Ok(DbValue::Integer(v as i64)),
        ValueRef::UBigInt(v) => Ok(DbValue::Integer(v as i64)),
        ValueRef::Float(v) => Ok(DbValue::Real(v as f64)),
        ValueRef::Double(v) => Ok(DbValue::Real(v)),
        ValueRef::Text(v) => Ok(DbValue::Text(String::from_utf8_lossy(v).to_string())),
        ValueRef::Blob(v) => Ok(DbValue::Blob(v.to_vec())),
        other => {
            warn!(
                "DuckDB type {:?} at column {} mapped to debug string",
                std::mem::discriminant(&other),
                index
            );
            Ok(DbValue::Text(format!("{:?}", other)))
        }
    }
}

fn lock_error(err: LockError) -> BackendError {
    match err {
        LockError::Locked(p) => BackendError::Locked(p.display().to_string()),
        LockError::CreateFailed(io) => BackendError::Database(format!("Lock file error: {}", io)),
        LockError::AcquireFailed(io) => {
            BackendError::Database(format!("Lock acquire error: {}", io))
        }
    }
}

fn strip_url_prefix(url: &str, prefix: &str) -> Option<String> {
    url.strip_prefix(prefix).map(|rest| rest.to_string())
}

fn sql_op_name(sql: &str) -> &str {
    sql.split_whitespace().next().unwrap_or("unknown")
}

fn hash_sql(sql: &str) -> String {
    // FNV-1a 64-bit hash for low-cardinality, stable identification.
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in sql.as_bytes() {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    format!("{:016x}", hash)
}
