use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use tagvfs_db::{ensure_schema, DbConnection, DbValue};

#[test]
fn transaction_serializes_concurrent_statements() {
    let conn = DbConnection::open_duckdb_memory().unwrap();
    conn.execute_batch("CREATE TABLE t (marker TEXT)").unwrap();

    let (started_tx, started_rx) = mpsc::channel();
    let conn_tx = conn.clone();
    let tx_handle = thread::spawn(move || {
        conn_tx
            .transaction(move |tx| {
                tx.execute("INSERT INTO t (marker) VALUES (?)", &[DbValue::from("tx-1")])?;
                let _ = started_tx.send(());
                thread::sleep(Duration::from_millis(150));
                tx.execute("INSERT INTO t (marker) VALUES (?)", &[DbValue::from("tx-2")])?;
                Ok(())
            })
            .unwrap();
    });

    started_rx.recv().unwrap();
    let waited_from = Instant::now();
    conn.execute("INSERT INTO t (marker) VALUES (?)", &[DbValue::from("concurrent")])
        .unwrap();
    assert!(
        waited_from.elapsed() >= Duration::from_millis(50),
        "concurrent insert should wait for the transaction"
    );

    tx_handle.join().unwrap();
    let rows = conn.query_all("SELECT marker FROM t", &[]).unwrap();
    assert_eq!(rows.len(), 3);
}

#[test]
fn file_store_survives_reopen() {
    let tmp = tempfile::TempDir::new().unwrap();
    let path = tmp.path().join("tags.duckdb");
    let url = format!("duckdb:{}", path.display());

    {
        let conn = DbConnection::open_from_url(&url).unwrap();
        ensure_schema(&conn).unwrap();
        conn.insert_returning_id(
            "INSERT INTO tags (tagname) VALUES (?) RETURNING tag_id",
            &[DbValue::from("holiday")],
        )
        .unwrap();
    }

    let conn = DbConnection::open_from_url(&url).unwrap();
    ensure_schema(&conn).unwrap();
    let name: String = conn
        .query_scalar("SELECT tagname FROM tags WHERE tag_id = 1", &[])
        .unwrap();
    assert_eq!(name, "holiday");
}

#[test]
fn memory_store_reports_native_intersect() {
    let conn = DbConnection::open_from_url("duckdb::memory:").unwrap();
    assert!(conn.capabilities().native_intersect);
    assert_eq!(conn.backend_name(), "DuckDB");
}
