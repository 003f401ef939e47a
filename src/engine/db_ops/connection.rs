//! Open the state database and wrap it as the scanner's store.

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;

use crate::engine::store::ScanStore;

use super::{SCHEMA, WAL_PRAGMAS};

/// Enable WAL and apply schema to an open connection (idempotent).
fn apply_wal_and_schema(conn: &Connection) -> Result<()> {
    conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))
        .context("enable WAL")?;
    conn.execute_batch(WAL_PRAGMAS).context("set WAL pragmas")?;
    conn.execute_batch(SCHEMA).context("create schema")?;
    Ok(())
}

/// Open or create the state DB and ensure schema + WAL with optimizations.
pub fn open_db(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)
        .with_context(|| format!("open database {}", path.display()))?;
    // Another cron invocation may hold the write lock for the length of one statement.
    conn.busy_timeout(std::time::Duration::from_secs(5))
        .context("set busy timeout")?;
    apply_wal_and_schema(&conn)?;
    Ok(conn)
}

/// Open an in-memory DB with the same schema (tests and dry runs; no WAL pragmas needed).
pub fn open_db_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory().context("open in-memory database")?;
    conn.execute_batch(SCHEMA).context("create schema")?;
    Ok(conn)
}

/// SQLite-backed implementation of every store trait.
pub struct SqliteStore {
    pub(super) conn: Connection,
}

impl SqliteStore {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self::new(open_db(path)?))
    }

    pub fn in_memory() -> Result<Self> {
        Ok(Self::new(open_db_in_memory()?))
    }
}

impl ScanStore for SqliteStore {
    fn purge(&self) -> Result<()> {
        self.conn
            .execute_batch(
                r#"
                DELETE FROM file_hashes;
                DELETE FROM scan_cursors;
                DELETE FROM flags;
                DELETE FROM scheduled_tasks;
                "#,
            )
            .context("purge scanner state")?;
        Ok(())
    }
}
