//! Database operations: schema, open, and the SQLite implementation of the store traits.

mod connection;
mod cursors;
mod flags;
mod hashes;
mod schedule;

pub use connection::{SqliteStore, open_db, open_db_in_memory};

/// WAL tuning pragmas (synchronous, autocheckpoint, size limit). Use after PRAGMA journal_mode = WAL.
pub(crate) const WAL_PRAGMAS: &str = r#"
        PRAGMA synchronous = NORMAL;
        PRAGMA wal_autocheckpoint = 10000;
        PRAGMA journal_size_limit = 67108864;
        "#;

/// Schema for hash, cursor, flag, exclusion and schedule tables.
pub(crate) const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS file_hashes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    path TEXT NOT NULL UNIQUE,
    hash TEXT NOT NULL,
    changed INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_file_hashes_changed ON file_hashes(changed);

CREATE TABLE IF NOT EXISTS scan_cursors (
    root TEXT NOT NULL,
    phase TEXT NOT NULL,
    directory_count INTEGER NOT NULL DEFAULT 0,
    phase_index INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (root, phase)
);

CREATE TABLE IF NOT EXISTS flags (
    name TEXT PRIMARY KEY,
    expires_at INTEGER
);

CREATE TABLE IF NOT EXISTS exclusions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    pattern TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS scheduled_tasks (
    kind TEXT NOT NULL,
    root TEXT NOT NULL,
    due_at INTEGER NOT NULL,
    PRIMARY KEY (kind, root)
);
"#;

/// Upsert for file_hashes keyed by path.
pub(crate) const UPSERT_RECORD_SQL: &str = "INSERT INTO file_hashes (path, hash, changed) VALUES (?1, ?2, ?3)
     ON CONFLICT(path) DO UPDATE SET hash = excluded.hash, changed = excluded.changed";

/// `root` with exactly one trailing slash, for exact prefix matches with `substr`.
pub(crate) fn dir_prefix(root: &str) -> String {
    format!("{}/", root.trim_end_matches('/'))
}
