//! flags and exclusions tables.

use anyhow::{Context, Result};
use rusqlite::{OptionalExtension, params};

use crate::engine::store::{ExclusionStore, FlagStore};

use super::SqliteStore;

impl FlagStore for SqliteStore {
    fn try_acquire_flag(&self, name: &str, expires_at: i64, now: i64) -> Result<bool> {
        // Single statement: insert, or take over an expired row. A live row is left alone.
        let n = self
            .conn
            .execute(
                "INSERT INTO flags (name, expires_at) VALUES (?1, ?2)
                 ON CONFLICT(name) DO UPDATE SET expires_at = excluded.expires_at
                 WHERE flags.expires_at IS NOT NULL AND flags.expires_at <= ?3",
                params![name, expires_at, now],
            )
            .context("acquire flag")?;
        Ok(n > 0)
    }

    fn set_flag(&self, name: &str, expires_at: Option<i64>) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO flags (name, expires_at) VALUES (?1, ?2)
                 ON CONFLICT(name) DO UPDATE SET expires_at = excluded.expires_at",
                params![name, expires_at],
            )
            .context("set flag")?;
        Ok(())
    }

    fn flag_is_set(&self, name: &str, now: i64) -> Result<bool> {
        let row: Option<Option<i64>> = self
            .conn
            .query_row("SELECT expires_at FROM flags WHERE name = ?1", [name], |r| {
                r.get(0)
            })
            .optional()
            .context("read flag")?;
        Ok(match row {
            None => false,
            Some(None) => true,
            Some(Some(expires_at)) => expires_at > now,
        })
    }

    fn clear_flag(&self, name: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM flags WHERE name = ?1", [name])
            .context("clear flag")?;
        Ok(())
    }
}

impl ExclusionStore for SqliteStore {
    fn stored_exclusions(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT pattern FROM exclusions ORDER BY id")
            .context("prepare exclusion select")?;
        let rows = stmt.query_map([], |r| r.get::<_, String>(0))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    fn append_exclusions(&self, patterns: &[String]) -> Result<usize> {
        let mut stmt = self
            .conn
            .prepare_cached("INSERT OR IGNORE INTO exclusions (pattern) VALUES (?1)")
            .context("prepare exclusion insert")?;
        let mut added = 0;
        for p in patterns {
            added += stmt.execute([p]).context("insert exclusion")?;
        }
        Ok(added)
    }
}
