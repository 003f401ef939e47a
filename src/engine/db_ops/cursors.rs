//! scan_cursors table.

use anyhow::{Context, Result};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ValueRef};
use rusqlite::{OptionalExtension, Row, params};

use crate::engine::store::CursorStore;
use crate::types::{Phase, ScanCursor};

use super::SqliteStore;

impl FromSql for Phase {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: anyhow::Error| FromSqlError::Other(e.into()))
    }
}

const SELECT_CURSOR: &str = "SELECT root, phase, directory_count, phase_index FROM scan_cursors";

fn row_to_cursor(row: &Row<'_>) -> rusqlite::Result<ScanCursor> {
    Ok(ScanCursor {
        root: row.get(0)?,
        phase: row.get(1)?,
        directory_count: row.get(2)?,
        phase_index: row.get(3)?,
    })
}

impl SqliteStore {
    fn query_cursors(&self, sql: &str, params: impl rusqlite::Params) -> Result<Vec<ScanCursor>> {
        let mut stmt = self.conn.prepare(sql).context("prepare cursor select")?;
        let rows = stmt.query_map(params, row_to_cursor)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}

impl CursorStore for SqliteStore {
    fn get_cursor(&self, root: &str, phase: Phase) -> Result<Option<ScanCursor>> {
        self.conn
            .query_row(
                &format!("{SELECT_CURSOR} WHERE root = ?1 AND phase = ?2"),
                params![root, phase.as_str()],
                row_to_cursor,
            )
            .optional()
            .context("select cursor")
    }

    fn update_directory_count(&self, root: &str, phase: Phase, count: i64) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO scan_cursors (root, phase, directory_count, phase_index) VALUES (?1, ?2, ?3, 0)
                 ON CONFLICT(root, phase) DO UPDATE SET directory_count = excluded.directory_count",
                params![root, phase.as_str(), count],
            )
            .context("update directory count")?;
        Ok(())
    }

    fn set_phase_index(&self, root: &str, phase: Phase, index: i64) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO scan_cursors (root, phase, directory_count, phase_index) VALUES (?1, ?2, 0, ?3)
                 ON CONFLICT(root, phase) DO UPDATE SET phase_index = excluded.phase_index",
                params![root, phase.as_str(), index],
            )
            .context("set phase index")?;
        Ok(())
    }

    fn advance_phase_index(
        &self,
        root: &str,
        phase: Phase,
        expected: i64,
        index: i64,
    ) -> Result<bool> {
        let n = self
            .conn
            .execute(
                "UPDATE scan_cursors SET phase_index = ?4
                 WHERE root = ?1 AND phase = ?2 AND phase_index = ?3",
                params![root, phase.as_str(), expected, index],
            )
            .context("advance phase index")?;
        if n > 0 {
            return Ok(true);
        }
        if expected != 0 {
            return Ok(false);
        }
        let n = self
            .conn
            .execute(
                "INSERT OR IGNORE INTO scan_cursors (root, phase, directory_count, phase_index)
                 VALUES (?1, ?2, ?3, ?3)",
                params![root, phase.as_str(), index],
            )
            .context("insert advanced cursor")?;
        Ok(n > 0)
    }

    fn delete_cursor(&self, root: &str, phase: Phase) -> Result<()> {
        self.conn
            .execute(
                "DELETE FROM scan_cursors WHERE root = ?1 AND phase = ?2",
                params![root, phase.as_str()],
            )
            .context("delete cursor")?;
        Ok(())
    }

    fn delete_cursors(&self, root: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM scan_cursors WHERE root = ?1", [root])
            .context("delete cursors")?;
        Ok(())
    }

    fn incomplete_cursors(&self, phase: Phase) -> Result<Vec<ScanCursor>> {
        self.query_cursors(
            &format!(
                "{SELECT_CURSOR} WHERE phase = ?1 AND phase_index >= 0 AND phase_index < directory_count ORDER BY root"
            ),
            [phase.as_str()],
        )
    }

    fn all_cursors(&self) -> Result<Vec<ScanCursor>> {
        self.query_cursors(&format!("{SELECT_CURSOR} ORDER BY root, phase"), [])
    }
}
