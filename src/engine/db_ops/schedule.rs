//! scheduled_tasks table: the persisted "run this phase again in N seconds".

use anyhow::{Context, Result};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ValueRef};
use rusqlite::{OptionalExtension, params};

use crate::engine::store::Scheduler;
use crate::types::{ScheduledTask, TaskKind};

use super::SqliteStore;

impl FromSql for TaskKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: anyhow::Error| FromSqlError::Other(e.into()))
    }
}

fn row_to_task(row: &rusqlite::Row<'_>) -> rusqlite::Result<ScheduledTask> {
    Ok(ScheduledTask {
        kind: row.get(0)?,
        root: row.get(1)?,
        due_at: row.get(2)?,
    })
}

impl Scheduler for SqliteStore {
    fn schedule(&self, kind: TaskKind, root: &str, due_at: i64) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO scheduled_tasks (kind, root, due_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(kind, root) DO UPDATE SET due_at = excluded.due_at",
                params![kind.as_str(), root, due_at],
            )
            .context("schedule task")?;
        Ok(())
    }

    fn is_scheduled(&self, kind: TaskKind, root: &str) -> Result<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM scheduled_tasks WHERE kind = ?1 AND root = ?2",
                params![kind.as_str(), root],
                |r| r.get(0),
            )
            .optional()
            .context("check scheduled task")?;
        Ok(found.is_some())
    }

    fn cancel(&self, kind: TaskKind, root: &str) -> Result<()> {
        self.conn
            .execute(
                "DELETE FROM scheduled_tasks WHERE kind = ?1 AND root = ?2",
                params![kind.as_str(), root],
            )
            .context("cancel task")?;
        Ok(())
    }

    fn cancel_root(&self, root: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM scheduled_tasks WHERE root = ?1", [root])
            .context("cancel tasks for root")?;
        Ok(())
    }

    fn pending_tasks(&self, root: Option<&str>) -> Result<Vec<ScheduledTask>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT kind, root, due_at FROM scheduled_tasks
                 WHERE ?1 IS NULL OR root = ?1 ORDER BY due_at, root, kind",
            )
            .context("prepare pending tasks")?;
        let rows = stmt.query_map([root], row_to_task)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    fn take_due(&self, now: i64) -> Result<Vec<ScheduledTask>> {
        let tx = self
            .conn
            .unchecked_transaction()
            .context("begin take_due transaction")?;
        let due = {
            let mut stmt = tx
                .prepare(
                    "SELECT kind, root, due_at FROM scheduled_tasks WHERE due_at <= ?1
                     ORDER BY due_at, root, kind",
                )
                .context("prepare due tasks")?;
            let rows = stmt.query_map([now], row_to_task)?;
            let mut out = Vec::new();
            for row in rows {
                out.push(row?);
            }
            out
        };
        tx.execute("DELETE FROM scheduled_tasks WHERE due_at <= ?1", [now])
            .context("remove due tasks")?;
        tx.commit().context("commit take_due")?;
        Ok(due)
    }
}
