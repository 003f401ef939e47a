//! file_hashes table.

use anyhow::{Context, Result};
use rusqlite::{OptionalExtension, Row, params};

use crate::engine::store::HashStore;
use crate::types::FileRecord;

use super::{SqliteStore, UPSERT_RECORD_SQL, dir_prefix};

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<FileRecord> {
    Ok(FileRecord {
        id: row.get(0)?,
        path: row.get(1)?,
        hash: row.get(2)?,
        drift_marker: row.get(3)?,
    })
}

impl HashStore for SqliteStore {
    fn get_record(&self, path: &str) -> Result<Option<FileRecord>> {
        self.conn
            .query_row(
                "SELECT id, path, hash, changed FROM file_hashes WHERE path = ?1",
                [path],
                row_to_record,
            )
            .optional()
            .context("select file record")
    }

    fn records_by_id(&self, ids: &[i64]) -> Result<Vec<FileRecord>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT id, path, hash, changed FROM file_hashes WHERE id = ?1")
            .context("prepare select by id")?;
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(rec) = stmt
                .query_row([id], row_to_record)
                .optional()
                .context("select file record by id")?
            {
                out.push(rec);
            }
        }
        Ok(out)
    }

    fn upsert_record(&self, path: &str, hash: &str, drift_marker: i64) -> Result<()> {
        self.conn
            .prepare_cached(UPSERT_RECORD_SQL)
            .context("prepare upsert")?
            .execute(params![path, hash, drift_marker])
            .context("upsert file record")?;
        Ok(())
    }

    fn set_drift_marker(&self, path: &str, drift_marker: i64) -> Result<bool> {
        let n = self
            .conn
            .execute(
                "UPDATE file_hashes SET changed = ?2 WHERE path = ?1",
                params![path, drift_marker],
            )
            .context("set drift marker")?;
        Ok(n > 0)
    }

    fn drifted_records(&self) -> Result<Vec<FileRecord>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, path, hash, changed FROM file_hashes WHERE changed <> 0 ORDER BY path",
            )
            .context("prepare drifted select")?;
        let rows = stmt.query_map([], row_to_record)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    fn delete_record(&self, path: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM file_hashes WHERE path = ?1", [path])
            .context("delete file record")?;
        Ok(())
    }

    fn delete_records_by_id(&self, ids: &[i64]) -> Result<usize> {
        let mut stmt = self
            .conn
            .prepare_cached("DELETE FROM file_hashes WHERE id = ?1")
            .context("prepare delete by id")?;
        let mut n = 0;
        for id in ids {
            n += stmt.execute([id]).context("delete file record by id")?;
        }
        Ok(n)
    }

    fn delete_records_under(&self, root: &str) -> Result<usize> {
        self.conn
            .execute(
                "DELETE FROM file_hashes WHERE path = ?1 OR substr(path, 1, length(?2)) = ?2",
                params![root, dir_prefix(root)],
            )
            .context("delete records under root")
    }

    fn clear_drift_markers(&self) -> Result<usize> {
        self.conn
            .execute("UPDATE file_hashes SET changed = 0 WHERE changed <> 0", [])
            .context("clear drift markers")
    }

    fn record_count(&self) -> Result<usize> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM file_hashes", [], |r| r.get(0))
            .context("count file records")?;
        Ok(n.max(0) as usize)
    }
}
