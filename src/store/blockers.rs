//! External blockers attached to tasks.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::Store;
use crate::core::blocker::{BlockerType, ExternalBlocker};
use crate::core::task::TaskId;
use crate::{tlog_debug, Error, Result};

const BLOCKER_COLUMNS: &str =
    "id, task_id, description, blocker_type, is_resolved, created_at, updated_at";

type RawBlocker = (i64, i64, String, String, bool, DateTime<Utc>, DateTime<Utc>);

fn raw_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawBlocker> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn into_blocker(raw: RawBlocker) -> Result<ExternalBlocker> {
    let (id, task_id, description, blocker_type, is_resolved, created_at, updated_at) = raw;
    Ok(ExternalBlocker {
        id,
        task_id: TaskId(task_id),
        description,
        blocker_type: blocker_type.parse()?,
        is_resolved,
        created_at,
        updated_at,
    })
}

fn load_blocker(conn: &Connection, id: i64) -> Result<ExternalBlocker> {
    let raw = conn
        .query_row(
            &format!("SELECT {BLOCKER_COLUMNS} FROM external_blockers WHERE id = ?1"),
            [id],
            raw_from_row,
        )
        .optional()?
        .ok_or(Error::BlockerNotFound(id))?;
    into_blocker(raw)
}

/// Every blocker in the backlog, by id.
pub(super) fn load_all_blockers(conn: &Connection) -> Result<Vec<ExternalBlocker>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BLOCKER_COLUMNS} FROM external_blockers ORDER BY id"
    ))?;
    let rows = stmt.query_map([], raw_from_row)?;
    rows.map(|row| into_blocker(row?)).collect()
}

impl Store {
    /// Record something outside the backlog that `task` is waiting on.
    pub fn add_blocker(
        &self,
        task: TaskId,
        description: &str,
        blocker_type: BlockerType,
    ) -> Result<i64> {
        let description = description.trim();
        if description.is_empty() {
            return Err(Error::invalid("description", description));
        }
        let id = self.write(|tx| {
            super::load_task(tx, task)?;
            tx.execute(
                "INSERT INTO external_blockers (task_id, description, blocker_type, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?4)",
                params![task.0, description, blocker_type.as_str(), Utc::now()],
            )?;
            Ok(tx.last_insert_rowid())
        })?;
        tlog_debug!("Added {} blocker {} to task {}", blocker_type, id, task);
        Ok(id)
    }

    /// Blockers of `task`, resolved ones included, in the order they were added.
    pub fn blockers(&self, task: TaskId) -> Result<Vec<ExternalBlocker>> {
        self.read(|tx| {
            super::load_task(tx, task)?;
            let mut stmt = tx.prepare(&format!(
                "SELECT {BLOCKER_COLUMNS} FROM external_blockers WHERE task_id = ?1 ORDER BY id"
            ))?;
            let rows = stmt.query_map([task.0], raw_from_row)?;
            rows.map(|row| into_blocker(row?)).collect()
        })
    }

    pub fn get_blocker(&self, id: i64) -> Result<ExternalBlocker> {
        self.read(|tx| load_blocker(tx, id))
    }

    /// Mark a blocker resolved. Returns `false` if it already was.
    pub fn resolve_blocker(&self, id: i64) -> Result<bool> {
        self.set_blocker_resolved(id, true)
    }

    /// Put a resolved blocker back in force. Returns `false` if it was open.
    pub fn unresolve_blocker(&self, id: i64) -> Result<bool> {
        self.set_blocker_resolved(id, false)
    }

    fn set_blocker_resolved(&self, id: i64, resolved: bool) -> Result<bool> {
        let changed = self.write(|tx| {
            let current = load_blocker(tx, id)?;
            if current.is_resolved == resolved {
                return Ok(false);
            }
            tx.execute(
                "UPDATE external_blockers SET is_resolved = ?2, updated_at = ?3 WHERE id = ?1",
                params![id, resolved, Utc::now()],
            )?;
            Ok(true)
        })?;
        tlog_debug!("Blocker {} resolved={} changed={}", id, resolved, changed);
        Ok(changed)
    }
}
