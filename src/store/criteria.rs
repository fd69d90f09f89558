//! Acceptance criteria attached to tasks.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::Store;
use crate::core::task::TaskId;
use crate::{tlog_debug, Error, Result};

/// Where a criterion came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CriterionSource {
    /// Written with the task.
    #[default]
    Original,
    /// Inherited from a task this one absorbed.
    Subsumption,
    /// Raised during review.
    PrReview,
}

impl CriterionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CriterionSource::Original => "original",
            CriterionSource::Subsumption => "subsumption",
            CriterionSource::PrReview => "pr_review",
        }
    }
}

impl std::fmt::Display for CriterionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CriterionSource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "original" => Ok(CriterionSource::Original),
            "subsumption" => Ok(CriterionSource::Subsumption),
            "pr_review" => Ok(CriterionSource::PrReview),
            other => Err(Error::invalid("source", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Criterion {
    pub id: i64,
    pub task_id: TaskId,
    pub criterion: String,
    pub source: CriterionSource,
    pub is_completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const CRITERION_COLUMNS: &str =
    "id, task_id, criterion, source, is_completed, created_at, updated_at";

fn load_criterion(conn: &Connection, id: i64) -> Result<Criterion> {
    let raw = conn
        .query_row(
            &format!("SELECT {CRITERION_COLUMNS} FROM acceptance_criteria WHERE id = ?1"),
            [id],
            raw_from_row,
        )
        .optional()?
        .ok_or(Error::CriterionNotFound(id))?;
    into_criterion(raw)
}

type RawCriterion = (i64, i64, String, String, bool, DateTime<Utc>, DateTime<Utc>);

fn raw_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawCriterion> {
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

fn into_criterion(raw: RawCriterion) -> Result<Criterion> {
    let (id, task_id, criterion, source, is_completed, created_at, updated_at) = raw;
    Ok(Criterion {
        id,
        task_id: TaskId(task_id),
        criterion,
        source: source.parse()?,
        is_completed,
        created_at,
        updated_at,
    })
}

/// Trimmed criterion text, rejecting blank input.
pub(super) fn normalize_criterion(text: &str) -> Result<&str> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(Error::invalid("criterion", text));
    }
    Ok(trimmed)
}

pub(super) fn insert_criterion(
    conn: &Connection,
    task: TaskId,
    text: &str,
    source: CriterionSource,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO acceptance_criteria (task_id, criterion, source, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?4)",
        params![task.0, text, source.as_str(), Utc::now()],
    )?;
    Ok(conn.last_insert_rowid())
}

impl Store {
    /// Attach a criterion to a task and return its id.
    pub fn add_criterion(
        &self,
        task: TaskId,
        text: &str,
        source: CriterionSource,
    ) -> Result<i64> {
        let text = normalize_criterion(text)?;
        let id = self.write(|tx| {
            super::load_task(tx, task)?;
            insert_criterion(tx, task, text, source)
        })?;
        tlog_debug!("Added criterion {} to task {} ({})", id, task, source);
        Ok(id)
    }

    /// Criteria of `task` in the order they were added.
    pub fn criteria(&self, task: TaskId) -> Result<Vec<Criterion>> {
        self.read(|tx| {
            super::load_task(tx, task)?;
            let mut stmt = tx.prepare(&format!(
                "SELECT {CRITERION_COLUMNS} FROM acceptance_criteria WHERE task_id = ?1 ORDER BY id"
            ))?;
            let rows = stmt.query_map([task.0], raw_from_row)?;
            rows.map(|row| into_criterion(row?)).collect()
        })
    }

    /// `(completed, total)` for `task`.
    pub fn criteria_progress(&self, task: TaskId) -> Result<(usize, usize)> {
        let criteria = self.criteria(task)?;
        let done = criteria.iter().filter(|c| c.is_completed).count();
        Ok((done, criteria.len()))
    }

    /// Mark a criterion done. Returns `false` if it already was.
    pub fn complete_criterion(&self, id: i64) -> Result<bool> {
        self.set_criterion_completed(id, true)
    }

    /// Mark a criterion not done. Returns `false` if it already was.
    pub fn reset_criterion(&self, id: i64) -> Result<bool> {
        self.set_criterion_completed(id, false)
    }

    pub fn get_criterion(&self, id: i64) -> Result<Criterion> {
        self.read(|tx| load_criterion(tx, id))
    }

    fn set_criterion_completed(&self, id: i64, completed: bool) -> Result<bool> {
        let changed = self.write(|tx| {
            let current = load_criterion(tx, id)?;
            if current.is_completed == completed {
                return Ok(false);
            }
            tx.execute(
                "UPDATE acceptance_criteria SET is_completed = ?2, updated_at = ?3 WHERE id = ?1",
                params![id, completed, Utc::now()],
            )?;
            Ok(true)
        })?;
        tlog_debug!(
            "Criterion {} completed={} changed={}",
            id,
            completed,
            changed
        );
        Ok(changed)
    }
}
