//! SQLite-backed backlog store.
//!
//! `Store` owns one connection behind a mutex. Every mutation runs in a
//! single `IMMEDIATE` transaction while the mutex is held, so graph checks and
//! the writes they guard are never interleaved with another writer. Clones
//! share the connection and may be moved across threads.

pub mod blockers;
pub mod criteria;
pub mod migration;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::config::{AttributeRules, Config};
use crate::core::dag::{Dependency, DependencyGraph, RelationshipType};
use crate::core::scoring::{PriorityScorer, RecomputeReport, ScoreFailure};
use crate::core::similarity::{DuplicateDetector, Verdict};
use crate::core::task::{
    normalize_summary, ClosedReason, NewTask, Task, TaskId, TaskStatus, TaskUpdate,
};
use crate::snapshot::{sort_by_rank, BacklogSnapshot, BlockedTask};
use crate::{tlog, tlog_debug, tlog_warn, Error, Result};

pub use criteria::{Criterion, CriterionSource};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const TASK_COLUMNS: &str = "id, summary, description, status, priority, complexity, domain, \
     task_type, assignee, priority_score, closed_reason, created_at, updated_at";

/// Whether `create_task` screens the summary against the open backlog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// Insert unconditionally.
    Skip,
    /// Refuse with `DuplicateRejected` when an open task in the same domain
    /// is a match.
    Reject,
}

/// Restricts `list_tasks`. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub domain: Option<String>,
    pub assignee: Option<String>,
    /// Leave out Done tasks. Ignored when `status` is set.
    pub open_only: bool,
}

impl TaskFilter {
    pub fn open() -> Self {
        Self {
            open_only: true,
            ..Self::default()
        }
    }

    fn matches(&self, task: &Task) -> bool {
        let status_ok = match self.status {
            Some(status) => task.status == status,
            None => !self.open_only || task.is_open(),
        };
        status_ok
            && (self.domain.is_none() || task.domain == self.domain)
            && (self.assignee.is_none() || task.assignee == self.assignee)
    }
}

/// A task with its direct dependencies and dependents.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskDetail {
    pub task: Task,
    pub dependencies: Vec<Dependency>,
    pub dependents: Vec<Dependency>,
}

#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
    rules: AttributeRules,
    scorer: PriorityScorer,
    detector: DuplicateDetector,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").finish_non_exhaustive()
    }
}

impl Store {
    /// Open (creating if needed) the database at `path` and bring its schema
    /// up to date.
    pub fn open(path: &Path, config: &Config) -> Result<Self> {
        tlog_debug!("Store::open path={}", path.display());
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        tlog_debug!("journal_mode={}", mode);
        Self::from_connection(conn, config)
    }

    /// A private in-memory backlog, discarded on drop.
    pub fn open_in_memory(config: &Config) -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?, config)
    }

    fn from_connection(mut conn: Connection, config: &Config) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", true)?;
        migration::migrate_if_needed(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            rules: config.attributes.clone(),
            scorer: PriorityScorer::new(config.scoring.clone())?,
            detector: DuplicateDetector::new(config.duplicates)?,
        })
    }

    /// Close the connection, surfacing any error SQLite reports on close.
    ///
    /// If other clones are still alive the connection stays open and is
    /// closed when the last one drops.
    pub fn close(self) -> Result<()> {
        match Arc::try_unwrap(self.conn) {
            Ok(mutex) => {
                let conn = mutex.into_inner().unwrap_or_else(PoisonError::into_inner);
                conn.close().map_err(|(_, e)| Error::Database(e))
            }
            Err(_) => {
                tlog_debug!("Store::close: connection still shared, deferring close");
                Ok(())
            }
        }
    }

    /// A panic while holding the lock cannot leave a half-written
    /// transaction behind (it rolls back on drop), so a poisoned mutex is
    /// still safe to use.
    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` inside one write transaction, committing on `Ok`.
    fn write<T>(&self, f: impl FnOnce(&Transaction<'_>) -> Result<T>) -> Result<T> {
        let mut conn = self.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    /// Run `f` inside one read transaction.
    fn read<T>(&self, f: impl FnOnce(&Transaction<'_>) -> Result<T>) -> Result<T> {
        let mut conn = self.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Deferred)?;
        let value = f(&tx)?;
        tx.finish()?;
        Ok(value)
    }

    fn validate_attributes(
        &self,
        domain: Option<&str>,
        task_type: Option<&str>,
        assignee: Option<&str>,
    ) -> Result<()> {
        self.rules.validate_domain(domain)?;
        self.rules.validate_task_type(task_type)?;
        self.rules.validate_assignee(assignee)
    }

    // ── Tasks ───────────────────────────────────────────────────────────

    /// Insert a task and return its id. The score is computed on insert.
    pub fn create_task(&self, new: NewTask, policy: DuplicatePolicy) -> Result<TaskId> {
        let summary = normalize_summary(&new.summary)?;
        self.validate_attributes(
            new.domain.as_deref(),
            new.task_type.as_deref(),
            new.assignee.as_deref(),
        )?;
        let acceptance = new
            .criteria
            .iter()
            .map(|c| criteria::normalize_criterion(c))
            .collect::<Result<Vec<_>>>()?;
        let score = self.scorer.score(new.priority, new.complexity);

        let id = self.write(|tx| {
            if policy == DuplicatePolicy::Reject {
                let open = open_summaries(tx, new.domain.as_deref())?;
                let verdict = self
                    .detector
                    .classify(&summary, open.iter().map(|(id, s)| (*id, s.as_str())));
                if let Verdict::Match { task_id, score } = verdict {
                    tlog_warn!(
                        "create_task rejected {:?}: duplicate of {} ({:.2})",
                        summary,
                        task_id,
                        score
                    );
                    return Err(Error::DuplicateRejected {
                        existing: task_id,
                        score,
                    });
                }
            }
            let now = Utc::now();
            tx.execute(
                "INSERT INTO tasks (summary, description, status, priority, complexity, domain, \
                 task_type, assignee, priority_score, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
                params![
                    summary,
                    new.description,
                    TaskStatus::ToDo.as_str(),
                    new.priority.as_str(),
                    new.complexity.map(|c| c.as_str()),
                    new.domain,
                    new.task_type,
                    new.assignee,
                    score,
                    now,
                ],
            )?;
            let id = TaskId(tx.last_insert_rowid());
            for text in &acceptance {
                criteria::insert_criterion(tx, id, text, CriterionSource::Original)?;
            }
            Ok(id)
        })?;
        tlog_debug!(
            "Created task {} score={} criteria={} {:?}",
            id,
            score,
            acceptance.len(),
            summary
        );
        Ok(id)
    }

    pub fn get_task(&self, id: TaskId) -> Result<Task> {
        self.read(|tx| load_task(tx, id))
    }

    /// The task plus its direct edges in both directions.
    pub fn task_detail(&self, id: TaskId) -> Result<TaskDetail> {
        self.read(|tx| {
            let task = load_task(tx, id)?;
            Ok(TaskDetail {
                task,
                dependencies: load_edges(tx, "task_id", id)?,
                dependents: load_edges(tx, "depends_on_id", id)?,
            })
        })
    }

    /// Tasks matching `filter`, best score first.
    pub fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>> {
        let mut tasks: Vec<Task> = self
            .read(|tx| load_all_tasks(tx))?
            .into_iter()
            .filter(|t| filter.matches(t))
            .collect();
        sort_by_rank(&mut tasks, |t| t);
        Ok(tasks)
    }

    /// Edit attributes of an existing task and rescore it.
    pub fn update_task(&self, id: TaskId, update: TaskUpdate) -> Result<Task> {
        let summary = update.summary.as_deref().map(normalize_summary).transpose()?;
        let task = self.write(|tx| {
            let mut task = load_task(tx, id)?;
            if update.is_empty() {
                return Ok(task);
            }
            if let Some(summary) = summary {
                task.summary = summary;
            }
            if let Some(description) = update.description {
                task.description = description;
            }
            if let Some(priority) = update.priority {
                task.priority = priority;
            }
            if let Some(complexity) = update.complexity {
                task.complexity = complexity;
            }
            if let Some(domain) = update.domain {
                task.domain = domain;
            }
            if let Some(task_type) = update.task_type {
                task.task_type = task_type;
            }
            if let Some(assignee) = update.assignee {
                task.assignee = assignee;
            }
            self.validate_attributes(
                task.domain.as_deref(),
                task.task_type.as_deref(),
                task.assignee.as_deref(),
            )?;
            task.priority_score = self.scorer.score(task.priority, task.complexity);
            task.updated_at = Utc::now();
            tx.execute(
                "UPDATE tasks SET summary = ?2, description = ?3, priority = ?4, complexity = ?5, \
                 domain = ?6, task_type = ?7, assignee = ?8, priority_score = ?9, updated_at = ?10 \
                 WHERE id = ?1",
                params![
                    id.0,
                    task.summary,
                    task.description,
                    task.priority.as_str(),
                    task.complexity.map(|c| c.as_str()),
                    task.domain,
                    task.task_type,
                    task.assignee,
                    task.priority_score,
                    task.updated_at,
                ],
            )?;
            Ok(task)
        })?;
        tlog_debug!("Updated task {} score={}", id, task.priority_score);
        Ok(task)
    }

    /// Move a task to In Progress. Starting a task already in progress is a
    /// no-op.
    pub fn start_task(&self, id: TaskId) -> Result<Task> {
        self.transition(id, TaskStatus::InProgress, None)
    }

    /// Close a task with `reason`.
    pub fn close_task(&self, id: TaskId, reason: ClosedReason) -> Result<Task> {
        self.transition(id, TaskStatus::Done, Some(reason))
    }

    /// Explicit override taking a Done task back to To Do. The closed reason
    /// is cleared and the score recomputed.
    pub fn reopen_task(&self, id: TaskId) -> Result<Task> {
        self.transition(id, TaskStatus::ToDo, None)
    }

    fn transition(
        &self,
        id: TaskId,
        to: TaskStatus,
        reason: Option<ClosedReason>,
    ) -> Result<Task> {
        let task = self.write(|tx| {
            let mut task = load_task(tx, id)?;
            let allowed = matches!(
                (task.status, to),
                (TaskStatus::ToDo, TaskStatus::InProgress)
                    | (TaskStatus::InProgress, TaskStatus::InProgress)
                    | (TaskStatus::ToDo, TaskStatus::Done)
                    | (TaskStatus::InProgress, TaskStatus::Done)
                    | (TaskStatus::Done, TaskStatus::ToDo)
            );
            if !allowed {
                return Err(Error::InvalidTransition {
                    id,
                    from: task.status.to_string(),
                    to: to.to_string(),
                });
            }
            if task.status == to {
                return Ok(task);
            }
            if task.status == TaskStatus::Done {
                task.priority_score = self.scorer.score(task.priority, task.complexity);
            }
            task.status = to;
            task.closed_reason = reason;
            task.updated_at = Utc::now();
            tx.execute(
                "UPDATE tasks SET status = ?2, closed_reason = ?3, priority_score = ?4, \
                 updated_at = ?5 WHERE id = ?1",
                params![
                    id.0,
                    task.status.as_str(),
                    task.closed_reason.map(|r| r.as_str()),
                    task.priority_score,
                    task.updated_at,
                ],
            )?;
            Ok(task)
        });
        match &task {
            Ok(t) => tlog_debug!("Task {} -> {}", id, t.status),
            Err(e) => tlog_warn!("Task {} -> {} refused: {}", id, to, e),
        }
        task
    }

    // ── Dependencies ────────────────────────────────────────────────────

    /// `task` waits for `depends_on` with a `blocks` relationship.
    pub fn add_dependency(&self, task: TaskId, depends_on: TaskId) -> Result<bool> {
        self.add_dependency_with(task, depends_on, RelationshipType::Blocks)
    }

    /// Add an edge after checking it against the current graph.
    ///
    /// The graph is loaded, checked and written inside one transaction under
    /// the writer lock. Returns `false` if the identical edge already existed.
    pub fn add_dependency_with(
        &self,
        task: TaskId,
        depends_on: TaskId,
        rel: RelationshipType,
    ) -> Result<bool> {
        let result = self.write(|tx| {
            let mut graph = load_graph(tx)?;
            if !graph.add_dependency(task, depends_on, rel)? {
                return Ok(false);
            }
            tx.execute(
                "INSERT INTO task_dependencies (task_id, depends_on_id, relationship_type, created_at) \
                 VALUES (?1, ?2, ?3, ?4)",
                params![task.0, depends_on.0, rel.as_str(), Utc::now()],
            )?;
            Ok(true)
        });
        match &result {
            Ok(true) => tlog_debug!("Added dependency {} -> {} ({})", task, depends_on, rel),
            Ok(false) => tlog_debug!("Dependency {} -> {} already present", task, depends_on),
            Err(e) => tlog_warn!("Rejected dependency {} -> {}: {}", task, depends_on, e),
        }
        result
    }

    pub fn remove_dependency(&self, task: TaskId, depends_on: TaskId) -> Result<()> {
        let result = self.write(|tx| {
            let removed = tx.execute(
                "DELETE FROM task_dependencies WHERE task_id = ?1 AND depends_on_id = ?2",
                params![task.0, depends_on.0],
            )?;
            if removed == 0 {
                return Err(Error::EdgeNotFound { task, depends_on });
            }
            Ok(())
        });
        match &result {
            Ok(()) => tlog_debug!("Removed dependency {} -> {}", task, depends_on),
            Err(e) => tlog_warn!("Remove dependency {} -> {} failed: {}", task, depends_on, e),
        }
        result
    }

    /// Edges leaving `task` (what it waits for), by dependency id.
    pub fn dependencies(&self, task: TaskId) -> Result<Vec<Dependency>> {
        self.read(|tx| {
            require_task(tx, task)?;
            load_edges(tx, "task_id", task)
        })
    }

    /// Edges entering `task` (what waits for it), by dependent id.
    pub fn dependents(&self, task: TaskId) -> Result<Vec<Dependency>> {
        self.read(|tx| {
            require_task(tx, task)?;
            load_edges(tx, "depends_on_id", task)
        })
    }

    // ── Queries ─────────────────────────────────────────────────────────

    /// All tasks, edges and blockers, read in one transaction.
    pub fn snapshot(&self) -> Result<BacklogSnapshot> {
        self.read(|tx| {
            let tasks = load_all_tasks(tx)?;
            let graph = load_graph(tx)?;
            let blockers = blockers::load_all_blockers(tx)?;
            Ok(BacklogSnapshot::new(tasks, graph).with_blockers(blockers))
        })
    }

    pub fn graph(&self) -> Result<DependencyGraph> {
        self.read(|tx| load_graph(tx))
    }

    pub fn is_ready(&self, task: TaskId) -> Result<bool> {
        self.snapshot()?.is_ready(task)
    }

    pub fn ready(&self) -> Result<Vec<Task>> {
        Ok(self.snapshot()?.ready())
    }

    pub fn blocked(&self) -> Result<Vec<BlockedTask>> {
        Ok(self.snapshot()?.blocked())
    }

    pub fn downstream_scope(&self, task: TaskId) -> Result<BTreeSet<TaskId>> {
        self.snapshot()?.downstream_scope(task)
    }

    pub fn is_chain_head(&self, task: TaskId) -> Result<bool> {
        let graph = self.read(|tx| {
            require_task(tx, task)?;
            load_graph(tx)
        })?;
        Ok(graph.is_chain_head(task))
    }

    // ── Scoring ─────────────────────────────────────────────────────────

    /// Rescore every open task in one transaction.
    ///
    /// A task whose stored attributes cannot be parsed keeps its old score
    /// and is reported in `failures`; the rest of the batch still commits.
    pub fn recompute_scores(&self) -> Result<RecomputeReport> {
        let report = self.write(|tx| {
            let rows: Vec<(i64, String, Option<String>)> = {
                let mut stmt = tx.prepare(
                    "SELECT id, priority, complexity FROM tasks WHERE status <> 'Done' ORDER BY id",
                )?;
                let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?;
                rows.collect::<rusqlite::Result<_>>()?
            };
            let now = Utc::now();
            let mut report = RecomputeReport::default();
            let mut stmt = tx.prepare(
                "UPDATE tasks SET priority_score = ?2, updated_at = ?3 \
                 WHERE id = ?1 AND priority_score <> ?2",
            )?;
            for (id, priority, complexity) in rows {
                match self.scorer.score_raw(&priority, complexity.as_deref()) {
                    Ok(score) => {
                        stmt.execute(params![id, score, now])?;
                        report.updated += 1;
                    }
                    Err(e) => {
                        tlog_warn!("Cannot score task {}: {}", id, e);
                        report.failures.push(ScoreFailure {
                            task_id: TaskId(id),
                            reason: e.to_string(),
                        });
                    }
                }
            }
            Ok(report)
        })?;
        tlog!(
            "Recomputed scores: {} updated, {} failed",
            report.updated,
            report.failures.len()
        );
        Ok(report)
    }

    /// Rescore a single task from its stored attributes.
    pub fn recompute_one(&self, id: TaskId) -> Result<i64> {
        self.write(|tx| {
            let (priority, complexity): (String, Option<String>) = tx
                .query_row(
                    "SELECT priority, complexity FROM tasks WHERE id = ?1",
                    [id.0],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?
                .ok_or(Error::TaskNotFound(id))?;
            let score = self.scorer.score_raw(&priority, complexity.as_deref())?;
            tx.execute(
                "UPDATE tasks SET priority_score = ?2, updated_at = ?3 \
                 WHERE id = ?1 AND priority_score <> ?2",
                params![id.0, score, Utc::now()],
            )?;
            Ok(score)
        })
    }

    // ── Duplicates ──────────────────────────────────────────────────────

    /// Screen `summary` against open tasks, optionally in one domain.
    ///
    /// Scoring runs on a snapshot, after the lock is released.
    pub fn check_duplicate(&self, summary: &str, domain: Option<&str>) -> Result<Verdict> {
        let snapshot = self.snapshot()?;
        let open = snapshot.open_summaries(domain);
        let verdict = self.detector.classify(summary, open.iter().copied());
        tlog_debug!(
            "check_duplicate {:?} against {} open tasks: {}",
            summary,
            open.len(),
            verdict
        );
        Ok(verdict)
    }
}

// ── Row access ──────────────────────────────────────────────────────────

/// A task row with enum columns still as text.
struct TaskRow {
    id: i64,
    summary: String,
    description: Option<String>,
    status: String,
    priority: String,
    complexity: Option<String>,
    domain: Option<String>,
    task_type: Option<String>,
    assignee: Option<String>,
    priority_score: i64,
    closed_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TaskRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            summary: row.get(1)?,
            description: row.get(2)?,
            status: row.get(3)?,
            priority: row.get(4)?,
            complexity: row.get(5)?,
            domain: row.get(6)?,
            task_type: row.get(7)?,
            assignee: row.get(8)?,
            priority_score: row.get(9)?,
            closed_reason: row.get(10)?,
            created_at: row.get(11)?,
            updated_at: row.get(12)?,
        })
    }

    fn into_task(self) -> Result<Task> {
        Ok(Task {
            id: TaskId(self.id),
            summary: self.summary,
            description: self.description,
            status: self.status.parse()?,
            priority: self.priority.parse()?,
            complexity: match self.complexity.as_deref().map(str::trim) {
                None | Some("") => None,
                Some(c) => Some(c.parse()?),
            },
            domain: self.domain,
            task_type: self.task_type,
            assignee: self.assignee,
            priority_score: self.priority_score,
            closed_reason: self.closed_reason.as_deref().map(str::parse).transpose()?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn load_task(conn: &Connection, id: TaskId) -> Result<Task> {
    conn.query_row(
        &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"),
        [id.0],
        TaskRow::from_row,
    )
    .optional()?
    .ok_or(Error::TaskNotFound(id))?
    .into_task()
}

fn load_all_tasks(conn: &Connection) -> Result<Vec<Task>> {
    let mut stmt = conn.prepare(&format!("SELECT {TASK_COLUMNS} FROM tasks ORDER BY id"))?;
    let rows = stmt.query_map([], TaskRow::from_row)?;
    rows.map(|row| row?.into_task()).collect()
}

fn require_task(conn: &Connection, id: TaskId) -> Result<()> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM tasks WHERE id = ?1)",
        [id.0],
        |row| row.get(0),
    )?;
    if exists {
        Ok(())
    } else {
        Err(Error::UnknownTask(id))
    }
}

fn load_graph(conn: &Connection) -> Result<DependencyGraph> {
    let ids: Vec<TaskId> = {
        let mut stmt = conn.prepare("SELECT id FROM tasks")?;
        let rows = stmt.query_map([], |row| row.get(0).map(TaskId))?;
        rows.collect::<rusqlite::Result<_>>()?
    };
    let edges = load_all_edges(conn)?;
    Ok(DependencyGraph::from_parts(
        ids,
        edges
            .into_iter()
            .map(|d| (d.task_id, d.depends_on_id, d.relationship_type)),
    ))
}

fn dependency_from_row(row: &Row<'_>) -> rusqlite::Result<(i64, i64, String, DateTime<Utc>)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn into_dependency(raw: (i64, i64, String, DateTime<Utc>)) -> Result<Dependency> {
    let (task_id, depends_on_id, rel, created_at) = raw;
    Ok(Dependency {
        task_id: TaskId(task_id),
        depends_on_id: TaskId(depends_on_id),
        relationship_type: rel.parse()?,
        created_at,
    })
}

fn load_all_edges(conn: &Connection) -> Result<Vec<Dependency>> {
    let mut stmt = conn.prepare(
        "SELECT task_id, depends_on_id, relationship_type, created_at FROM task_dependencies \
         ORDER BY task_id, depends_on_id",
    )?;
    let rows = stmt.query_map([], dependency_from_row)?;
    rows.map(|row| into_dependency(row?)).collect()
}

/// Edges where `column` (either end) equals `id`.
fn load_edges(conn: &Connection, column: &str, id: TaskId) -> Result<Vec<Dependency>> {
    let order = if column == "task_id" {
        "depends_on_id"
    } else {
        "task_id"
    };
    let mut stmt = conn.prepare(&format!(
        "SELECT task_id, depends_on_id, relationship_type, created_at FROM task_dependencies \
         WHERE {column} = ?1 ORDER BY {order}"
    ))?;
    let rows = stmt.query_map([id.0], dependency_from_row)?;
    rows.map(|row| into_dependency(row?)).collect()
}

fn open_summaries(conn: &Connection, domain: Option<&str>) -> Result<Vec<(TaskId, String)>> {
    let mut stmt = conn.prepare(
        "SELECT id, summary FROM tasks WHERE status <> 'Done' \
         AND (?1 IS NULL OR domain = ?1) ORDER BY id",
    )?;
    let rows = stmt.query_map([domain], |row| Ok((TaskId(row.get(0)?), row.get(1)?)))?;
    Ok(rows.collect::<rusqlite::Result<_>>()?)
}
