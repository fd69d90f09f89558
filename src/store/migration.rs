//! Schema migrations for the backlog database.
//!
//! The schema version lives in SQLite's `PRAGMA user_version`. Pending
//! migrations run in one `IMMEDIATE` transaction that starts by reading the
//! version, so when several connections open a fresh file at once exactly
//! one of them applies the schema and the rest find it current. Re-running
//! is a no-op.

use rusqlite::{Connection, TransactionBehavior};

use crate::{tlog, tlog_debug, Result};

/// Ordered migrations; entry `i` moves the schema from version `i` to `i + 1`.
const MIGRATIONS: &[&str] = &[
    // 1: tasks and dependency edges
    r#"
    CREATE TABLE tasks (
        id              INTEGER PRIMARY KEY AUTOINCREMENT,
        summary         TEXT NOT NULL CHECK (length(trim(summary)) > 0),
        description     TEXT,
        status          TEXT NOT NULL DEFAULT 'To Do'
                        CHECK (status IN ('To Do', 'In Progress', 'Done')),
        priority        TEXT NOT NULL DEFAULT 'Medium',
        domain          TEXT,
        assignee        TEXT,
        task_type       TEXT,
        complexity      TEXT,
        priority_score  INTEGER NOT NULL DEFAULT 0,
        closed_reason   TEXT
                        CHECK (closed_reason IS NULL
                               OR closed_reason IN ('completed', 'expired', 'wont_do', 'duplicate')),
        created_at      TEXT NOT NULL,
        updated_at      TEXT NOT NULL,
        CHECK ((status = 'Done') = (closed_reason IS NOT NULL))
    );
    CREATE INDEX idx_tasks_status ON tasks(status);

    CREATE TABLE task_dependencies (
        task_id            INTEGER NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
        depends_on_id      INTEGER NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
        relationship_type  TEXT NOT NULL DEFAULT 'blocks'
                           CHECK (relationship_type IN ('blocks', 'contingent')),
        created_at         TEXT NOT NULL,
        PRIMARY KEY (task_id, depends_on_id),
        CHECK (task_id <> depends_on_id)
    );
    CREATE INDEX idx_task_dependencies_depends_on ON task_dependencies(depends_on_id);
    "#,
    // 2: acceptance criteria
    r#"
    CREATE TABLE acceptance_criteria (
        id            INTEGER PRIMARY KEY AUTOINCREMENT,
        task_id       INTEGER NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
        criterion     TEXT NOT NULL CHECK (length(trim(criterion)) > 0),
        source        TEXT NOT NULL DEFAULT 'original'
                      CHECK (source IN ('original', 'subsumption', 'pr_review')),
        is_completed  INTEGER NOT NULL DEFAULT 0 CHECK (is_completed IN (0, 1)),
        created_at    TEXT NOT NULL,
        updated_at    TEXT NOT NULL
    );
    CREATE INDEX idx_acceptance_criteria_task ON acceptance_criteria(task_id);
    "#,
    // 3: external blockers
    r#"
    CREATE TABLE external_blockers (
        id            INTEGER PRIMARY KEY AUTOINCREMENT,
        task_id       INTEGER NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
        description   TEXT NOT NULL CHECK (length(trim(description)) > 0),
        blocker_type  TEXT NOT NULL DEFAULT 'external'
                      CHECK (blocker_type IN ('data', 'approval', 'infra', 'external')),
        is_resolved   INTEGER NOT NULL DEFAULT 0 CHECK (is_resolved IN (0, 1)),
        created_at    TEXT NOT NULL,
        updated_at    TEXT NOT NULL
    );
    CREATE INDEX idx_external_blockers_task ON external_blockers(task_id);
    "#,
];

/// Schema version this build expects.
pub const SCHEMA_VERSION: u32 = MIGRATIONS.len() as u32;

pub fn schema_version(conn: &Connection) -> Result<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}

/// Migration is needed when the database is behind this build's schema.
pub fn needs_migration(conn: &Connection) -> Result<bool> {
    let current = schema_version(conn)?;
    tlog_debug!("needs_migration current={} target={}", current, SCHEMA_VERSION);
    Ok(current < SCHEMA_VERSION)
}

/// Apply every pending migration.
///
/// Returns the number of migrations applied by this call.
pub fn migrate(conn: &mut Connection) -> Result<usize> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let current = schema_version(&tx)? as usize;
    let mut applied = 0;
    for (index, sql) in MIGRATIONS.iter().enumerate().skip(current) {
        let version = index + 1;
        tx.execute_batch(sql)?;
        tx.pragma_update(None, "user_version", version as u32)?;
        tlog_debug!("Applied schema migration {}", version);
        applied += 1;
    }
    tx.commit()?;
    if applied > 0 {
        tlog!("Schema migrated to version {}", SCHEMA_VERSION);
    }
    Ok(applied)
}

/// Check if migration is needed and perform it if so.
///
/// Returns `true` if anything was applied.
pub fn migrate_if_needed(conn: &mut Connection) -> Result<bool> {
    if !needs_migration(conn)? {
        return Ok(false);
    }
    Ok(migrate(conn)? > 0)
}
