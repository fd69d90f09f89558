//! Point-in-time view of the backlog.
//!
//! A snapshot is read inside a single store transaction, so tasks and edges
//! are mutually consistent: a reader never sees an edge whose task row is
//! missing or a half-applied mutation. Once taken it is plain data and can
//! be queried without touching the store.

use serde::Serialize;
use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::core::blocker::ExternalBlocker;
use crate::core::dag::DependencyGraph;
use crate::core::task::{Task, TaskId};
use crate::{Error, Result};

/// An open task that is not ready, with what is holding it back.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockedTask {
    pub task: Task,
    /// Unfinished dependencies.
    pub waiting_on: Vec<TaskId>,
    /// Unresolved external blockers.
    pub blocked_by: Vec<i64>,
}

#[derive(Debug, Clone)]
pub struct BacklogSnapshot {
    tasks: BTreeMap<TaskId, Task>,
    graph: DependencyGraph,
    done: HashSet<TaskId>,
    blockers: Vec<ExternalBlocker>,
    /// Unresolved blocker ids per task.
    held: HashMap<TaskId, Vec<i64>>,
}

impl BacklogSnapshot {
    pub fn new(tasks: Vec<Task>, graph: DependencyGraph) -> Self {
        let done = tasks.iter().filter(|t| t.is_done()).map(|t| t.id).collect();
        Self {
            tasks: tasks.into_iter().map(|t| (t.id, t)).collect(),
            graph,
            done,
            blockers: Vec::new(),
            held: HashMap::new(),
        }
    }

    pub fn with_blockers(mut self, blockers: Vec<ExternalBlocker>) -> Self {
        self.held.clear();
        for blocker in blockers.iter().filter(|b| b.is_open()) {
            self.held.entry(blocker.task_id).or_default().push(blocker.id);
        }
        self.blockers = blockers;
        self
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// All external blockers, resolved ones included, by id.
    pub fn blockers(&self) -> impl Iterator<Item = &ExternalBlocker> {
        self.blockers.iter()
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(&id)
    }

    /// All tasks in id order.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    fn require(&self, id: TaskId) -> Result<&Task> {
        self.tasks.get(&id).ok_or(Error::UnknownTask(id))
    }

    fn open_blockers(&self, id: TaskId) -> &[i64] {
        self.held.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    fn unblocked(&self, id: TaskId) -> bool {
        self.graph.is_ready(id, &self.done) && self.open_blockers(id).is_empty()
    }

    /// True iff every dependency of `id` is Done and no external blocker on
    /// it is unresolved.
    pub fn is_ready(&self, id: TaskId) -> Result<bool> {
        self.require(id)?;
        Ok(self.unblocked(id))
    }

    /// Open tasks with nothing holding them back, best score first.
    pub fn ready(&self) -> Vec<Task> {
        let mut ready: Vec<Task> = self
            .tasks
            .values()
            .filter(|t| t.is_open() && self.unblocked(t.id))
            .cloned()
            .collect();
        sort_by_rank(&mut ready, |t| t);
        ready
    }

    /// Open tasks waiting on an unfinished dependency or an unresolved
    /// blocker, best score first.
    pub fn blocked(&self) -> Vec<BlockedTask> {
        let mut blocked: Vec<BlockedTask> = self
            .tasks
            .values()
            .filter(|t| t.is_open())
            .filter_map(|t| {
                let waiting_on = self.graph.unmet_dependencies(t.id, &self.done);
                let blocked_by = self.open_blockers(t.id).to_vec();
                (!waiting_on.is_empty() || !blocked_by.is_empty()).then(|| BlockedTask {
                    task: t.clone(),
                    waiting_on,
                    blocked_by,
                })
            })
            .collect();
        sort_by_rank(&mut blocked, |b| &b.task);
        blocked
    }

    /// Every task that directly or indirectly depends on `id`.
    pub fn downstream_scope(&self, id: TaskId) -> Result<BTreeSet<TaskId>> {
        self.require(id)?;
        Ok(self.graph.downstream_scope(id))
    }

    /// `(id, summary)` of open tasks, optionally restricted to one domain.
    pub fn open_summaries<'a>(&'a self, domain: Option<&'a str>) -> Vec<(TaskId, &'a str)> {
        self.tasks
            .values()
            .filter(|t| t.is_open())
            .filter(|t| domain.is_none() || t.domain.as_deref() == domain)
            .map(|t| (t.id, t.summary.as_str()))
            .collect()
    }
}

/// Ranking order used everywhere tasks are listed: `priority_score`
/// descending, then oldest (lowest id) first.
pub fn sort_by_rank<T>(items: &mut [T], task: impl Fn(&T) -> &Task) {
    items.sort_by_key(|item| {
        let t = task(item);
        (Reverse(t.priority_score), t.id)
    });
}
