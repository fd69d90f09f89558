//! Dependency DAG (Directed Acyclic Graph) over task ids.
//!
//! Edges point from a dependency to the task waiting on it, so a path
//! `a -> ... -> b` means `b` transitively depends on `a`. The graph holds ids
//! only; task data stays in the store. Every structural check is a traversal
//! over ids, independent of task status: a Done task's edges still count
//! toward acyclicity.

use chrono::{DateTime, Utc};
use petgraph::algo::{has_path_connecting, toposort};
use petgraph::graphmap::DiGraphMap;
use petgraph::visit::{Dfs, Walker};
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::str::FromStr;

use crate::core::task::TaskId;
use crate::{Error, Result};

/// Kind of ordering constraint between two tasks.
///
/// Both kinds gate readiness the same way; the distinction is informational
/// (a contingent task may be dropped if its dependency is closed as
/// `wont_do`) and is shown in rendered graphs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipType {
    /// The task cannot start before the dependency is done.
    Blocks,
    /// The task only makes sense if the dependency's outcome allows it.
    Contingent,
}

impl Default for RelationshipType {
    fn default() -> Self {
        Self::Blocks
    }
}

impl RelationshipType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipType::Blocks => "blocks",
            RelationshipType::Contingent => "contingent",
        }
    }
}

impl std::fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelationshipType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "blocks" => Ok(RelationshipType::Blocks),
            "contingent" => Ok(RelationshipType::Contingent),
            other => Err(Error::invalid("relationship_type", other)),
        }
    }
}

/// A stored dependency edge: `task_id` waits for `depends_on_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub task_id: TaskId,
    pub depends_on_id: TaskId,
    pub relationship_type: RelationshipType,
    pub created_at: DateTime<Utc>,
}

/// The task dependency graph.
///
/// Nodes are task ids, edge weights the relationship type.
#[derive(Clone, Default)]
pub struct DependencyGraph {
    graph: DiGraphMap<TaskId, RelationshipType>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self {
            graph: DiGraphMap::new(),
        }
    }

    /// Build a graph from known task ids and edges.
    ///
    /// Edges are inserted without validation; they are expected to come from
    /// a store that already enforces the invariants.
    pub fn from_parts<T, E>(tasks: T, edges: E) -> Self
    where
        T: IntoIterator<Item = TaskId>,
        E: IntoIterator<Item = (TaskId, TaskId, RelationshipType)>,
    {
        let mut dag = Self::new();
        for id in tasks {
            dag.graph.add_node(id);
        }
        for (task, depends_on, rel) in edges {
            dag.graph.add_edge(depends_on, task, rel);
        }
        dag
    }

    /// Register a task. Adding an existing id is a no-op.
    pub fn add_task(&mut self, id: TaskId) {
        self.graph.add_node(id);
    }

    pub fn contains_task(&self, id: TaskId) -> bool {
        self.graph.contains_node(id)
    }

    pub fn task_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn dependency_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Check that `task -> depends_on` may be added.
    ///
    /// # Errors
    /// - `SelfDependency` if the ids are equal
    /// - `UnknownTask` if either id is not in the graph
    /// - `CycleDetected` if `depends_on` already reaches `task` as a
    ///   (transitive) dependent, i.e. `depends_on` depends on `task`
    pub fn check_dependency(&self, task: TaskId, depends_on: TaskId) -> Result<()> {
        if task == depends_on {
            return Err(Error::SelfDependency(task));
        }
        for id in [task, depends_on] {
            if !self.contains_task(id) {
                return Err(Error::UnknownTask(id));
            }
        }
        if self.graph.contains_edge(depends_on, task) {
            return Ok(());
        }
        if has_path_connecting(&self.graph, task, depends_on, None) {
            return Err(Error::CycleDetected { task, depends_on });
        }
        Ok(())
    }

    /// Add a dependency: `task` waits for `depends_on`.
    ///
    /// Returns `true` if the edge was inserted and `false` if the identical
    /// edge already existed (the stored relationship type is kept).
    pub fn add_dependency(
        &mut self,
        task: TaskId,
        depends_on: TaskId,
        rel: RelationshipType,
    ) -> Result<bool> {
        self.check_dependency(task, depends_on)?;
        if self.graph.contains_edge(depends_on, task) {
            return Ok(false);
        }
        self.graph.add_edge(depends_on, task, rel);
        Ok(true)
    }

    /// Remove a dependency.
    ///
    /// # Errors
    /// `EdgeNotFound` if there is no such edge.
    pub fn remove_dependency(&mut self, task: TaskId, depends_on: TaskId) -> Result<()> {
        self.graph
            .remove_edge(depends_on, task)
            .map(|_| ())
            .ok_or(Error::EdgeNotFound { task, depends_on })
    }

    pub fn has_dependency(&self, task: TaskId, depends_on: TaskId) -> bool {
        self.graph.contains_edge(depends_on, task)
    }

    pub fn relationship(&self, task: TaskId, depends_on: TaskId) -> Option<RelationshipType> {
        self.graph.edge_weight(depends_on, task).copied()
    }

    /// Tasks `task` directly depends on, ascending.
    pub fn dependencies(&self, task: TaskId) -> Vec<TaskId> {
        self.sorted_neighbors(task, Direction::Incoming)
    }

    /// Tasks directly depending on `task`, ascending.
    pub fn dependents(&self, task: TaskId) -> Vec<TaskId> {
        self.sorted_neighbors(task, Direction::Outgoing)
    }

    fn sorted_neighbors(&self, task: TaskId, dir: Direction) -> Vec<TaskId> {
        if !self.contains_task(task) {
            return Vec::new();
        }
        let mut ids: Vec<TaskId> = self.graph.neighbors_directed(task, dir).collect();
        ids.sort();
        ids
    }

    /// Every task that directly or indirectly depends on `task`.
    pub fn downstream_scope(&self, task: TaskId) -> BTreeSet<TaskId> {
        if !self.contains_task(task) {
            return BTreeSet::new();
        }
        Dfs::new(&self.graph, task)
            .iter(&self.graph)
            .filter(|id| *id != task)
            .collect()
    }

    /// A chain head has at least one task depending on it.
    pub fn is_chain_head(&self, task: TaskId) -> bool {
        self.contains_task(task)
            && self
                .graph
                .neighbors_directed(task, Direction::Outgoing)
                .next()
                .is_some()
    }

    /// Dependencies of `task` not contained in `done`, ascending.
    pub fn unmet_dependencies(&self, task: TaskId, done: &HashSet<TaskId>) -> Vec<TaskId> {
        self.dependencies(task)
            .into_iter()
            .filter(|dep| !done.contains(dep))
            .collect()
    }

    /// A task is ready when every dependency is in `done`.
    pub fn is_ready(&self, task: TaskId, done: &HashSet<TaskId>) -> bool {
        self.graph
            .neighbors_directed(task, Direction::Incoming)
            .all(|dep| done.contains(&dep))
    }

    /// Ids in dependency order (every task after all of its dependencies).
    ///
    /// # Errors
    /// Returns `CycleDetected` if the graph holds a cycle, which can only
    /// happen when it was built from unvalidated edges.
    pub fn topological_order(&self) -> Result<Vec<TaskId>> {
        toposort(&self.graph, None).map_err(|cycle| {
            let node = cycle.node_id();
            let depends_on = self
                .graph
                .neighbors_directed(node, Direction::Incoming)
                .next()
                .unwrap_or(node);
            Error::CycleDetected {
                task: node,
                depends_on,
            }
        })
    }

    /// All edges as `(task, depends_on, relationship)`.
    pub fn edges(&self) -> impl Iterator<Item = (TaskId, TaskId, RelationshipType)> + '_ {
        self.graph
            .all_edges()
            .map(|(depends_on, task, rel)| (task, depends_on, *rel))
    }

    pub fn tasks(&self) -> impl Iterator<Item = TaskId> + '_ {
        self.graph.nodes()
    }
}

impl std::fmt::Debug for DependencyGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyGraph")
            .field("tasks", &self.task_count())
            .field("dependencies", &self.dependency_count())
            .finish()
    }
}
