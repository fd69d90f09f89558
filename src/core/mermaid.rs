//! Mermaid rendering of the dependency graph.
//!
//! Output is a `graph LR` flowchart: one node per visible task, shaped by
//! complexity and classed by status, and one arrow per edge from the
//! dependency to the task waiting on it. External blockers are drawn as flag
//! nodes with a crossed arrow into the task they hold back.

use petgraph::graphmap::UnGraphMap;
use petgraph::visit::Bfs;
use std::collections::{BTreeSet, HashSet};

use crate::core::blocker::ExternalBlocker;
use crate::core::dag::RelationshipType;
use crate::core::task::{Complexity, Task, TaskId, TaskStatus};
use crate::snapshot::BacklogSnapshot;
use crate::tlog_debug;

const MAX_LABEL_CHARS: usize = 40;
const MAX_BLOCKER_LABEL_CHARS: usize = 35;

/// The tasks and edges selected for rendering.
#[derive(Debug, Clone, Default)]
pub struct DagView<'a> {
    pub tasks: Vec<&'a Task>,
    /// `(task, depends_on, relationship)`
    pub edges: Vec<(TaskId, TaskId, RelationshipType)>,
    /// Blockers attached to visible tasks.
    pub blockers: Vec<&'a ExternalBlocker>,
}

/// Select what to draw.
///
/// Open tasks are always shown. A Done task is shown when it has at least one
/// edge, or always when `show_all` is set. Without `show_all`, connected
/// groups of tasks that are all Done are dropped as finished history.
pub fn visible(snapshot: &BacklogSnapshot, show_all: bool) -> DagView<'_> {
    let graph = snapshot.graph();
    let edge_ids: HashSet<TaskId> = graph.edges().flat_map(|(t, d, _)| [t, d]).collect();

    let mut ids: BTreeSet<TaskId> = snapshot
        .tasks()
        .filter(|t| t.is_open() || show_all || edge_ids.contains(&t.id))
        .map(|t| t.id)
        .collect();

    if !show_all {
        let mut undirected: UnGraphMap<TaskId, ()> = UnGraphMap::new();
        for id in &ids {
            undirected.add_node(*id);
        }
        for (task, depends_on, _) in graph.edges() {
            if ids.contains(&task) && ids.contains(&depends_on) {
                undirected.add_edge(task, depends_on, ());
            }
        }

        let mut seen = HashSet::new();
        let mut finished = Vec::new();
        for start in &ids {
            if seen.contains(start) {
                continue;
            }
            let mut component = Vec::new();
            let mut bfs = Bfs::new(&undirected, *start);
            while let Some(id) = bfs.next(&undirected) {
                seen.insert(id);
                component.push(id);
            }
            let all_done = component
                .iter()
                .all(|id| snapshot.task(*id).is_some_and(Task::is_done));
            if all_done {
                finished.extend(component);
            }
        }
        for id in finished {
            ids.remove(&id);
        }
    }

    let tasks: Vec<&Task> = ids.iter().filter_map(|id| snapshot.task(*id)).collect();
    let edges: Vec<_> = graph
        .edges()
        .filter(|(t, d, _)| ids.contains(t) && ids.contains(d))
        .collect();
    let blockers: Vec<_> = snapshot
        .blockers()
        .filter(|b| ids.contains(&b.task_id))
        .collect();
    tlog_debug!(
        "DAG visible: {} tasks, {} edges, {} blockers",
        tasks.len(),
        edges.len(),
        blockers.len()
    );
    DagView {
        tasks,
        edges,
        blockers,
    }
}

fn truncate(text: &str, max: usize) -> String {
    let text = if text.chars().count() > max {
        let head: String = text.chars().take(max - 3).collect();
        format!("{head}...")
    } else {
        text.to_string()
    };
    text.replace('"', "'")
}

fn label(task: &Task) -> String {
    format!("#{}: {}", task.id, truncate(&task.summary, MAX_LABEL_CHARS))
}

fn blocker_node(blocker: &ExternalBlocker) -> String {
    format!(
        "B{}>\"{}: {}\"]",
        blocker.id,
        blocker.blocker_type,
        truncate(&blocker.description, MAX_BLOCKER_LABEL_CHARS)
    )
}

fn node(task: &Task) -> String {
    let id = format!("T{}", task.id);
    let label = label(task);
    match task.complexity {
        None | Some(Complexity::XS) | Some(Complexity::S) => format!("{id}[\"{label}\"]"),
        Some(Complexity::M) => format!("{id}(\"{label}\")"),
        Some(Complexity::L) | Some(Complexity::XL) => format!("{id}{{{{\"{label}\"}}}}"),
    }
}

fn status_class(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::ToDo => "todo",
        TaskStatus::InProgress => "inprogress",
        TaskStatus::Done => "done",
    }
}

/// Render a view as Mermaid source.
pub fn render(view: &DagView<'_>) -> String {
    let mut lines = vec![
        "graph LR".to_string(),
        "    classDef todo fill:#3b82f6,stroke:#2563eb,color:#fff".to_string(),
        "    classDef inprogress fill:#f59e0b,stroke:#d97706,color:#fff".to_string(),
        "    classDef done fill:#22c55e,stroke:#16a34a,color:#fff".to_string(),
        "    classDef blocker fill:#ef4444,stroke:#dc2626,color:#fff".to_string(),
        "    classDef blockerResolved fill:#9ca3af,stroke:#6b7280,color:#fff".to_string(),
    ];
    for task in &view.tasks {
        lines.push(format!("    {}", node(task)));
        lines.push(format!("    class T{} {}", task.id, status_class(task.status)));
    }
    for blocker in &view.blockers {
        let class = if blocker.is_resolved {
            "blockerResolved"
        } else {
            "blocker"
        };
        lines.push(format!("    {}", blocker_node(blocker)));
        lines.push(format!("    class B{} {}", blocker.id, class));
    }
    for (task, depends_on, rel) in &view.edges {
        let arrow = match rel {
            RelationshipType::Blocks => "-->",
            RelationshipType::Contingent => "-.->",
        };
        lines.push(format!("    T{depends_on} {arrow} T{task}"));
    }
    for blocker in &view.blockers {
        lines.push(format!("    B{} -.-x T{}", blocker.id, blocker.task_id));
    }
    lines.join("\n")
}

/// Visible subset of `snapshot` rendered as Mermaid source.
pub fn build_mermaid(snapshot: &BacklogSnapshot, show_all: bool) -> String {
    render(&visible(snapshot, show_all))
}
