//! Structural properties of the stored dependency graph.

use std::collections::HashSet;

use tusk::core::{ClosedReason, RelationshipType, TaskId};
use tusk::Error;

use crate::fixtures::{TestBacklog, XorShift};

/// Random edge insertions never leave a cycle, and every rejection is
/// explained by an existing path.
#[test]
fn test_random_insertions_stay_acyclic() {
    let backlog = TestBacklog::new();
    let ids: Vec<TaskId> = (0..12).map(|i| backlog.add(&format!("task {i}"))).collect();
    let mut rng = XorShift::new(0x5eed);

    let mut accepted = 0;
    let mut rejected = 0;
    for _ in 0..150 {
        let task = ids[rng.below(ids.len())];
        let dep = ids[rng.below(ids.len())];
        let before = backlog.store.graph().unwrap();
        match backlog.store.add_dependency(task, dep) {
            Ok(_) => accepted += 1,
            Err(Error::SelfDependency(id)) => {
                assert_eq!(id, task);
                assert_eq!(task, dep);
                rejected += 1;
            }
            Err(Error::CycleDetected { .. }) => {
                assert!(
                    before.downstream_scope(task).contains(&dep),
                    "{dep} rejected as dependency of {task} without a path"
                );
                rejected += 1;
            }
            Err(other) => panic!("Unexpected error: {other}"),
        }
        assert!(backlog.store.graph().unwrap().topological_order().is_ok());
    }
    assert!(accepted > 0 && rejected > 0, "accepted={accepted} rejected={rejected}");
}

#[test]
fn test_edges_of_done_tasks_still_block_cycles() {
    let backlog = TestBacklog::new();
    let ids = backlog.chain(3);
    for id in &ids {
        backlog.store.close_task(*id, ClosedReason::Completed).unwrap();
    }
    let err = backlog.store.add_dependency(ids[0], ids[2]).unwrap_err();
    assert!(matches!(err, Error::CycleDetected { .. }));
}

#[test]
fn test_idempotent_insert_keeps_single_edge() {
    let backlog = TestBacklog::new();
    let a = backlog.add("a");
    let b = backlog.add("b");
    assert!(backlog.store.add_dependency(b, a).unwrap());
    assert!(!backlog.store.add_dependency(b, a).unwrap());
    assert!(!backlog
        .store
        .add_dependency_with(b, a, RelationshipType::Contingent)
        .unwrap());

    let deps = backlog.store.dependencies(b).unwrap();
    assert_eq!(deps.len(), 1);
    assert_eq!(deps[0].relationship_type, RelationshipType::Blocks);
}

#[test]
fn test_unknown_endpoints_are_rejected() {
    let backlog = TestBacklog::new();
    let a = backlog.add("a");
    assert!(matches!(
        backlog.store.add_dependency(TaskId(50), a),
        Err(Error::UnknownTask(TaskId(50)))
    ));
    assert!(matches!(
        backlog.store.dependencies(TaskId(50)),
        Err(Error::UnknownTask(_))
    ));
    assert!(matches!(
        backlog.store.is_ready(TaskId(50)),
        Err(Error::UnknownTask(_))
    ));
}

/// Readiness matches its definition for every task after random closes.
#[test]
fn test_readiness_matches_definition() {
    let backlog = TestBacklog::new();
    let ids: Vec<TaskId> = (0..10).map(|i| backlog.add(&format!("task {i}"))).collect();
    let mut rng = XorShift::new(42);
    for _ in 0..30 {
        let task = ids[rng.below(ids.len())];
        let dep = ids[rng.below(ids.len())];
        let _ = backlog.store.add_dependency(task, dep);
    }
    for id in ids.iter().step_by(3) {
        backlog.store.close_task(*id, ClosedReason::Completed).unwrap();
    }

    let snapshot = backlog.store.snapshot().unwrap();
    let done: HashSet<TaskId> = snapshot.tasks().filter(|t| t.is_done()).map(|t| t.id).collect();
    let ready: HashSet<TaskId> = snapshot.ready().iter().map(|t| t.id).collect();
    let blocked: HashSet<TaskId> = snapshot.blocked().iter().map(|b| b.task.id).collect();

    for id in &ids {
        let deps_done = snapshot
            .graph()
            .dependencies(*id)
            .iter()
            .all(|d| done.contains(d));
        assert_eq!(snapshot.is_ready(*id).unwrap(), deps_done);
        if done.contains(id) {
            assert!(!ready.contains(id) && !blocked.contains(id));
        } else {
            assert_eq!(ready.contains(id), deps_done);
            assert_eq!(blocked.contains(id), !deps_done);
        }
    }
}

#[test]
fn test_downstream_scope_of_diamond() {
    let backlog = TestBacklog::new();
    let [top, left, right, bottom] = backlog.diamond();
    let scope: Vec<TaskId> = backlog.store.downstream_scope(top).unwrap().into_iter().collect();
    assert_eq!(scope, vec![left, right, bottom]);
    assert!(backlog.store.downstream_scope(bottom).unwrap().is_empty());
    assert!(!backlog.store.is_chain_head(bottom).unwrap());

    let order = backlog.store.graph().unwrap().topological_order().unwrap();
    let pos = |id| order.iter().position(|x| *x == id).unwrap();
    assert!(pos(top) < pos(left) && pos(top) < pos(right));
    assert!(pos(left) < pos(bottom) && pos(right) < pos(bottom));
}

#[test]
fn test_removing_edge_unblocks() {
    let backlog = TestBacklog::new();
    let ids = backlog.chain(2);
    assert!(!backlog.store.is_ready(ids[1]).unwrap());
    backlog.store.remove_dependency(ids[1], ids[0]).unwrap();
    assert!(backlog.store.is_ready(ids[1]).unwrap());
    assert!(matches!(
        backlog.store.remove_dependency(ids[1], ids[0]),
        Err(Error::EdgeNotFound { .. })
    ));
}
