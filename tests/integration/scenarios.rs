//! End-to-end backlog scenarios.

use tusk::core::{ClosedReason, Complexity, Priority, TaskId, Verdict};
use tusk::Error;

use crate::fixtures::TestBacklog;

/// Given A with no dependencies and B depending on A
/// Then A is ready and B is blocked on A
#[test]
fn test_ready_and_blocked_with_one_edge() {
    let backlog = TestBacklog::new();
    let a = backlog.add("A");
    let b = backlog.add("B");
    assert_eq!((a, b), (TaskId(1), TaskId(2)));
    backlog.store.add_dependency(b, a).unwrap();

    let ready: Vec<TaskId> = backlog.store.ready().unwrap().iter().map(|t| t.id).collect();
    assert_eq!(ready, vec![a]);

    let blocked = backlog.store.blocked().unwrap();
    assert_eq!(blocked.len(), 1);
    assert_eq!(blocked[0].task.id, b);
    assert_eq!(blocked[0].waiting_on, vec![a]);
}

/// Given B depends on A
/// When adding A depends on B
/// Then CycleDetected and the edge set is unchanged
#[test]
fn test_cycle_is_rejected_and_edges_unchanged() {
    let backlog = TestBacklog::new();
    let a = backlog.add("A");
    let b = backlog.add("B");
    backlog.store.add_dependency(b, a).unwrap();
    let before: Vec<_> = backlog.store.graph().unwrap().edges().collect();

    let err = backlog.store.add_dependency(a, b).unwrap_err();
    assert!(matches!(err, Error::CycleDetected { task, depends_on } if task == a && depends_on == b));
    assert_eq!(err.exit_code(), 1);

    let after: Vec<_> = backlog.store.graph().unwrap().edges().collect();
    assert_eq!(before, after);
}

/// Highest/XS outranks Lowest/XL
#[test]
fn test_high_value_small_job_scores_higher() {
    let backlog = TestBacklog::new();
    let quick_win = backlog.add_scored("quick win", Priority::Highest, Complexity::XS);
    let slog = backlog.add_scored("slog", Priority::Lowest, Complexity::XL);

    let quick_win = backlog.store.get_task(quick_win).unwrap();
    let slog = backlog.store.get_task(slog).unwrap();
    assert!(quick_win.priority_score > slog.priority_score);

    let ready: Vec<TaskId> = backlog.store.ready().unwrap().iter().map(|t| t.id).collect();
    assert_eq!(ready, vec![quick_win.id, slog.id]);
}

/// A shorter restatement of an open task is inconclusive, not a match
#[test]
fn test_partial_restatement_is_inconclusive() {
    let backlog = TestBacklog::new();
    let existing = backlog.add("Add rate limiting middleware to API gateway");

    let verdict = backlog
        .store
        .check_duplicate("Add rate limiting middleware", None)
        .unwrap();
    match verdict {
        Verdict::Inconclusive {
            task_id: Some(id),
            score,
        } => {
            assert_eq!(id, existing);
            assert!((0.5..0.8).contains(&score), "score {score} outside band");
        }
        other => panic!("Expected Inconclusive, got {other:?}"),
    }
    assert_eq!(verdict.exit_code(), 2);
}

/// Closing the dependency flips readiness without touching edges
#[test]
fn test_closing_dependency_makes_dependent_ready() {
    let backlog = TestBacklog::new();
    let a = backlog.add("A");
    let b = backlog.add("B");
    backlog.store.add_dependency(b, a).unwrap();
    let edges_before = backlog.store.graph().unwrap().dependency_count();

    assert!(!backlog.store.is_ready(b).unwrap());
    backlog.store.close_task(a, ClosedReason::Completed).unwrap();
    assert!(backlog.store.is_ready(b).unwrap());

    assert_eq!(backlog.store.graph().unwrap().dependency_count(), edges_before);
    assert!(backlog.store.blocked().unwrap().is_empty());
}

/// Propose, screen, persist, link, rescore, read
#[test]
fn test_full_flow_through_duplicate_screen() {
    use tusk::core::NewTask;
    use tusk::DuplicatePolicy;

    let backlog = TestBacklog::new();
    let store = &backlog.store;
    let login = store
        .create_task(
            NewTask::new("Add login page").priority(Priority::High),
            DuplicatePolicy::Reject,
        )
        .unwrap();
    let err = store
        .create_task(NewTask::new("add login page!"), DuplicatePolicy::Reject)
        .unwrap_err();
    assert!(matches!(err, Error::DuplicateRejected { existing, .. } if existing == login));

    let tests = store
        .create_task(
            NewTask::new("Write login tests").complexity(Complexity::S),
            DuplicatePolicy::Reject,
        )
        .unwrap();
    store.add_dependency(tests, login).unwrap();
    let report = store.recompute_scores().unwrap();
    assert!(report.is_clean());
    assert_eq!(report.updated, 2);

    let ready = store.ready().unwrap();
    assert_eq!(ready.len(), 1);
    assert_eq!(ready[0].id, login);
    assert!(store.is_chain_head(login).unwrap());
    assert_eq!(
        store.downstream_scope(login).unwrap().into_iter().collect::<Vec<_>>(),
        vec![tests]
    );
}
