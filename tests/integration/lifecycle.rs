//! Status transitions, attribute edits, acceptance criteria and external
//! blockers.

use tusk::config::Config;
use tusk::core::{BlockerType, ClosedReason, NewTask, TaskStatus, TaskUpdate};
use tusk::store::CriterionSource;
use tusk::{DuplicatePolicy, Error, TaskFilter};

use crate::fixtures::TestBacklog;

#[test]
fn test_start_then_close() {
    let backlog = TestBacklog::new();
    let id = backlog.add("task");
    let started = backlog.store.start_task(id).unwrap();
    assert_eq!(started.status, TaskStatus::InProgress);
    assert!(backlog.store.is_ready(id).unwrap());

    let closed = backlog.store.close_task(id, ClosedReason::Completed).unwrap();
    assert_eq!(closed.status, TaskStatus::Done);
    assert_eq!(closed.closed_reason, Some(ClosedReason::Completed));
    assert!(closed.updated_at >= started.updated_at);
}

#[test]
fn test_done_is_terminal_until_reopened() {
    let backlog = TestBacklog::new();
    let id = backlog.add("task");
    backlog.store.close_task(id, ClosedReason::WontDo).unwrap();

    let err = backlog.store.start_task(id).unwrap_err();
    assert!(matches!(err, Error::InvalidTransition { .. }));
    assert_eq!(err.exit_code(), 1);

    let reopened = backlog.store.reopen_task(id).unwrap();
    assert_eq!(reopened.status, TaskStatus::ToDo);
    assert!(reopened.closed_reason.is_none());
    assert_eq!(reopened.priority_score, 100);
}

#[test]
fn test_reopening_dependency_blocks_dependent_again() {
    let backlog = TestBacklog::new();
    let ids = backlog.chain(2);
    backlog.store.close_task(ids[0], ClosedReason::Completed).unwrap();
    assert!(backlog.store.is_ready(ids[1]).unwrap());
    backlog.store.reopen_task(ids[0]).unwrap();
    assert!(!backlog.store.is_ready(ids[1]).unwrap());
}

#[test]
fn test_update_validates_against_allowed_sets() {
    let mut config = Config::default();
    config.attributes.agents.insert("backend".into());
    let backlog = TestBacklog::with_config(config);
    let id = backlog.add("task");

    let err = backlog
        .store
        .update_task(
            id,
            TaskUpdate {
                assignee: Some(Some("frontend".into())),
                ..TaskUpdate::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, Error::InvalidAttribute { field: "assignee", .. }));
    assert!(backlog.store.get_task(id).unwrap().assignee.is_none());

    let task = backlog
        .store
        .update_task(
            id,
            TaskUpdate {
                assignee: Some(Some("backend".into())),
                summary: Some("  renamed  ".into()),
                ..TaskUpdate::default()
            },
        )
        .unwrap();
    assert_eq!(task.assignee.as_deref(), Some("backend"));
    assert_eq!(task.summary, "renamed");
}

#[test]
fn test_update_missing_task() {
    let backlog = TestBacklog::new();
    let err = backlog
        .store
        .update_task(tusk::core::TaskId(9), TaskUpdate::default())
        .unwrap_err();
    assert!(matches!(err, Error::TaskNotFound(_)));
}

#[test]
fn test_list_by_assignee_and_status() {
    let backlog = TestBacklog::new();
    let mine = backlog.add_task(NewTask::new("mine").assignee("backend"));
    backlog.add_task(NewTask::new("theirs").assignee("frontend"));
    backlog.store.start_task(mine).unwrap();

    let filter = TaskFilter {
        assignee: Some("backend".into()),
        ..TaskFilter::default()
    };
    assert_eq!(backlog.store.list_tasks(&filter).unwrap().len(), 1);

    let in_progress = TaskFilter {
        status: Some(TaskStatus::InProgress),
        ..TaskFilter::default()
    };
    let tasks = backlog.store.list_tasks(&in_progress).unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].id, mine);
}

#[test]
fn test_criteria_progress_and_detail() {
    let backlog = TestBacklog::new();
    let id = backlog.add("Ship search");
    let a = backlog
        .store
        .add_criterion(id, "Index built", CriterionSource::Original)
        .unwrap();
    backlog
        .store
        .add_criterion(id, "Latency under 100ms", CriterionSource::PrReview)
        .unwrap();

    assert!(backlog.store.complete_criterion(a).unwrap());
    assert_eq!(backlog.store.criteria_progress(id).unwrap(), (1, 2));

    let criterion = backlog.store.get_criterion(a).unwrap();
    assert!(criterion.is_completed);
    assert_eq!(criterion.task_id, id);
}

#[test]
fn test_data_survives_reopen() {
    let backlog = TestBacklog::new();
    let a = backlog.add("a");
    let b = backlog
        .store
        .create_task(NewTask::new("b"), DuplicatePolicy::Skip)
        .unwrap();
    backlog.store.add_dependency(b, a).unwrap();
    backlog
        .store
        .add_criterion(a, "done right", CriterionSource::Original)
        .unwrap();

    let other = backlog.reopen();
    assert_eq!(other.get_task(a).unwrap().summary, "a");
    assert_eq!(other.dependencies(b).unwrap()[0].depends_on_id, a);
    assert_eq!(other.criteria(a).unwrap().len(), 1);
    other.close().unwrap();
}

/// A failed create stores nothing, so a caller retrying on the refusal does
/// not end up with two copies of the task.
#[test]
fn test_create_with_blank_criterion_stores_nothing() {
    let backlog = TestBacklog::new();
    let err = backlog
        .store
        .create_task(
            NewTask::new("Ship release").criterion("Changelog written").criterion(""),
            DuplicatePolicy::Reject,
        )
        .unwrap_err();
    assert_eq!(err.exit_code(), 1);
    assert!(backlog.store.snapshot().unwrap().is_empty());

    let id = backlog
        .store
        .create_task(
            NewTask::new("Ship release").criterion("Changelog written"),
            DuplicatePolicy::Reject,
        )
        .unwrap();
    assert_eq!(backlog.store.criteria_progress(id).unwrap(), (0, 1));
}

/// An external blocker holds back a task whose dependencies are all done,
/// across connections, until it is resolved.
#[test]
fn test_external_blocker_gates_readiness() {
    let backlog = TestBacklog::new();
    let [top, left, right, bottom] = backlog.diamond();
    for id in [top, left, right] {
        backlog.store.close_task(id, ClosedReason::Completed).unwrap();
    }
    let blocker = backlog
        .store
        .add_blocker(bottom, "Waiting on DBA approval", BlockerType::Approval)
        .unwrap();

    let other = backlog.reopen();
    assert!(!other.is_ready(bottom).unwrap());
    assert!(other.ready().unwrap().is_empty());
    let blocked = other.blocked().unwrap();
    assert_eq!(blocked.len(), 1);
    assert_eq!(blocked[0].blocked_by, vec![blocker]);

    other.resolve_blocker(blocker).unwrap();
    let ready: Vec<_> = backlog.store.ready().unwrap().iter().map(|t| t.id).collect();
    assert_eq!(ready, vec![bottom]);
    assert!(backlog.store.get_blocker(blocker).unwrap().is_resolved);
}
