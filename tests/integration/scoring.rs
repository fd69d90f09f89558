//! Priority scores as stored and recomputed.

use tusk::config::Config;
use tusk::core::scoring::PriorityWeights;
use tusk::core::{Complexity, Priority, TaskId, TaskUpdate};
use tusk::{Store, TaskFilter};

use crate::fixtures::TestBacklog;

#[test]
fn test_scores_written_on_create_and_update() {
    let backlog = TestBacklog::new();
    let id = backlog.add_scored("task", Priority::Low, Complexity::L);
    assert_eq!(backlog.store.get_task(id).unwrap().priority_score, 50);

    backlog
        .store
        .update_task(
            id,
            TaskUpdate {
                complexity: Some(None),
                ..TaskUpdate::default()
            },
        )
        .unwrap();
    // Unset complexity scores as M.
    assert_eq!(backlog.store.get_task(id).unwrap().priority_score, 67);
}

/// Changing the weight table and recomputing rescores every open task.
#[test]
fn test_recompute_after_weight_change() {
    let backlog = TestBacklog::new();
    let ids: Vec<TaskId> = Priority::ALL
        .iter()
        .map(|p| backlog.add_scored(&format!("{p} task"), *p, Complexity::M))
        .collect();

    let mut config = Config::default();
    config.scoring.priority_weights = PriorityWeights {
        highest: 10,
        high: 8,
        medium: 6,
        low: 4,
        lowest: 2,
    };
    let store = Store::open(&backlog.db_path, &config).unwrap();
    let report = store.recompute_scores().unwrap();
    assert_eq!(report.updated, ids.len());
    assert!(report.is_clean());

    let scores: Vec<i64> = ids
        .iter()
        .map(|id| store.get_task(*id).unwrap().priority_score)
        .collect();
    assert_eq!(scores, vec![333, 267, 200, 133, 67]);
}

#[test]
fn test_recompute_is_deterministic() {
    let backlog = TestBacklog::new();
    for (i, p) in Priority::ALL.iter().enumerate() {
        backlog.add_scored(&format!("t{i}"), *p, Complexity::ALL[i]);
    }
    backlog.store.recompute_scores().unwrap();
    let first = backlog.store.list_tasks(&TaskFilter::default()).unwrap();
    backlog.store.recompute_scores().unwrap();
    let second = backlog.store.list_tasks(&TaskFilter::default()).unwrap();

    let scores = |tasks: &[tusk::core::Task]| -> Vec<(TaskId, i64)> {
        tasks.iter().map(|t| (t.id, t.priority_score)).collect()
    };
    assert_eq!(scores(&first), scores(&second));
}

/// One malformed row is reported while the rest of the batch commits.
#[test]
fn test_batch_continues_past_bad_row() {
    let backlog = TestBacklog::new();
    let good = backlog.add_scored("good", Priority::High, Complexity::S);
    let bad = backlog.add("bad");
    {
        let conn = rusqlite::Connection::open(&backlog.db_path).unwrap();
        conn.execute(
            "UPDATE tasks SET complexity = 'XXL', priority_score = 1 WHERE id = ?1",
            [bad.0],
        )
        .unwrap();
        conn.execute(
            "UPDATE tasks SET priority_score = 0 WHERE id = ?1",
            [good.0],
        )
        .unwrap();
    }

    let report = backlog.store.recompute_scores().unwrap();
    assert_eq!(report.updated, 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].task_id, bad);
    assert!(report.failures[0].reason.contains("XXL"));

    assert_eq!(backlog.store.get_task(good).unwrap().priority_score, 200);
    assert!(backlog.store.recompute_one(bad).is_err());
}

#[test]
fn test_done_tasks_are_not_rescored() {
    let backlog = TestBacklog::new();
    let id = backlog.add("finished");
    backlog
        .store
        .close_task(id, tusk::core::ClosedReason::Completed)
        .unwrap();
    let report = backlog.store.recompute_scores().unwrap();
    assert_eq!(report.updated, 0);
}
