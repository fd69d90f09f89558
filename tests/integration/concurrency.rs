//! Parallel writers on one backlog.
//!
//! Writers run on blocking worker threads of a multi-threaded runtime, the
//! way a dispatcher would drive store calls for several agents at once.

use std::collections::HashSet;
use std::sync::{Arc, Barrier};

use tempfile::TempDir;

use tusk::core::{ClosedReason, TaskId};
use tusk::config::Config;
use tusk::{Error, Result, Store};

use crate::fixtures::TestBacklog;

async fn add_edges_concurrently(stores: [Store; 2], edges: [(TaskId, TaskId); 2]) -> Vec<Result<bool>> {
    let handles: Vec<_> = stores
        .into_iter()
        .zip(edges)
        .map(|(store, (task, dep))| {
            tokio::task::spawn_blocking(move || store.add_dependency(task, dep))
        })
        .collect();
    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.expect("worker panicked"));
    }
    results
}

fn assert_exactly_one_cycle_rejection(results: &[Result<bool>]) {
    let ok = results.iter().filter(|r| r.is_ok()).count();
    let cycles = results
        .iter()
        .filter(|r| matches!(r, Err(Error::CycleDetected { .. })))
        .count();
    assert_eq!((ok, cycles), (1, 1), "results: {results:?}");
}

/// Two edges that would jointly close a cycle, raced through one shared store.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_cycle_edges_shared_store() {
    for _ in 0..10 {
        let backlog = TestBacklog::new();
        let a = backlog.add("a");
        let b = backlog.add("b");
        let stores = [backlog.store.clone(), backlog.store.clone()];
        let results = add_edges_concurrently(stores, [(b, a), (a, b)]).await;
        assert_exactly_one_cycle_rejection(&results);
        assert_eq!(backlog.store.graph().unwrap().dependency_count(), 1);
    }
}

/// The same race through two separate connections to one database file.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_cycle_edges_separate_connections() {
    for _ in 0..10 {
        let backlog = TestBacklog::new();
        let a = backlog.add("a");
        let b = backlog.add("b");
        let c = backlog.add("c");
        backlog.store.add_dependency(b, a).unwrap();
        // c -> b closes nothing alone, nor does a -> c; together they cycle.
        let stores = [backlog.reopen(), backlog.reopen()];
        let results = add_edges_concurrently(stores, [(c, b), (a, c)]).await;
        assert_exactly_one_cycle_rejection(&results);
        assert!(backlog.store.graph().unwrap().topological_order().is_ok());
    }
}

/// Many concurrent creators get distinct ids and no lost writes.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creates_get_unique_ids() {
    let backlog = TestBacklog::new();
    let handles: Vec<_> = (0..16)
        .map(|i| {
            let store = if i % 2 == 0 {
                backlog.store.clone()
            } else {
                backlog.reopen()
            };
            tokio::task::spawn_blocking(move || {
                store.create_task(
                    tusk::core::NewTask::new(&format!("task {i}")),
                    tusk::DuplicatePolicy::Skip,
                )
            })
        })
        .collect();

    let mut ids = HashSet::new();
    for handle in handles {
        ids.insert(handle.await.unwrap().unwrap());
    }
    assert_eq!(ids.len(), 16);
    assert_eq!(backlog.store.snapshot().unwrap().len(), 16);
}

/// Readers always see a consistent snapshot while a writer closes tasks.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_snapshots_stay_consistent_during_writes() {
    let backlog = TestBacklog::new();
    let ids = backlog.chain(20);

    let writer = {
        let store = backlog.store.clone();
        let ids = ids.clone();
        tokio::task::spawn_blocking(move || {
            for id in ids {
                store.close_task(id, ClosedReason::Completed).unwrap();
            }
        })
    };
    let reader = {
        let store = backlog.reopen();
        tokio::task::spawn_blocking(move || {
            for _ in 0..50 {
                let snapshot = store.snapshot().unwrap();
                let ready = snapshot.ready();
                // In a chain, at most one open task is ready at a time.
                assert!(ready.len() <= 1, "ready: {:?}", ready.len());
                assert_eq!(snapshot.graph().dependency_count(), 19);
            }
        })
    };
    writer.await.unwrap();
    reader.await.unwrap();
    assert!(backlog.store.ready().unwrap().is_empty());
}

/// Several processes opening a brand new database file at the same moment
/// all come up on the current schema.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_open_of_fresh_database() {
    const OPENERS: usize = 4;
    for round in 0..10 {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join(format!("fresh-{round}.db"));
        let barrier = Arc::new(Barrier::new(OPENERS));

        let handles: Vec<_> = (0..OPENERS)
            .map(|_| {
                let path = db_path.clone();
                let barrier = Arc::clone(&barrier);
                tokio::task::spawn_blocking(move || {
                    barrier.wait();
                    Store::open(&path, &Config::default())
                })
            })
            .collect();

        let mut stores = Vec::new();
        for handle in handles {
            match handle.await.expect("worker panicked") {
                Ok(store) => stores.push(store),
                Err(e) => panic!("round {round}: {e}"),
            }
        }
        let a = stores[0]
            .create_task(tusk::core::NewTask::new("first"), tusk::DuplicatePolicy::Skip)
            .unwrap();
        assert_eq!(stores[OPENERS - 1].get_task(a).unwrap().summary, "first");
    }
}
