//! Test fixtures for integration tests.
//!
//! Provides helpers for:
//! - Temporary file-backed backlogs
//! - Canned task graphs (chains, diamonds)
//! - A deterministic pseudo-random source

use std::path::PathBuf;
use tempfile::TempDir;

use tusk::config::Config;
use tusk::core::{Complexity, NewTask, Priority, TaskId};
use tusk::{DuplicatePolicy, Store};

/// A backlog in a temporary directory. The database lives as long as this.
pub struct TestBacklog {
    /// Keeps the directory alive.
    pub temp_dir: TempDir,
    pub db_path: PathBuf,
    pub config: Config,
    pub store: Store,
}

impl TestBacklog {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("tasks.db");
        let store = Store::open(&db_path, &config).expect("Failed to open store");
        Self {
            temp_dir,
            db_path,
            config,
            store,
        }
    }

    /// A second, independent connection to the same database file.
    pub fn reopen(&self) -> Store {
        Store::open(&self.db_path, &self.config).expect("Failed to reopen store")
    }

    pub fn add(&self, summary: &str) -> TaskId {
        self.add_task(NewTask::new(summary))
    }

    pub fn add_task(&self, task: NewTask) -> TaskId {
        self.store
            .create_task(task, DuplicatePolicy::Skip)
            .expect("Failed to create task")
    }

    pub fn add_scored(&self, summary: &str, priority: Priority, complexity: Complexity) -> TaskId {
        self.add_task(
            NewTask::new(summary)
                .priority(priority)
                .complexity(complexity),
        )
    }

    /// `n` tasks where each depends on the one before it.
    pub fn chain(&self, n: usize) -> Vec<TaskId> {
        let ids: Vec<TaskId> = (0..n).map(|i| self.add(&format!("chain step {i}"))).collect();
        for pair in ids.windows(2) {
            self.store
                .add_dependency(pair[1], pair[0])
                .expect("Failed to add chain edge");
        }
        ids
    }

    /// `top <- left, right <- bottom`: bottom waits on both left and right,
    /// which both wait on top.
    pub fn diamond(&self) -> [TaskId; 4] {
        let top = self.add("design schema");
        let left = self.add("write migrations");
        let right = self.add("write queries");
        let bottom = self.add("ship release");
        for (task, dep) in [(left, top), (right, top), (bottom, left), (bottom, right)] {
            self.store
                .add_dependency(task, dep)
                .expect("Failed to add diamond edge");
        }
        [top, left, right, bottom]
    }
}

/// Small deterministic xorshift generator so property tests are repeatable.
pub struct XorShift(u64);

impl XorShift {
    pub fn new(seed: u64) -> Self {
        Self(seed.max(1))
    }

    pub fn next(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }

    pub fn below(&mut self, n: usize) -> usize {
        (self.next() % n as u64) as usize
    }
}
