//! Core domain models for the backlog engine.
//!
//! Everything here is pure: tasks, the dependency graph, scoring, duplicate
//! screening and graph rendering operate on values and never touch the store.

pub mod blocker;
pub mod dag;
pub mod mermaid;
pub mod scoring;
pub mod similarity;
pub mod task;

pub use blocker::{BlockerType, ExternalBlocker};
pub use dag::{Dependency, DependencyGraph, RelationshipType};
pub use scoring::{PriorityScorer, RecomputeReport, ScoringConfig};
pub use similarity::{DuplicateDetector, Verdict};
pub use task::{ClosedReason, Complexity, NewTask, Priority, Task, TaskId, TaskStatus, TaskUpdate};
