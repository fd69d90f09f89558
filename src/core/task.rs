//! Task data model for the backlog.
//!
//! Tasks are the atomic units of work handed to agents. Each task tracks its
//! lifecycle status, its ordinal attributes (priority and complexity) and the
//! derived `priority_score` used to rank ready work.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::{Error, Result};

/// Identifier of a task in the backlog.
///
/// Assigned by the store in creation order and never reused, so a lower id
/// always means an older task.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TaskId(pub i64);

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TaskId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim().trim_start_matches('#');
        trimmed
            .parse::<i64>()
            .map(TaskId)
            .map_err(|_| Error::invalid("task id", s))
    }
}

/// Task status in its lifecycle.
///
/// Status only moves forward: To Do → In Progress → Done, or directly
/// To Do → Done. Done is terminal except through an explicit reopen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    #[serde(rename = "To Do")]
    ToDo,
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "Done")]
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::ToDo => "To Do",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::Done => "Done",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "To Do" => Ok(TaskStatus::ToDo),
            "In Progress" => Ok(TaskStatus::InProgress),
            "Done" => Ok(TaskStatus::Done),
            other => Err(Error::invalid("status", other)),
        }
    }
}

/// Business value of a task, highest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    Highest,
    High,
    Medium,
    Low,
    Lowest,
}

impl Priority {
    pub const ALL: [Priority; 5] = [
        Priority::Highest,
        Priority::High,
        Priority::Medium,
        Priority::Low,
        Priority::Lowest,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Highest => "Highest",
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
            Priority::Lowest => "Lowest",
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::Medium
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Priority::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| Error::invalid("priority", s))
    }
}

/// Estimated size of a task, smallest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Complexity {
    XS,
    S,
    M,
    L,
    XL,
}

impl Complexity {
    pub const ALL: [Complexity; 5] = [
        Complexity::XS,
        Complexity::S,
        Complexity::M,
        Complexity::L,
        Complexity::XL,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Complexity::XS => "XS",
            Complexity::S => "S",
            Complexity::M => "M",
            Complexity::L => "L",
            Complexity::XL => "XL",
        }
    }
}

impl std::fmt::Display for Complexity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Complexity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Complexity::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| Error::invalid("complexity", s))
    }
}

/// Why a task reached Done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClosedReason {
    Completed,
    Expired,
    WontDo,
    Duplicate,
}

impl ClosedReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClosedReason::Completed => "completed",
            ClosedReason::Expired => "expired",
            ClosedReason::WontDo => "wont_do",
            ClosedReason::Duplicate => "duplicate",
        }
    }
}

impl std::fmt::Display for ClosedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClosedReason {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "completed" => Ok(ClosedReason::Completed),
            "expired" => Ok(ClosedReason::Expired),
            "wont_do" => Ok(ClosedReason::WontDo),
            "duplicate" => Ok(ClosedReason::Duplicate),
            other => Err(Error::invalid("closed_reason", other)),
        }
    }
}

/// A single work item in the backlog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub summary: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: Priority,
    pub complexity: Option<Complexity>,
    pub domain: Option<String>,
    pub task_type: Option<String>,
    pub assignee: Option<String>,
    /// Derived by the priority scorer; only meaningful as a sort key.
    pub priority_score: i64,
    /// Set if and only if `status` is Done.
    pub closed_reason: Option<ClosedReason>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn is_done(&self) -> bool {
        self.status == TaskStatus::Done
    }

    pub fn is_open(&self) -> bool {
        !self.is_done()
    }
}

/// Attributes for a task that does not exist yet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewTask {
    pub summary: String,
    pub description: Option<String>,
    pub priority: Priority,
    pub complexity: Option<Complexity>,
    pub domain: Option<String>,
    pub task_type: Option<String>,
    pub assignee: Option<String>,
    /// Acceptance criteria stored together with the task.
    #[serde(default)]
    pub criteria: Vec<String>,
}

impl NewTask {
    pub fn new(summary: &str) -> Self {
        Self {
            summary: summary.to_string(),
            ..Self::default()
        }
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn complexity(mut self, complexity: Complexity) -> Self {
        self.complexity = Some(complexity);
        self
    }

    pub fn domain(mut self, domain: &str) -> Self {
        self.domain = Some(domain.to_string());
        self
    }

    pub fn task_type(mut self, task_type: &str) -> Self {
        self.task_type = Some(task_type.to_string());
        self
    }

    pub fn assignee(mut self, assignee: &str) -> Self {
        self.assignee = Some(assignee.to_string());
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn criterion(mut self, criterion: &str) -> Self {
        self.criteria.push(criterion.to_string());
        self
    }
}

/// Attribute edits for an existing task. `None` leaves a field untouched.
///
/// For the optional attributes the inner `Option` distinguishes "set to this
/// value" from "clear".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskUpdate {
    pub summary: Option<String>,
    pub description: Option<Option<String>>,
    pub priority: Option<Priority>,
    pub complexity: Option<Option<Complexity>>,
    pub domain: Option<Option<String>>,
    pub task_type: Option<Option<String>>,
    pub assignee: Option<Option<String>>,
}

impl TaskUpdate {
    pub fn is_empty(&self) -> bool {
        self.summary.is_none()
            && self.description.is_none()
            && self.priority.is_none()
            && self.complexity.is_none()
            && self.domain.is_none()
            && self.task_type.is_none()
            && self.assignee.is_none()
    }
}

/// Returns the trimmed summary, rejecting blank input.
pub(crate) fn normalize_summary(summary: &str) -> Result<String> {
    let trimmed = summary.trim();
    if trimmed.is_empty() {
        return Err(Error::invalid("summary", summary));
    }
    Ok(trimmed.to_string())
}
