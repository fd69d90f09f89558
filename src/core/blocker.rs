//! External blockers: things outside the backlog a task is waiting on.
//!
//! A blocker is not a task and has no place in the dependency graph. While
//! it is unresolved the task it is attached to is not ready, whatever the
//! state of its dependencies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::core::task::TaskId;
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BlockerType {
    /// Waiting on data to arrive or be produced.
    Data,
    /// Waiting on someone's sign-off.
    Approval,
    /// Waiting on infrastructure.
    Infra,
    #[default]
    External,
}

impl BlockerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockerType::Data => "data",
            BlockerType::Approval => "approval",
            BlockerType::Infra => "infra",
            BlockerType::External => "external",
        }
    }
}

impl std::fmt::Display for BlockerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BlockerType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "data" => Ok(BlockerType::Data),
            "approval" => Ok(BlockerType::Approval),
            "infra" => Ok(BlockerType::Infra),
            "external" => Ok(BlockerType::External),
            other => Err(Error::invalid("blocker_type", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExternalBlocker {
    pub id: i64,
    pub task_id: TaskId,
    pub description: String,
    pub blocker_type: BlockerType,
    pub is_resolved: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ExternalBlocker {
    /// Unresolved blockers hold their task back.
    pub fn is_open(&self) -> bool {
        !self.is_resolved
    }
}
