use thiserror::Error;

use crate::core::task::TaskId;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("No home directory")]
    NoHomeDir,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Task {0} cannot depend on itself")]
    SelfDependency(TaskId),

    #[error("Adding dependency {task} -> {depends_on} would create a cycle")]
    CycleDetected { task: TaskId, depends_on: TaskId },

    #[error("Unknown task: {0}")]
    UnknownTask(TaskId),

    #[error("No dependency {task} -> {depends_on}")]
    EdgeNotFound { task: TaskId, depends_on: TaskId },

    #[error("Invalid {field}: {value}")]
    InvalidAttribute { field: &'static str, value: String },

    #[error("Duplicate of task {existing} (similarity {score:.2})")]
    DuplicateRejected { existing: TaskId, score: f64 },

    #[error("Task not found: {0}")]
    TaskNotFound(TaskId),

    #[error("Criterion not found: {0}")]
    CriterionNotFound(i64),

    #[error("Blocker not found: {0}")]
    BlockerNotFound(i64),

    #[error("Invalid status transition for task {id} from {from} to {to}")]
    InvalidTransition { id: TaskId, from: String, to: String },
}

impl Error {
    pub(crate) fn invalid(field: &'static str, value: impl Into<String>) -> Self {
        Error::InvalidAttribute {
            field,
            value: value.into(),
        }
    }

    /// Process exit code for a CLI boundary.
    ///
    /// `1` means the caller asked for something the backlog refuses (a
    /// constraint violation or a duplicate); `2` means the engine itself
    /// could not answer. Callers must not retry on `1`.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::SelfDependency(_)
            | Error::CycleDetected { .. }
            | Error::UnknownTask(_)
            | Error::EdgeNotFound { .. }
            | Error::InvalidAttribute { .. }
            | Error::DuplicateRejected { .. }
            | Error::TaskNotFound(_)
            | Error::CriterionNotFound(_)
            | Error::BlockerNotFound(_)
            | Error::InvalidTransition { .. } => 1,
            Error::Io(_)
            | Error::Database(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::TomlSerialize(_)
            | Error::NoHomeDir
            | Error::Config(_) => 2,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
