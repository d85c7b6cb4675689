// src/errors.rs

//! Crate-wide error types.
//!
//! [`PipelineError`] covers both config-time problems (bad TOML, unknown task
//! references, command cycles) and run-time task failures. The three run-time
//! kinds that matter to callers are:
//!
//! - [`PipelineError::Transform`]: a stage could not process a file.
//! - [`PipelineError::Io`] / [`PipelineError::Other`]: reading or writing failed.
//! - [`PipelineError::Connection`]: the deploy transport failed.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::TaskName;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Cycle detected in command graph: {0}")]
    GraphCycle(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("{stage} failed on {}: {message}", .file.display())]
    Transform {
        stage: &'static str,
        file: PathBuf,
        message: String,
    },

    #[error("Connection error: {0}")]
    Connection(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PipelineError {
    pub fn transform(
        stage: &'static str,
        file: impl Into<PathBuf>,
        message: impl Into<String>,
    ) -> Self {
        PipelineError::Transform {
            stage,
            file: file.into(),
            message: message.into(),
        }
    }

    /// True for failures caused by file content rather than the environment.
    pub fn is_transform(&self) -> bool {
        matches!(self, PipelineError::Transform { .. })
    }
}

/// A task in a graph failed; carries the task name and the underlying error.
#[derive(Error, Debug)]
#[error("task '{task}' failed: {error}")]
pub struct TaskFailure {
    pub task: TaskName,
    #[source]
    pub error: PipelineError,
}

impl TaskFailure {
    pub fn new(task: impl Into<TaskName>, error: PipelineError) -> Self {
        Self {
            task: task.into(),
            error,
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, PipelineError>;
