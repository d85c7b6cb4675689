// src/exec/backend.rs

//! Pluggable task executor abstraction.
//!
//! The runner talks to a [`TaskExecutor`] instead of reading files itself.
//! [`PipelineExecutor`] is the production implementation; tests swap in a
//! fake that records invocations and simulates failures or slow tasks.

use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

use tracing::info;

use crate::deploy::{self, RemoteStore};
use crate::errors::{PipelineError, Result};
use crate::exec::registry::TaskRegistry;
use crate::exec::{clean, pipeline};
use crate::fileset::list_matches;
use crate::fs::FileSystem;
use crate::types::{BuildProfile, TaskKind};

/// What a finished task produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskReport {
    pub task: String,
    /// Files written (pipeline), uploaded (deploy); empty for clean.
    pub written: Vec<PathBuf>,
}

impl TaskReport {
    pub fn new(task: impl Into<String>, written: Vec<PathBuf>) -> Self {
        Self {
            task: task.into(),
            written,
        }
    }
}

/// Trait abstracting how a single named task is executed.
///
/// Executors are shared across concurrently running tasks, so `execute`
/// takes `&self`.
pub trait TaskExecutor: Send + Sync {
    fn execute<'a>(
        &'a self,
        task: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<TaskReport>> + Send + 'a>>;

    /// Whether failures of `task` go to the notifier. Defaults to yes.
    fn notifies(&self, _task: &str) -> bool {
        true
    }
}

/// Executor that runs configured tasks against a [`FileSystem`].
pub struct PipelineExecutor {
    registry: Arc<TaskRegistry>,
    fs: Arc<dyn FileSystem>,
    profile: BuildProfile,
    remote: Option<Arc<dyn RemoteStore>>,
}

impl fmt::Debug for PipelineExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineExecutor")
            .field("profile", &self.profile)
            .field("fs", &self.fs)
            .finish_non_exhaustive()
    }
}

impl PipelineExecutor {
    pub fn new(registry: Arc<TaskRegistry>, fs: Arc<dyn FileSystem>, profile: BuildProfile) -> Self {
        Self {
            registry,
            fs,
            profile,
            remote: None,
        }
    }

    /// Deploy into `remote` instead of connecting through `[deploy].host`.
    pub fn with_remote(mut self, remote: Arc<dyn RemoteStore>) -> Self {
        self.remote = Some(remote);
        self
    }

    async fn run(&self, name: &str) -> Result<TaskReport> {
        let spec = self
            .registry
            .get(name)
            .ok_or_else(|| PipelineError::TaskNotFound(name.to_string()))?;

        match spec.kind {
            TaskKind::Pipeline => {
                pipeline::run_pipeline(spec, self.registry.src_root(), self.fs.clone(), self.profile)
                    .await
            }
            TaskKind::Clean => clean::run_clean(spec, self.registry.dest_root(), self.fs.clone()).await,
            TaskKind::Deploy => self.run_deploy(name).await,
            TaskKind::Watch => Err(PipelineError::ConfigError(format!(
                "watch task '{name}' cannot be executed as a build step"
            ))),
        }
    }

    async fn run_deploy(&self, name: &str) -> Result<TaskReport> {
        let spec = self
            .registry
            .get(name)
            .ok_or_else(|| PipelineError::TaskNotFound(name.to_string()))?;
        let desc = self.registry.deploy().cloned().ok_or_else(|| {
            PipelineError::ConfigError(format!("task '{name}' needs a [deploy] section"))
        })?;

        let remote = match &self.remote {
            Some(remote) => Arc::clone(remote),
            None => deploy::connect(&desc)?,
        };

        let fs = self.fs.clone();
        let source = spec.source.clone();
        let files = tokio::task::spawn_blocking(move || list_matches(fs.as_ref(), &source))
            .await
            .map_err(|e| PipelineError::Other(e.into()))??;

        info!(task = %name, files = files.len(), "collected output for deploy");
        let report = deploy::deploy_files(remote, &desc, self.fs.clone(), files).await?;
        Ok(TaskReport::new(
            name,
            report.uploaded.into_iter().map(PathBuf::from).collect(),
        ))
    }
}

impl TaskExecutor for PipelineExecutor {
    fn execute<'a>(
        &'a self,
        task: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<TaskReport>> + Send + 'a>> {
        Box::pin(self.run(task))
    }

    fn notifies(&self, task: &str) -> bool {
        self.registry.get(task).is_none_or(|spec| spec.notify)
    }
}
