// src/engine/runner.rs

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::engine::watch_loop::{self, WatchSetup};
use crate::errors::{PipelineError, TaskFailure};
use crate::exec::TaskExecutor;
use crate::graph::TaskGraph;
use crate::notifier::{LogNotifier, Notifier};
use crate::reload::{ReloadHub, ReloadSignal};

type NodeFuture = Pin<Box<dyn Future<Output = Result<(), TaskFailure>> + Send>>;

/// State shared by every branch of a running graph.
pub(crate) struct Shared<E> {
    pub(crate) executor: E,
    pub(crate) notifier: Arc<dyn Notifier>,
    pub(crate) reload: ReloadHub,
    pub(crate) watch: Option<WatchSetup>,
}

/// Executes task graphs.
///
/// - `Series` runs children in order and stops at the first failure.
/// - `Parallel` starts all children at once, waits for all of them, and
///   reports the first failure it observed.
/// - `Watch` leaves hand over to the watch loop, which only returns once its
///   change source closes.
///
/// A graph that contains a watch leaf is an interactive session: a transform
/// failure (bad Sass, a broken include) is notified and the task counts as
/// finished, so the session still reaches its watcher. Other errors stay
/// fatal, and graphs without a watch leaf are fail-fast throughout.
pub struct Runner<E: TaskExecutor + 'static> {
    shared: Arc<Shared<E>>,
}

impl<E: TaskExecutor + 'static> fmt::Debug for Runner<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runner")
            .field("notifier", &self.shared.notifier)
            .field("watch", &self.shared.watch.is_some())
            .finish_non_exhaustive()
    }
}

impl<E: TaskExecutor + 'static> Runner<E> {
    pub fn new(executor: E) -> Self {
        Self::with_parts(executor, Arc::new(LogNotifier), ReloadHub::default(), None)
    }

    pub fn with_parts(
        executor: E,
        notifier: Arc<dyn Notifier>,
        reload: ReloadHub,
        watch: Option<WatchSetup>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                executor,
                notifier,
                reload,
                watch,
            }),
        }
    }

    pub fn reload_hub(&self) -> &ReloadHub {
        &self.shared.reload
    }

    pub async fn run(&self, graph: &TaskGraph) -> Result<(), TaskFailure> {
        info!(graph = %graph, "running");
        let started = Instant::now();
        let interactive = graph.contains_watch();
        let result = run_node(Arc::clone(&self.shared), graph.clone(), interactive).await;
        match &result {
            Ok(()) => info!(elapsed_ms = started.elapsed().as_millis() as u64, "finished"),
            Err(failure) => warn!(task = %failure.task, "stopped after failure"),
        }
        result
    }
}

fn run_node<E: TaskExecutor + 'static>(
    shared: Arc<Shared<E>>,
    node: TaskGraph,
    interactive: bool,
) -> NodeFuture {
    Box::pin(async move {
        match node {
            TaskGraph::Task(name) => match run_task(&shared, &name).await {
                Err(failure) if interactive && failure.error.is_transform() => {
                    warn!(task = %failure.task, "task failed; continuing to watch");
                    Ok(())
                }
                other => other,
            },
            TaskGraph::Watch(name) => watch_loop::run(Arc::clone(&shared), &name).await,
            TaskGraph::Series(children) => {
                for child in children {
                    run_node(Arc::clone(&shared), child, interactive).await?;
                }
                Ok(())
            }
            TaskGraph::Parallel(children) => {
                let mut set = JoinSet::new();
                for child in children {
                    set.spawn(run_node(Arc::clone(&shared), child, interactive));
                }

                let mut first_failure = None;
                while let Some(joined) = set.join_next().await {
                    let result = joined.unwrap_or_else(|e| {
                        Err(TaskFailure::new(
                            "<parallel>",
                            PipelineError::Other(anyhow::anyhow!("branch aborted: {e}")),
                        ))
                    });
                    if let Err(failure) = result {
                        debug!(task = %failure.task, "parallel branch failed");
                        first_failure.get_or_insert(failure);
                    }
                }
                first_failure.map_or(Ok(()), Err)
            }
        }
    })
}

/// Run one task: log it, notify on failure, publish a reload on success.
pub(crate) async fn run_task<E: TaskExecutor>(shared: &Shared<E>, name: &str) -> Result<(), TaskFailure> {
    info!(task = %name, "starting task");
    let started = Instant::now();

    match shared.executor.execute(name).await {
        Ok(report) => {
            info!(
                task = %name,
                files = report.written.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "finished task"
            );
            if !report.written.is_empty() {
                shared.reload.publish(ReloadSignal {
                    task: name.to_string(),
                    files: report.written,
                });
            }
            Ok(())
        }
        Err(error) => {
            if shared.executor.notifies(name) {
                shared.notifier.notify(name, &error);
            } else {
                warn!(task = %name, error = %error, "task failed");
            }
            Err(TaskFailure::new(name, error))
        }
    }
}
