// src/engine/watch_loop.rs

//! Async shell around [`WatchDispatcher`].
//!
//! Reads change batches from the file watcher (or an injected channel),
//! debounces them, applies `use_hash` checks, and runs bound tasks through
//! the same path as one-shot builds. Task failures are logged and notified;
//! they never end the loop.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::{Id, JoinSet};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::engine::runner::{run_task, Shared};
use crate::errors::{PipelineError, TaskFailure};
use crate::exec::TaskExecutor;
use crate::fs::FileSystem;
use crate::reload::spawn_log_listener;
use crate::types::TaskName;
use crate::watch::hash::{compute_rule_hash, HashMemo};
use crate::watch::path_utils::relative_str;
use crate::watch::{spawn_watcher, WatchDispatcher, WatchRule};

type ChangeRx = mpsc::UnboundedReceiver<Vec<PathBuf>>;

/// Everything the watch loop needs besides the executor.
pub struct WatchSetup {
    pub root: PathBuf,
    pub rules: Vec<WatchRule>,
    pub debounce: Duration,
    pub fs: Arc<dyn FileSystem>,
    pub live_reload: bool,
    changes: Mutex<Option<ChangeRx>>,
}

impl fmt::Debug for WatchSetup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchSetup")
            .field("root", &self.root)
            .field("rules", &self.rules)
            .field("debounce", &self.debounce)
            .field("live_reload", &self.live_reload)
            .finish_non_exhaustive()
    }
}

impl WatchSetup {
    /// Watch `root` on the real filesystem.
    pub fn new(
        root: impl Into<PathBuf>,
        rules: Vec<WatchRule>,
        debounce: Duration,
        fs: Arc<dyn FileSystem>,
    ) -> Self {
        Self {
            root: root.into(),
            rules,
            debounce,
            fs,
            live_reload: false,
            changes: Mutex::new(None),
        }
    }

    pub fn with_live_reload(mut self, live_reload: bool) -> Self {
        self.live_reload = live_reload;
        self
    }

    /// Take change batches from `rx` instead of starting a file watcher.
    /// Paths must be under `root`.
    pub fn with_change_source(self, rx: ChangeRx) -> Self {
        *self.changes.lock().unwrap_or_else(PoisonError::into_inner) = Some(rx);
        self
    }

    fn take_change_source(&self) -> Option<ChangeRx> {
        self.changes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

pub(crate) async fn run<E: TaskExecutor + 'static>(
    shared: Arc<Shared<E>>,
    name: &str,
) -> Result<(), TaskFailure> {
    let Some(setup) = shared.watch.as_ref() else {
        return Err(TaskFailure::new(
            name,
            PipelineError::ConfigError("watch mode is not set up".to_string()),
        ));
    };

    let (_handle, mut changes, root) = match setup.take_change_source() {
        Some(rx) => (None, rx, setup.root.clone()),
        None => {
            let (handle, rx) = spawn_watcher(&setup.root)
                .map_err(|e| TaskFailure::new(name, PipelineError::Other(e)))?;
            let root = handle.root().clone();
            (Some(handle), rx, root)
        }
    };

    let reload_listener = setup.live_reload.then(|| spawn_log_listener(&shared.reload));

    let mut dispatcher = WatchDispatcher::new(setup.rules.clone());
    let mut memo = HashMemo::new();
    seed_hashes(setup, &root, &mut memo).await;

    info!(task = %name, rules = setup.rules.len(), "watching for changes");

    let mut batch: BTreeSet<TaskName> = BTreeSet::new();
    let mut deadline: Option<Instant> = None;
    let mut running = Running::default();

    loop {
        tokio::select! {
            maybe = changes.recv() => {
                let Some(paths) = maybe else {
                    info!("change source closed; stopping watch");
                    break;
                };
                let rels: Vec<String> = paths
                    .iter()
                    .filter_map(|p| {
                        let rel = relative_str(&root, p);
                        if rel.is_none() {
                            debug!(path = ?p, "change outside watch root ignored");
                        }
                        rel
                    })
                    .collect();
                let tasks = dispatcher.tasks_for_paths(rels.iter().map(String::as_str));
                if !tasks.is_empty() {
                    batch.extend(tasks);
                    deadline.get_or_insert_with(|| Instant::now() + setup.debounce);
                }
            }
            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                deadline = None;
                let triggered = std::mem::take(&mut batch);
                let triggered = drop_unchanged(setup, &root, triggered, &mut memo).await;
                for task in dispatcher.trigger(triggered) {
                    running.spawn(&shared, task);
                }
            }
            Some(joined) = running.set.join_next_with_id(), if !running.set.is_empty() => {
                // A panicked run frees its task just like a failed one.
                let finished = match joined {
                    Ok((id, (task, result))) => {
                        if let Err(failure) = result {
                            warn!(task = %failure.task, "task failed; still watching");
                        }
                        running.tasks.remove(&id);
                        Some(task)
                    }
                    Err(e) => {
                        let task = running.tasks.remove(&e.id());
                        warn!(task = ?task, error = %e, "watch-triggered task aborted; still watching");
                        task
                    }
                };
                if let Some(again) = finished.and_then(|task| dispatcher.complete(&task)) {
                    running.spawn(&shared, again);
                }
            }
        }
    }

    while running.set.join_next().await.is_some() {}
    if let Some(listener) = reload_listener {
        listener.abort();
    }
    Ok(())
}

/// Watch-triggered runs in flight, with the task each Tokio task belongs to.
#[derive(Default)]
struct Running {
    set: JoinSet<(TaskName, Result<(), TaskFailure>)>,
    tasks: HashMap<Id, TaskName>,
}

impl Running {
    fn spawn<E: TaskExecutor + 'static>(&mut self, shared: &Arc<Shared<E>>, task: TaskName) {
        let shared = Arc::clone(shared);
        let name = task.clone();
        let handle = self.set.spawn(async move {
            let result = run_task(&shared, &task).await;
            (task, result)
        });
        self.tasks.insert(handle.id(), name);
    }
}

async fn rule_hash(setup: &WatchSetup, root: &Path, task: &str) -> Option<anyhow::Result<String>> {
    let rules: Vec<WatchRule> = setup
        .rules
        .iter()
        .filter(|r| r.task() == task && r.use_hash())
        .cloned()
        .collect();
    if rules.is_empty() {
        return None;
    }

    let fs = Arc::clone(&setup.fs);
    let root = root.to_path_buf();
    let joined = tokio::task::spawn_blocking(move || {
        let mut combined = String::new();
        for rule in rules.iter() {
            combined.push_str(&compute_rule_hash(fs.as_ref(), &root, rule)?);
        }
        Ok::<_, anyhow::Error>(combined)
    })
    .await;
    Some(joined.unwrap_or_else(|e| Err(anyhow::anyhow!("hashing task aborted: {e}"))))
}

async fn seed_hashes(setup: &WatchSetup, root: &Path, memo: &mut HashMemo) {
    let tasks: BTreeSet<&str> = setup
        .rules
        .iter()
        .filter(|r| r.use_hash())
        .map(|r| r.task())
        .collect();
    for task in tasks {
        match rule_hash(setup, root, task).await {
            Some(Ok(hash)) => memo.seed(task, hash),
            Some(Err(e)) => warn!(task = %task, error = %e, "could not seed content hash"),
            None => {}
        }
    }
}

/// Remove `use_hash` tasks whose watched content is unchanged.
async fn drop_unchanged(
    setup: &WatchSetup,
    root: &Path,
    triggered: BTreeSet<TaskName>,
    memo: &mut HashMemo,
) -> Vec<TaskName> {
    let mut keep = Vec::with_capacity(triggered.len());
    for task in triggered {
        match rule_hash(setup, root, &task).await {
            None => keep.push(task),
            Some(Ok(hash)) => {
                if memo.record(&task, hash) {
                    keep.push(task);
                }
            }
            Some(Err(e)) => {
                warn!(task = %task, error = %e, "hashing failed; running anyway");
                keep.push(task);
            }
        }
    }
    keep
}
