// src/watch/watcher.rs

use std::path::PathBuf;

use anyhow::{Context, Result};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Handle for the filesystem watcher.
///
/// Keeps the underlying `RecommendedWatcher` alive; dropping the handle stops
/// file watching and closes the change channel.
pub struct WatcherHandle {
    root: PathBuf,
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl WatcherHandle {
    /// Canonical root that event paths are reported under.
    pub fn root(&self) -> &PathBuf {
        &self.root
    }
}

/// Watch `root` recursively and forward the paths of every content-changing
/// event (create, modify, remove) over the returned channel.
///
/// Access events are dropped here; matching against watch rules happens in
/// the dispatch loop.
pub fn spawn_watcher(
    root: impl Into<PathBuf>,
) -> Result<(WatcherHandle, mpsc::UnboundedReceiver<Vec<PathBuf>>)> {
    let root = root.into();
    let root = root.canonicalize().unwrap_or_else(|_| root.clone());

    let (tx, rx) = mpsc::unbounded_channel::<Vec<PathBuf>>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if !is_content_event(&event.kind) || event.paths.is_empty() {
                    return;
                }
                // The receiver is gone once the dispatch loop ends.
                let _ = tx.send(event.paths);
            }
            Err(err) => {
                eprintln!("sitepipe: file watch error: {err}");
            }
        },
        Config::default(),
    )
    .context("creating file watcher")?;

    watcher
        .watch(&root, RecursiveMode::Recursive)
        .with_context(|| format!("watching {:?}", root))?;

    info!("file watcher started on {:?}", root);
    debug!("forwarding create/modify/remove events");

    Ok((
        WatcherHandle {
            root,
            _inner: watcher,
        },
        rx,
    ))
}

fn is_content_event(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) | EventKind::Any
    )
}
