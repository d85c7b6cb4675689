// src/reload.rs

//! Live-reload signals.
//!
//! After a task finishes writing output, the runner publishes a
//! [`ReloadSignal`] on the [`ReloadHub`]. Anything that serves the output tree
//! can subscribe and push the change to connected viewers; without
//! subscribers publishing is a no-op.

use std::path::PathBuf;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::types::TaskName;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReloadSignal {
    pub task: TaskName,
    pub files: Vec<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ReloadHub {
    tx: broadcast::Sender<ReloadSignal>,
}

impl Default for ReloadHub {
    fn default() -> Self {
        Self::new(64)
    }
}

impl ReloadHub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadSignal> {
        self.tx.subscribe()
    }

    /// Returns the number of subscribers that will see the signal.
    pub fn publish(&self, signal: ReloadSignal) -> usize {
        match self.tx.send(signal) {
            Ok(n) => n,
            Err(_) => {
                debug!("no reload subscribers");
                0
            }
        }
    }
}

/// Subscribe a listener that logs every reload signal.
pub fn spawn_log_listener(hub: &ReloadHub) -> JoinHandle<()> {
    let mut rx = hub.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(signal) => {
                    info!(task = %signal.task, files = signal.files.len(), "reload");
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "reload listener lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}
