// src/deploy/remote.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

use crate::deploy::{BoxFuture, RemoteStore};
use crate::errors::{PipelineError, Result};

/// A directory on a locally mounted filesystem.
#[derive(Debug, Clone)]
pub struct DirectoryRemote {
    root: PathBuf,
}

impl DirectoryRemote {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn target(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }
}

impl RemoteStore for DirectoryRemote {
    fn modified<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<Option<SystemTime>>> {
        Box::pin(async move {
            match tokio::fs::metadata(self.target(path)).await {
                Ok(meta) => meta
                    .modified()
                    .map(Some)
                    .map_err(|e| PipelineError::Connection(format!("stat {path}: {e}"))),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(PipelineError::Connection(format!("stat {path}: {e}"))),
            }
        })
    }

    fn upload<'a>(
        &'a self,
        path: &'a str,
        contents: Vec<u8>,
        modified: Option<SystemTime>,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let target = self.target(path);
            if let Some(parent) = target.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| PipelineError::Connection(format!("mkdir for {path}: {e}")))?;
            }
            tokio::fs::write(&target, contents)
                .await
                .map_err(|e| PipelineError::Connection(format!("upload {path}: {e}")))?;

            let Some(mtime) = modified else {
                return Ok(());
            };
            let stamped = tokio::task::spawn_blocking(move || {
                std::fs::File::options()
                    .write(true)
                    .open(&target)
                    .and_then(|file| file.set_modified(mtime))
            })
            .await
            .map_err(|e| PipelineError::Connection(format!("stamp {path}: {e}")))?;
            stamped.map_err(|e| PipelineError::Connection(format!("stamp {path}: {e}")))
        })
    }
}

/// In-process store, for dry runs and tests. Clones share contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryRemote {
    files: Arc<Mutex<BTreeMap<String, (Vec<u8>, SystemTime)>>>,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, BTreeMap<String, (Vec<u8>, SystemTime)>> {
        self.files.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Pre-populate a remote file with a given modification time.
    pub fn insert(&self, path: impl Into<String>, contents: impl Into<Vec<u8>>, modified: SystemTime) {
        self.entries().insert(path.into(), (contents.into(), modified));
    }

    pub fn contents(&self, path: &str) -> Option<Vec<u8>> {
        self.entries().get(path).map(|(c, _)| c.clone())
    }

    pub fn paths(&self) -> Vec<String> {
        self.entries().keys().cloned().collect()
    }
}

impl RemoteStore for MemoryRemote {
    fn modified<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<Option<SystemTime>>> {
        let mtime = self.entries().get(path).map(|(_, m)| *m);
        Box::pin(async move { Ok(mtime) })
    }

    fn upload<'a>(
        &'a self,
        path: &'a str,
        contents: Vec<u8>,
        modified: Option<SystemTime>,
    ) -> BoxFuture<'a, Result<()>> {
        let mtime = modified.unwrap_or_else(SystemTime::now);
        self.entries().insert(path.to_string(), (contents, mtime));
        Box::pin(async { Ok(()) })
    }
}
