// src/deploy/mod.rs

//! Uploading the output tree to a remote store.
//!
//! Transfers run concurrently, at most `parallel` at a time. A file is only
//! uploaded when the remote copy is missing or older than the local one, and
//! the first failed transfer aborts everything still queued or in flight.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::SystemTime;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::config::model::DeploySection;
use crate::errors::{PipelineError, Result};
use crate::fileset::FileRef;
use crate::fs::FileSystem;

pub mod remote;

pub use remote::{DirectoryRemote, MemoryRemote};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Where and how to connect for deployment.
#[derive(Clone)]
pub struct ConnectionDescriptor {
    pub host: String,
    pub user: String,
    pub password: String,
    pub parallel: usize,
    pub remote_root: String,
}

impl fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionDescriptor")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"***")
            .field("parallel", &self.parallel)
            .field("remote_root", &self.remote_root)
            .finish()
    }
}

impl From<&DeploySection> for ConnectionDescriptor {
    fn from(section: &DeploySection) -> Self {
        Self {
            host: section.host.clone(),
            user: section.user.clone(),
            password: section.password.clone(),
            parallel: section.parallel,
            remote_root: section.remote_root.clone(),
        }
    }
}

/// A place files can be uploaded to.
///
/// Paths are `/`-separated and relative to the store's root.
pub trait RemoteStore: Send + Sync + fmt::Debug {
    /// Modification time of the remote copy, `None` if it does not exist.
    fn modified<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<Option<SystemTime>>>;

    /// Store `contents` at `path`, stamping it with `modified` when known so
    /// later comparisons see the local time.
    fn upload<'a>(
        &'a self,
        path: &'a str,
        contents: Vec<u8>,
        modified: Option<SystemTime>,
    ) -> BoxFuture<'a, Result<()>>;
}

/// Open the store a descriptor points at.
///
/// `host` may be a plain directory path, a `file://` URL, or `memory:` for a
/// throwaway in-process store. Network transports are not built in; mount the
/// server locally and point `host` at the mount.
pub fn connect(desc: &ConnectionDescriptor) -> Result<Arc<dyn RemoteStore>> {
    let host = desc.host.trim();
    if host == "memory:" {
        return Ok(Arc::new(MemoryRemote::new()));
    }
    if let Some(path) = host.strip_prefix("file://") {
        return Ok(Arc::new(DirectoryRemote::new(path)));
    }
    if let Some((scheme, _)) = host.split_once("://") {
        return Err(PipelineError::Connection(format!(
            "unsupported transport '{scheme}' for host '{host}'; mount the server and use a file:// host"
        )));
    }
    Ok(Arc::new(DirectoryRemote::new(host)))
}

/// Outcome of a deployment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeployReport {
    pub uploaded: Vec<String>,
    pub skipped: Vec<String>,
}

enum Transfer {
    Uploaded(String),
    Skipped(String),
}

/// `remote_root` joined with a local relative path, `/`-separated.
pub fn remote_path(remote_root: &str, relative: &std::path::Path) -> String {
    let rel = relative.to_string_lossy().replace('\\', "/");
    let root = remote_root.trim_end_matches('/');
    if root.is_empty() {
        rel
    } else {
        format!("{root}/{rel}")
    }
}

/// Upload every file in `files` that is newer than its remote copy.
///
/// Contents are read from `fs` only once a file is known to need uploading.
pub async fn deploy_files(
    remote: Arc<dyn RemoteStore>,
    desc: &ConnectionDescriptor,
    fs: Arc<dyn FileSystem>,
    files: Vec<FileRef>,
) -> Result<DeployReport> {
    let semaphore = Arc::new(Semaphore::new(desc.parallel.max(1)));
    let mut in_flight: JoinSet<Result<Transfer>> = JoinSet::new();
    let mut report = DeployReport::default();

    info!(
        host = %desc.host,
        files = files.len(),
        parallel = desc.parallel,
        "deploying"
    );

    for file in files {
        // Wait for a free slot, handling finished transfers first so a
        // failure stops the queue before anything else is started.
        let permit = loop {
            tokio::select! {
                biased;
                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    if let Err(e) = record(&mut report, joined) {
                        in_flight.abort_all();
                        return Err(e);
                    }
                }
                permit = semaphore.clone().acquire_owned() => {
                    break permit.map_err(|e| PipelineError::Connection(e.to_string()))?;
                }
            }
        };

        let remote = Arc::clone(&remote);
        let fs = Arc::clone(&fs);
        let path = remote_path(&desc.remote_root, &file.relative);
        in_flight.spawn(async move {
            let _permit = permit;
            let remote_mtime = remote.modified(&path).await?;
            let newer = match (file.modified, remote_mtime) {
                (_, None) => true,
                (None, Some(_)) => true,
                (Some(local), Some(theirs)) => local > theirs,
            };
            if !newer {
                debug!(path = %path, "remote copy is up to date");
                return Ok(Transfer::Skipped(path));
            }
            let source = file.source.clone();
            let contents = tokio::task::spawn_blocking(move || fs.read(&source))
                .await
                .map_err(|e| PipelineError::Other(e.into()))??;
            remote.upload(&path, contents, file.modified).await?;
            debug!(path = %path, "uploaded");
            Ok(Transfer::Uploaded(path))
        });
    }

    while let Some(joined) = in_flight.join_next().await {
        if let Err(e) = record(&mut report, joined) {
            in_flight.abort_all();
            return Err(e);
        }
    }

    report.uploaded.sort();
    report.skipped.sort();
    info!(
        uploaded = report.uploaded.len(),
        skipped = report.skipped.len(),
        "deploy finished"
    );
    Ok(report)
}

fn record(
    report: &mut DeployReport,
    joined: std::result::Result<Result<Transfer>, tokio::task::JoinError>,
) -> Result<()> {
    match joined {
        Ok(Ok(Transfer::Uploaded(path))) => report.uploaded.push(path),
        Ok(Ok(Transfer::Skipped(path))) => report.skipped.push(path),
        Ok(Err(e)) => {
            warn!(error = %e, "transfer failed; aborting remaining uploads");
            return Err(e);
        }
        Err(e) => {
            return Err(PipelineError::Connection(format!("transfer task failed: {e}")));
        }
    }
    Ok(())
}
