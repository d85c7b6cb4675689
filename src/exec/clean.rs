// src/exec/clean.rs

use std::path::{Component, Path};
use std::sync::Arc;

use tracing::info;

use crate::errors::{PipelineError, Result};
use crate::exec::backend::TaskReport;
use crate::exec::registry::TaskSpec;
use crate::fs::FileSystem;

/// Empty the task's directory, keeping the directory itself.
///
/// Refuses to touch anything outside the output root.
pub async fn run_clean(spec: &TaskSpec, dest_root: &Path, fs: Arc<dyn FileSystem>) -> Result<TaskReport> {
    let target = spec.dest_dir.clone();
    let inside = target
        .strip_prefix(dest_root)
        .is_ok_and(|rel| rel.components().all(|c| c != Component::ParentDir));
    if !inside {
        return Err(PipelineError::ConfigError(format!(
            "clean task '{}' targets {:?}, outside the output root {:?}",
            spec.name, target, dest_root
        )));
    }

    let dir = target.clone();
    tokio::task::spawn_blocking(move || fs.remove_dir_contents(&dir))
        .await
        .map_err(|e| PipelineError::Other(e.into()))??;

    info!(task = %spec.name, dir = ?target, "cleaned");
    Ok(TaskReport::new(spec.name.clone(), Vec::new()))
}
