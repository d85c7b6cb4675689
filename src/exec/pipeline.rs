// src/exec/pipeline.rs

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use crate::errors::{PipelineError, Result};
use crate::exec::backend::TaskReport;
use crate::exec::registry::TaskSpec;
use crate::fileset::{gather, materialize};
use crate::fs::FileSystem;
use crate::stages::{apply_all, StageContext};
use crate::types::BuildProfile;

/// Gather sources, run the stages enabled for `profile`, write the result.
///
/// Each invocation owns its file set, so concurrent pipeline tasks with
/// disjoint outputs never interfere.
pub async fn run_pipeline(
    spec: &TaskSpec,
    src_root: &Path,
    fs: Arc<dyn FileSystem>,
    profile: BuildProfile,
) -> Result<TaskReport> {
    let started = Instant::now();

    let source = spec.source.clone();
    let gather_fs = Arc::clone(&fs);
    let files = tokio::task::spawn_blocking(move || gather(gather_fs.as_ref(), &source))
        .await
        .map_err(|e| PipelineError::Other(e.into()))??;
    debug!(task = %spec.name, files = files.len(), "sources gathered");

    let ctx = StageContext {
        task: spec.name.clone(),
        src_root: src_root.to_path_buf(),
        fs: Arc::clone(&fs),
    };
    let files = apply_all(&spec.stages, profile, files, &ctx).await?;

    let dest = spec.dest_dir.clone();
    let written = tokio::task::spawn_blocking(move || materialize(fs.as_ref(), &dest, &files))
        .await
        .map_err(|e| PipelineError::Other(e.into()))??;

    info!(
        task = %spec.name,
        written = written.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "pipeline finished"
    );
    Ok(TaskReport::new(spec.name.clone(), written))
}
