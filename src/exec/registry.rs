// src/exec/registry.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::config::model::ConfigFile;
use crate::deploy::ConnectionDescriptor;
use crate::fileset::SourceSpec;
use crate::stages::PlannedStage;
use crate::types::{TaskKind, TaskName};

/// A task with every path resolved and every stage compiled.
#[derive(Debug)]
pub struct TaskSpec {
    pub name: TaskName,
    pub kind: TaskKind,
    pub source: SourceSpec,
    /// Output directory (pipeline), directory to empty (clean).
    pub dest_dir: PathBuf,
    pub stages: Vec<PlannedStage>,
    pub notify: bool,
}

/// All tasks of a loaded config, keyed by name.
#[derive(Debug)]
pub struct TaskRegistry {
    src_root: PathBuf,
    dest_root: PathBuf,
    deploy: Option<ConnectionDescriptor>,
    tasks: BTreeMap<TaskName, TaskSpec>,
}

impl TaskRegistry {
    /// Build the registry; `project_root` is the directory holding the
    /// config file, against which `[config].src` and `dest` resolve.
    pub fn from_config(cfg: &ConfigFile, project_root: &Path) -> anyhow::Result<Self> {
        let src_root = join_root(project_root, &cfg.config.src);
        let dest_root = join_root(project_root, &cfg.config.dest);

        let mut tasks = BTreeMap::new();
        for (name, task) in cfg.tasks().iter() {
            let stages = task
                .stages
                .iter()
                .map(PlannedStage::compile)
                .collect::<anyhow::Result<Vec<_>>>()
                .with_context(|| format!("compiling stages of task '{name}'"))?;

            let source = match task.kind {
                TaskKind::Deploy => SourceSpec {
                    root: dest_root.clone(),
                    patterns: if task.src.is_empty() {
                        vec!["**".to_string()]
                    } else {
                        task.src.clone()
                    },
                    exclude: task.exclude.clone(),
                    base: Some(String::new()),
                },
                _ => SourceSpec {
                    root: src_root.clone(),
                    patterns: task.src.clone(),
                    exclude: task.exclude.clone(),
                    base: task.base.clone(),
                },
            };

            tasks.insert(
                name.clone(),
                TaskSpec {
                    name: name.clone(),
                    kind: task.kind,
                    source,
                    dest_dir: join_root(&dest_root, task.effective_dest()),
                    stages,
                    notify: task.effective_notify(),
                },
            );
        }

        Ok(Self {
            src_root,
            dest_root,
            deploy: cfg.deploy.as_ref().map(ConnectionDescriptor::from),
            tasks,
        })
    }

    pub fn get(&self, name: &str) -> Option<&TaskSpec> {
        self.tasks.get(name)
    }

    pub fn src_root(&self) -> &Path {
        &self.src_root
    }

    pub fn dest_root(&self) -> &Path {
        &self.dest_root
    }

    pub fn deploy(&self) -> Option<&ConnectionDescriptor> {
        self.deploy.as_ref()
    }
}

/// `root/rel`, or `root` itself when `rel` is empty or `"."`.
fn join_root(root: &Path, rel: &str) -> PathBuf {
    let rel = rel.trim_end_matches('/');
    if rel.is_empty() || rel == "." {
        root.to_path_buf()
    } else if root.as_os_str().is_empty() || root == Path::new(".") {
        PathBuf::from(rel)
    } else {
        root.join(rel)
    }
}
