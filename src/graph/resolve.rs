// src/graph/resolve.rs

use crate::config::model::{ConfigFile, GraphSpec};
use crate::errors::{PipelineError, Result};
use crate::graph::TaskGraph;
use crate::types::{BuildProfile, TaskKind};

/// A CLI target turned into something runnable.
#[derive(Debug, Clone)]
pub struct ResolvedTarget {
    pub graph: TaskGraph,
    pub profile: BuildProfile,
}

/// Resolve a CLI target: a `[command.<name>]` or, failing that, a single task.
///
/// Names inside command graphs resolve to tasks first and to other commands
/// second. The validated config guarantees the expansion terminates.
pub fn resolve_target(cfg: &ConfigFile, name: &str) -> Result<ResolvedTarget> {
    if let Some(command) = cfg.command.get(name) {
        let children = command
            .graph
            .iter()
            .map(|node| resolve_node(cfg, node))
            .collect::<Result<Vec<_>>>()?;

        let profile = if command.production {
            BuildProfile::Production
        } else {
            BuildProfile::Development
        };

        return Ok(ResolvedTarget {
            graph: TaskGraph::Series(children),
            profile,
        });
    }

    if cfg.task.contains_key(name) {
        return Ok(ResolvedTarget {
            graph: leaf(cfg, name),
            profile: BuildProfile::Development,
        });
    }

    Err(PipelineError::TaskNotFound(format!(
        "no command or task named '{name}'"
    )))
}

fn resolve_node(cfg: &ConfigFile, node: &GraphSpec) -> Result<TaskGraph> {
    match node {
        GraphSpec::Name(name) if cfg.task.contains_key(name) => Ok(leaf(cfg, name)),
        GraphSpec::Name(name) => {
            let command = cfg.command.get(name).ok_or_else(|| {
                PipelineError::TaskNotFound(format!("no command or task named '{name}'"))
            })?;
            let children = command
                .graph
                .iter()
                .map(|child| resolve_node(cfg, child))
                .collect::<Result<Vec<_>>>()?;
            Ok(TaskGraph::Series(children))
        }
        GraphSpec::Series { series } => Ok(TaskGraph::Series(
            series
                .iter()
                .map(|child| resolve_node(cfg, child))
                .collect::<Result<Vec<_>>>()?,
        )),
        GraphSpec::Parallel { parallel } => Ok(TaskGraph::Parallel(
            parallel
                .iter()
                .map(|child| resolve_node(cfg, child))
                .collect::<Result<Vec<_>>>()?,
        )),
    }
}

fn leaf(cfg: &ConfigFile, name: &str) -> TaskGraph {
    match cfg.task.get(name).map(|t| t.kind) {
        Some(TaskKind::Watch) => TaskGraph::Watch(name.to_string()),
        _ => TaskGraph::Task(name.to_string()),
    }
}
