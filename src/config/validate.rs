// src/config/validate.rs

use globset::Glob;
use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{ConfigFile, GraphSpec, RawConfigFile, TaskConfig};
use crate::errors::{PipelineError, Result};
use crate::types::TaskKind;

/// Upper bound for `[config].debounce_ms`; anything longer makes watch mode
/// feel broken.
const MAX_DEBOUNCE_MS: u64 = 10_000;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = PipelineError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_tasks(cfg)?;
    validate_global_config(cfg)?;
    validate_deploy(cfg)?;
    for (name, task) in cfg.task.iter() {
        validate_task(cfg, name, task)?;
    }
    validate_command_references(cfg)?;
    validate_command_graph(cfg)?;
    Ok(())
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(PipelineError::ConfigError(
            "config must contain at least one [task.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.dest.trim().is_empty() {
        return Err(PipelineError::ConfigError(
            "[config].dest must not be empty".to_string(),
        ));
    }

    if cfg.config.debounce_ms > MAX_DEBOUNCE_MS {
        return Err(PipelineError::ConfigError(format!(
            "[config].debounce_ms must be <= {MAX_DEBOUNCE_MS} (got {})",
            cfg.config.debounce_ms
        )));
    }

    Ok(())
}

fn validate_deploy(cfg: &RawConfigFile) -> Result<()> {
    let Some(deploy) = &cfg.deploy else {
        return Ok(());
    };

    if deploy.host.trim().is_empty() {
        return Err(PipelineError::ConfigError(
            "[deploy].host must not be empty".to_string(),
        ));
    }

    if deploy.parallel == 0 {
        return Err(PipelineError::ConfigError(
            "[deploy].parallel must be >= 1 (got 0)".to_string(),
        ));
    }

    Ok(())
}

fn validate_task(cfg: &RawConfigFile, name: &str, task: &TaskConfig) -> Result<()> {
    match task.kind {
        TaskKind::Pipeline => {
            if task.src.is_empty() {
                return Err(PipelineError::ConfigError(format!(
                    "pipeline task '{name}' needs at least one `src` glob"
                )));
            }
        }
        TaskKind::Clean | TaskKind::Watch => {
            if !task.stages.is_empty() || !task.src.is_empty() {
                return Err(PipelineError::ConfigError(format!(
                    "{} task '{name}' takes neither `src` nor `stages`",
                    task.kind
                )));
            }
        }
        TaskKind::Deploy => {
            if cfg.deploy.is_none() {
                return Err(PipelineError::ConfigError(format!(
                    "deploy task '{name}' requires a [deploy] section"
                )));
            }
            if !task.stages.is_empty() {
                return Err(PipelineError::ConfigError(format!(
                    "deploy task '{name}' takes no `stages`"
                )));
            }
        }
    }

    if task.kind == TaskKind::Watch && task.watch.is_some() {
        return Err(PipelineError::ConfigError(format!(
            "watch task '{name}' cannot itself be watched"
        )));
    }

    let patterns = task
        .src
        .iter()
        .chain(task.exclude.iter())
        .chain(task.watch.iter().flatten());
    for pattern in patterns {
        Glob::new(pattern).map_err(|e| {
            PipelineError::ConfigError(format!(
                "task '{name}' has invalid glob '{pattern}': {e}"
            ))
        })?;
    }

    Ok(())
}

/// Every name in a command graph must be a task or a command.
///
/// Task names win over command names, so `[command.deploy]` may contain the
/// task `deploy` without referring to itself.
fn validate_command_references(cfg: &RawConfigFile) -> Result<()> {
    for (command, spec) in cfg.command.iter() {
        if spec.graph.is_empty() {
            return Err(PipelineError::ConfigError(format!(
                "command '{command}' has an empty graph"
            )));
        }

        for node in spec.graph.iter() {
            ensure_no_empty_composition(command, node)?;
            for referenced in node.referenced_names() {
                if !cfg.task.contains_key(referenced) && !cfg.command.contains_key(referenced) {
                    return Err(PipelineError::ConfigError(format!(
                        "command '{command}' references unknown task or command '{referenced}'"
                    )));
                }
                if referenced == command && !cfg.task.contains_key(referenced) {
                    return Err(PipelineError::ConfigError(format!(
                        "command '{command}' cannot include itself"
                    )));
                }
            }
        }
    }
    Ok(())
}

fn ensure_no_empty_composition(command: &str, node: &GraphSpec) -> Result<()> {
    match node {
        GraphSpec::Name(_) => Ok(()),
        GraphSpec::Series { series: children } | GraphSpec::Parallel { parallel: children } => {
            if children.is_empty() {
                return Err(PipelineError::ConfigError(format!(
                    "command '{command}' contains an empty series/parallel list"
                )));
            }
            for child in children {
                ensure_no_empty_composition(command, child)?;
            }
            Ok(())
        }
    }
}

fn validate_command_graph(cfg: &RawConfigFile) -> Result<()> {
    // Edge direction: included -> includer. For
    //   [command.default]
    //   graph = ["build", "watch"]
    // where `build` is itself a command, we add edge build -> default.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in cfg.command.keys() {
        graph.add_node(name.as_str());
    }

    for (name, spec) in cfg.command.iter() {
        for node in spec.graph.iter() {
            for referenced in node.referenced_names() {
                if cfg.task.contains_key(referenced) {
                    continue;
                }
                graph.add_edge(referenced, name.as_str(), ());
            }
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => {
            let node = cycle.node_id();
            Err(PipelineError::GraphCycle(format!(
                "cycle detected in command graph involving command '{}'",
                node
            )))
        }
    }
}
