// src/lib.rs

pub mod cli;
pub mod config;
pub mod deploy;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fileset;
pub mod fs;
pub mod graph;
pub mod logging;
pub mod notifier;
pub mod reload;
pub mod stages;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;
use crate::engine::{Runner, WatchSetup};
use crate::exec::{PipelineExecutor, TaskRegistry};
use crate::fs::{FileSystem, RealFileSystem};
use crate::graph::{resolve_target, ResolvedTarget, TaskGraph};
use crate::reload::ReloadHub;
use crate::types::{BuildProfile, TaskKind};
use crate::watch::build_watch_rules;

/// High-level entry point used by `main.rs`.
///
/// Loads and validates the config, resolves the CLI target into a task
/// graph, and runs it until it finishes, fails, or Ctrl-C arrives.
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)
        .with_context(|| format!("loading config {:?}", config_path))?;

    let mut target = resolve_target(&cfg, &args.target)?;
    if args.production {
        target.profile = BuildProfile::Production;
    }

    if args.dry_run {
        print_dry_run(&cfg, &args.target, &target);
        return Ok(());
    }

    let root = config_root_dir(&config_path);
    let runner = build_runner(&cfg, &root, &target, Arc::new(RealFileSystem))?;

    tokio::select! {
        result = runner.run(&target.graph) => result.map_err(anyhow::Error::from),
        signal = tokio::signal::ctrl_c() => {
            signal.context("listening for Ctrl+C")?;
            info!("interrupted; shutting down");
            Ok(())
        }
    }
}

/// Wire registry, executor, notifier and (if the graph watches) the watch
/// setup into a [`Runner`].
pub fn build_runner(
    cfg: &ConfigFile,
    project_root: &Path,
    target: &ResolvedTarget,
    fs: Arc<dyn FileSystem>,
) -> Result<Runner<PipelineExecutor>> {
    let registry = Arc::new(TaskRegistry::from_config(cfg, project_root)?);
    let executor = PipelineExecutor::new(Arc::clone(&registry), Arc::clone(&fs), target.profile);

    let watch = if target.graph.contains_watch() {
        let rules = build_watch_rules(cfg)?;
        let live_reload = watch_tasks(&target.graph)
            .iter()
            .any(|name| cfg.task.get(*name).is_some_and(|t| t.live_reload));
        Some(
            WatchSetup::new(
                registry.src_root(),
                rules,
                Duration::from_millis(cfg.config.debounce_ms),
                fs,
            )
            .with_live_reload(live_reload),
        )
    } else {
        None
    };

    Ok(Runner::with_parts(
        executor,
        notifier::from_config(&cfg.notify),
        ReloadHub::default(),
        watch,
    ))
}

fn watch_tasks(graph: &TaskGraph) -> Vec<&str> {
    match graph {
        TaskGraph::Watch(name) => vec![name.as_str()],
        TaskGraph::Task(_) => Vec::new(),
        TaskGraph::Series(children) | TaskGraph::Parallel(children) => {
            children.iter().flat_map(watch_tasks).collect()
        }
    }
}

/// Directory that `[config].src` and `dest` are relative to: the config
/// file's directory, or `.` for a bare file name.
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn print_dry_run(cfg: &ConfigFile, name: &str, target: &ResolvedTarget) {
    println!("sitepipe dry-run");
    println!("  target  = {name}");
    println!("  profile = {}", target.profile);
    println!("  graph   = {}", target.graph);
    println!("  config.src = {}", cfg.config.src);
    println!("  config.dest = {}", cfg.config.dest);
    println!();

    println!("tasks ({}):", cfg.task.len());
    for (task_name, task) in cfg.task.iter() {
        println!("  - {task_name} ({})", task.kind);
        if !task.src.is_empty() {
            println!("      src: {:?}", task.src);
        }
        if !task.exclude.is_empty() {
            println!("      exclude: {:?}", task.exclude);
        }
        if task.kind == TaskKind::Pipeline || task.kind == TaskKind::Clean {
            println!("      dest: {}/{}", cfg.config.dest, task.effective_dest());
        }
        let stages: Vec<String> = task
            .stages
            .iter()
            .filter(|s| s.enabled_for(target.profile))
            .map(|s| format!("{:?}", s.kind))
            .collect();
        if !stages.is_empty() {
            println!("      stages: {}", stages.join(" -> "));
        }
        if let Some(watch) = &task.watch {
            println!("      watch: {:?}", watch);
        }
        if task.use_hash {
            println!("      use_hash: true");
        }
    }

    if let Some(deploy) = &cfg.deploy {
        println!();
        println!("deploy: host={} parallel={} remote_root={:?}", deploy.host, deploy.parallel, deploy.remote_root);
    }

    debug!("dry-run complete (nothing executed)");
}
