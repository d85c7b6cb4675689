mod common;
use crate::common::{init_tracing, mock_fs};

use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;

use sitepipe::build_runner;
use sitepipe::cli::CliArgs;
use sitepipe::config::{load_and_validate, ConfigFile};
use sitepipe::graph::resolve_target;
use sitepipe::types::{BuildProfile, TaskKind};

type TestResult = Result<(), Box<dyn Error>>;

fn demo_config() -> Result<ConfigFile, Box<dyn Error>> {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos/Sitepipe.toml");
    Ok(load_and_validate(path)?)
}

#[test]
fn demo_config_validates() -> TestResult {
    init_tracing();

    let cfg = demo_config()?;
    assert_eq!(cfg.task["clean"].kind, TaskKind::Clean);
    assert_eq!(cfg.task["watch"].kind, TaskKind::Watch);
    assert_eq!(cfg.task["upload"].kind, TaskKind::Deploy);
    assert!(!cfg.task["fonts"].effective_notify());
    assert!(cfg.deploy.is_some());
    Ok(())
}

#[test]
fn demo_commands_resolve() -> TestResult {
    let cfg = demo_config()?;

    let default = resolve_target(&cfg, "default")?;
    assert_eq!(default.profile, BuildProfile::Development);
    assert!(default.graph.contains_watch());

    let build = resolve_target(&cfg, "build")?;
    assert_eq!(build.profile, BuildProfile::Production);
    assert!(!build.graph.contains_watch());
    assert_eq!(build.graph.task_names().first(), Some(&"clean"));

    let deploy = resolve_target(&cfg, "deploy")?;
    assert_eq!(deploy.profile, BuildProfile::Production);
    assert_eq!(deploy.graph.task_names().last(), Some(&"upload"));

    // A bare task name is a target too.
    let styles = resolve_target(&cfg, "styles")?;
    assert_eq!(styles.graph.task_names(), vec!["styles"]);
    Ok(())
}

#[test]
fn demo_runner_wires_up() -> TestResult {
    init_tracing();

    let cfg = demo_config()?;
    let fs = Arc::new(mock_fs(&[("src/index.html", "<p>hi</p>")]));
    for target in ["default", "build", "deploy"] {
        let resolved = resolve_target(&cfg, target)?;
        build_runner(&cfg, Path::new("."), &resolved, fs.clone())?;
    }
    Ok(())
}

#[test]
fn cli_defaults() -> TestResult {
    let args = CliArgs::try_parse_from(["sitepipe"])?;
    assert_eq!(args.target, "default");
    assert_eq!(args.config, "Sitepipe.toml");
    assert!(!args.production);
    assert!(!args.dry_run);
    assert!(args.log_level.is_none());
    Ok(())
}

#[test]
fn cli_target_and_flags() -> TestResult {
    let args = CliArgs::try_parse_from([
        "sitepipe",
        "build",
        "--config",
        "site/Sitepipe.toml",
        "--production",
        "--log-level",
        "debug",
        "--dry-run",
    ])?;
    assert_eq!(args.target, "build");
    assert_eq!(args.config, "site/Sitepipe.toml");
    assert!(args.production);
    assert!(args.dry_run);
    assert!(args.log_level.is_some());

    assert!(CliArgs::try_parse_from(["sitepipe", "--log-level", "loud"]).is_err());
    Ok(())
}
