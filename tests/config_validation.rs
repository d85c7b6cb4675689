mod common;
use crate::common::builders::{name, parallel, series, ConfigFileBuilder, TaskConfigBuilder};
use crate::common::init_tracing;

use std::error::Error;

use sitepipe::config::{parse_str, ConfigFile, StageKind};
use sitepipe::errors::PipelineError;
use sitepipe::types::{BuildProfile, TaskKind};

type TestResult = Result<(), Box<dyn Error>>;

fn validate(toml: &str) -> Result<ConfigFile, PipelineError> {
    ConfigFile::try_from(parse_str(toml)?)
}

#[test]
fn parses_tasks_stages_and_commands() -> TestResult {
    init_tracing();

    let cfg = validate(
        r#"
        [config]
        src = "src"
        dest = "app"

        [task.clean]
        kind = "clean"

        [task.styles]
        src = ["scss/**/*.scss"]
        exclude = ["scss/**/_*.scss"]
        dest = "css"
        watch = ["scss/**/*.scss"]

        [[task.styles.stages]]
        stage = "exec"
        cmd = "sass --stdin"
        extname = ".css"

        [[task.styles.stages]]
        stage = "minify_css"
        browsers = ["last 2 versions"]
        only = "production"

        [[task.styles.stages]]
        stage = "rename"
        suffix = ".min"

        [task.watch]
        kind = "watch"
        live_reload = true

        [command.default]
        graph = ["clean", { parallel = ["styles"] }, "watch"]
        "#,
    )?;

    let styles = &cfg.task["styles"];
    assert_eq!(styles.kind, TaskKind::Pipeline);
    assert_eq!(styles.stages.len(), 3);
    assert_eq!(
        styles.stages[0].kind,
        StageKind::Exec {
            cmd: "sass --stdin".to_string(),
            extname: Some(".css".to_string()),
        }
    );
    assert!(!styles.stages[1].enabled_for(BuildProfile::Development));
    assert!(styles.stages[1].enabled_for(BuildProfile::Production));
    assert!(styles.stages[2].enabled_for(BuildProfile::Development));

    assert_eq!(cfg.task["clean"].kind, TaskKind::Clean);
    assert!(cfg.task["watch"].live_reload);
    assert_eq!(cfg.config.debounce_ms, 100);
    assert!(cfg.command.contains_key("default"));
    Ok(())
}

#[test]
fn include_stage_defaults() -> TestResult {
    let cfg = validate(
        r#"
        [task.html]
        src = ["*.html"]

        [[task.html.stages]]
        stage = "include"
        "#,
    )?;

    assert_eq!(
        cfg.task["html"].stages[0].kind,
        StageKind::Include {
            prefix: "@@".to_string(),
            basepath: "@file".to_string(),
        }
    );
    Ok(())
}

#[test]
fn unknown_reference_is_rejected() {
    let err = ConfigFileBuilder::new()
        .with_task("a", TaskConfigBuilder::pipeline("*.html").build())
        .with_command("default", vec![name("a"), name("missing")])
        .try_build()
        .unwrap_err();

    let msg = err.to_string();
    assert!(msg.contains("missing"), "unexpected error: {msg}");
}

#[test]
fn command_cycle_is_rejected() {
    let err = ConfigFileBuilder::new()
        .with_task("a", TaskConfigBuilder::pipeline("*.html").build())
        .with_command("build", vec![name("a"), name("release")])
        .with_command("release", vec![series(vec![name("build")])])
        .try_build()
        .unwrap_err();

    assert!(
        matches!(err, PipelineError::GraphCycle(_)),
        "expected cycle error, got {err}"
    );
}

#[test]
fn command_may_contain_task_of_the_same_name() -> TestResult {
    let cfg = ConfigFileBuilder::new()
        .with_task("build", TaskConfigBuilder::pipeline("*.html").build())
        .with_task("deploy", TaskConfigBuilder::deploy().build())
        .with_deploy("memory:", 4)
        .with_command("deploy", vec![name("build"), name("deploy")])
        .try_build()?;

    assert!(cfg.command.contains_key("deploy"));
    Ok(())
}

#[test]
fn empty_compositions_are_rejected() {
    let err = ConfigFileBuilder::new()
        .with_task("a", TaskConfigBuilder::pipeline("*.html").build())
        .with_command("default", vec![name("a"), parallel(vec![])])
        .try_build()
        .unwrap_err();

    assert!(err.to_string().contains("empty"), "got {err}");
}

#[test]
fn deploy_task_needs_deploy_section() {
    let err = ConfigFileBuilder::new()
        .with_task("deploy", TaskConfigBuilder::deploy().build())
        .try_build()
        .unwrap_err();

    assert!(err.to_string().contains("[deploy]"), "got {err}");
}

#[test]
fn pipeline_without_sources_is_rejected() {
    let err = ConfigFileBuilder::new()
        .with_task("a", TaskConfigBuilder::watch_task().build())
        .with_task(
            "b",
            sitepipe::config::TaskConfig::default(),
        )
        .try_build()
        .unwrap_err();

    assert!(err.to_string().contains("'b'"), "got {err}");
}

#[test]
fn invalid_glob_is_rejected() {
    let err = ConfigFileBuilder::new()
        .with_task("a", TaskConfigBuilder::pipeline("scss/[*.scss").build())
        .try_build()
        .unwrap_err();

    assert!(err.to_string().contains("invalid glob"), "got {err}");
}

#[test]
fn zero_deploy_parallelism_is_rejected() {
    let err = ConfigFileBuilder::new()
        .with_task("a", TaskConfigBuilder::pipeline("*.html").build())
        .with_deploy("memory:", 0)
        .try_build()
        .unwrap_err();

    assert!(err.to_string().contains("parallel"), "got {err}");
}

#[test]
fn unknown_stage_fails_to_parse() {
    let result = parse_str(
        r#"
        [task.a]
        src = ["*.html"]

        [[task.a.stages]]
        stage = "typograf"
        "#,
    );
    assert!(matches!(result, Err(PipelineError::TomlError(_))));
}
