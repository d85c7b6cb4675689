mod common;
use crate::common::builders::{name, parallel, ConfigFileBuilder, TaskConfigBuilder};

use std::error::Error;

use sitepipe::config::ConfigFile;
use sitepipe::errors::PipelineError;
use sitepipe::graph::{resolve_target, TaskGraph};
use sitepipe::types::BuildProfile;

type TestResult = Result<(), Box<dyn Error>>;

fn site_config() -> ConfigFile {
    ConfigFileBuilder::new()
        .with_task("clean", TaskConfigBuilder::clean().build())
        .with_task("html", TaskConfigBuilder::pipeline("*.html").build())
        .with_task("styles", TaskConfigBuilder::pipeline("scss/*.scss").build())
        .with_task("watch", TaskConfigBuilder::watch_task().build())
        .with_command(
            "build",
            vec![name("clean"), parallel(vec![name("html"), name("styles")])],
        )
        .with_command("default", vec![name("build"), name("watch")])
        .with_production_command("release", vec![name("build")])
        .build()
}

#[test]
fn command_references_expand_into_series() -> TestResult {
    let cfg = site_config();
    let target = resolve_target(&cfg, "default")?;

    let expected = TaskGraph::series([
        TaskGraph::series([
            TaskGraph::task("clean"),
            TaskGraph::parallel([TaskGraph::task("html"), TaskGraph::task("styles")]),
        ]),
        TaskGraph::Watch("watch".to_string()),
    ]);
    assert_eq!(target.graph, expected);
    assert_eq!(target.profile, BuildProfile::Development);
    assert!(target.graph.contains_watch());
    assert_eq!(
        target.graph.to_string(),
        "series(series(clean, parallel(html, styles)), watch:watch)"
    );
    Ok(())
}

#[test]
fn production_flag_on_command_sets_profile() -> TestResult {
    let cfg = site_config();
    let target = resolve_target(&cfg, "release")?;

    assert_eq!(target.profile, BuildProfile::Production);
    assert!(!target.graph.contains_watch());
    assert_eq!(target.graph.task_names(), vec!["clean", "html", "styles"]);
    Ok(())
}

#[test]
fn single_task_can_be_targeted() -> TestResult {
    let cfg = site_config();
    let target = resolve_target(&cfg, "styles")?;

    assert_eq!(target.graph, TaskGraph::task("styles"));
    Ok(())
}

#[test]
fn unknown_target_is_an_error() {
    let cfg = site_config();
    let err = resolve_target(&cfg, "publish").unwrap_err();

    assert!(matches!(err, PipelineError::TaskNotFound(_)));
}
