mod common;
use crate::common::{init_tracing, mock_fs};

use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use sitepipe::config::StageKind;
use sitepipe::fileset::{FileEntry, FileSet};
use sitepipe::stages::rename::RenameStage;
use sitepipe::stages::sprite::icon_id;
use sitepipe::stages::{Stage, StageContext};

type TestResult = Result<(), Box<dyn Error>>;

fn ctx() -> StageContext {
    StageContext {
        task: "test".to_string(),
        src_root: PathBuf::from("src"),
        fs: Arc::new(mock_fs(&[])),
    }
}

fn one_file(relative: &str, contents: &str) -> FileSet {
    FileSet::new(vec![FileEntry::new(
        Path::new("src").join(relative),
        relative,
        contents.as_bytes(),
    )])
}

fn text(set: &FileSet, index: usize) -> String {
    String::from_utf8(set.files[index].contents.clone()).unwrap()
}

#[tokio::test]
async fn css_is_minified() -> TestResult {
    init_tracing();

    let stage = Stage::compile(&StageKind::MinifyCss { browsers: vec![] })?;
    let out = stage
        .apply(one_file("main.css", "a {\n  color: #ff0000;\n  margin: 0px;\n}\n"), &ctx())
        .await?;

    assert_eq!(text(&out, 0), "a{color:red;margin:0}");
    Ok(())
}

#[tokio::test]
async fn css_syntax_error_names_the_file() -> TestResult {
    init_tracing();

    let stage = Stage::compile(&StageKind::MinifyCss { browsers: vec![] })?;
    let err = stage
        .apply(one_file("broken.css", "a[[ { color: red }"), &ctx())
        .await
        .unwrap_err();

    assert!(err.is_transform());
    assert!(err.to_string().contains("broken.css"), "got {err}");
    Ok(())
}

#[test]
fn invalid_browserslist_query_fails_to_compile() {
    let result = Stage::compile(&StageKind::MinifyCss {
        browsers: vec!["definitely not a browser".to_string()],
    });
    assert!(result.is_err());
}

#[tokio::test]
async fn html_whitespace_collapses_but_pre_survives() -> TestResult {
    init_tracing();

    let stage = Stage::compile(&StageKind::MinifyHtml)?;
    let input = "<div>\n    <p>a   b</p>\n    <pre>\n  keep\n    this</pre>\n</div>\n";
    let out = stage.apply(one_file("index.html", input), &ctx()).await?;

    assert_eq!(text(&out, 0), "<div><p>a b</p><pre>\n  keep\n    this</pre></div>");
    Ok(())
}

#[tokio::test]
async fn sprite_stacks_icons_by_id() -> TestResult {
    init_tracing();

    let stage = Stage::compile(&StageKind::SvgSprite {
        output: "sprite.svg".to_string(),
    })?;
    let icons = FileSet::new(vec![
        FileEntry::new(
            "src/img/svg/social/twitter.svg",
            "social/twitter.svg",
            r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 24 24"><path d="M1"/></svg>"#,
        ),
        FileEntry::new(
            "src/img/svg/logo.svg",
            "logo.svg",
            r#"<?xml version="1.0"?><svg viewBox="0 0 10 10" width="10"><circle r="5"/></svg>"#,
        ),
    ]);

    let out = stage.apply(icons, &ctx()).await?;

    assert_eq!(out.len(), 1);
    assert_eq!(out.files[0].relative, PathBuf::from("sprite.svg"));
    let sprite = text(&out, 0);
    let logo = sprite
        .find(r#"<svg viewBox="0 0 10 10" id="logo"><circle r="5"/></svg>"#)
        .expect("logo symbol");
    let twitter = sprite
        .find(r#"<svg viewBox="0 0 24 24" id="social--twitter"><path d="M1"/></svg>"#)
        .expect("twitter symbol");
    assert!(logo < twitter, "icons are ordered by path");
    assert!(sprite.ends_with("</svg>"));
    Ok(())
}

#[tokio::test]
async fn sprite_rejects_non_svg_input() -> TestResult {
    let stage = Stage::compile(&StageKind::SvgSprite {
        output: "sprite.svg".to_string(),
    })?;
    let err = stage
        .apply(one_file("notes.svg", "just text"), &ctx())
        .await
        .unwrap_err();
    assert!(err.is_transform());
    Ok(())
}

#[test]
fn icon_ids_are_path_based() {
    assert_eq!(icon_id(Path::new("social/twitter.svg")), "social--twitter");
    assert_eq!(icon_id(Path::new("arrow left.svg")), "arrow-left");
}

#[test]
fn rename_parts() {
    let rename = RenameStage {
        prefix: Some("_".to_string()),
        suffix: Some(".min".to_string()),
        extname: Some(".css".to_string()),
        dirname: Some("dist".to_string()),
    };
    assert_eq!(
        rename.rename(Path::new("pages/home.scss")),
        PathBuf::from("dist/_home.min.css")
    );

    let keep_dir = RenameStage {
        suffix: Some(".min".to_string()),
        ..RenameStage::default()
    };
    assert_eq!(
        keep_dir.rename(Path::new("js/app.js")),
        PathBuf::from("js/app.min.js")
    );
}

#[cfg(unix)]
#[tokio::test]
async fn exec_pipes_contents_and_changes_extension() -> TestResult {
    init_tracing();

    let stage = Stage::compile(&StageKind::Exec {
        cmd: "tr a-z A-Z".to_string(),
        extname: Some(".txt".to_string()),
    })?;
    let out = stage.apply(one_file("note.md", "hello"), &ctx()).await?;

    assert_eq!(text(&out, 0), "HELLO");
    assert_eq!(out.files[0].relative, PathBuf::from("note.txt"));
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn exec_failure_is_a_transform_error() -> TestResult {
    init_tracing();

    let stage = Stage::compile(&StageKind::Exec {
        cmd: "echo boom >&2; exit 3".to_string(),
        extname: None,
    })?;
    let err = stage
        .apply(one_file("main.scss", "a {}"), &ctx())
        .await
        .unwrap_err();

    let msg = err.to_string();
    assert!(err.is_transform());
    assert!(msg.contains("code 3") && msg.contains("boom"), "got {msg}");
    Ok(())
}
