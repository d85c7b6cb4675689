mod common;
use crate::common::{mock_fs, read};

use std::error::Error;
use std::path::{Path, PathBuf};

use sitepipe::fileset::{gather, glob_base, materialize, FileEntry, FileSet, SourceSpec};
use sitepipe::watch::patterns::strip_dot_prefix;
use sitepipe::watch::WatchRule;

type TestResult = Result<(), Box<dyn Error>>;

fn spec(patterns: &[&str], exclude: &[&str], base: Option<&str>) -> SourceSpec {
    SourceSpec {
        root: PathBuf::from("src"),
        patterns: patterns.iter().map(|p| p.to_string()).collect(),
        exclude: exclude.iter().map(|p| p.to_string()).collect(),
        base: base.map(str::to_string),
    }
}

#[test]
fn glob_base_is_literal_prefix() {
    assert_eq!(glob_base("scss/**/*.scss"), PathBuf::from("scss"));
    assert_eq!(glob_base("js/index.js"), PathBuf::from("js"));
    assert_eq!(glob_base("img/svg/*.svg"), PathBuf::from("img/svg"));
    assert_eq!(glob_base("*.html"), PathBuf::new());
    assert_eq!(glob_base("./fonts/*"), PathBuf::from("fonts"));
}

#[test]
fn gather_excludes_partials_and_keeps_first_match_once() -> TestResult {
    let fs = mock_fs(&[
        ("src/scss/main.scss", "main"),
        ("src/scss/_vars.scss", "vars"),
        ("src/scss/pages/home.scss", "home"),
        ("src/scss/pages/_mixins.scss", "mixins"),
    ]);

    let set = gather(
        &fs,
        &spec(&["scss/main.scss", "scss/**/*.scss"], &["scss/**/_*.scss"], None),
    )?;

    assert_eq!(
        set.relative_paths(),
        vec![Path::new("main.scss"), Path::new("pages/home.scss")]
    );
    assert!(set.files.iter().all(|f| f.modified.is_some()));
    Ok(())
}

#[test]
fn dot_slash_patterns_match_like_plain_ones() -> TestResult {
    let fs = mock_fs(&[
        ("src/index.html", "<p>home</p>"),
        ("src/about.html", "<p>about</p>"),
        ("src/fonts/a.woff2", "A"),
    ]);

    let html = gather(&fs, &spec(&["./*.html"], &[], None))?;
    assert_eq!(
        html.relative_paths(),
        vec![Path::new("about.html"), Path::new("index.html")]
    );

    let fonts = gather(&fs, &spec(&["./fonts/*"], &["./fonts/*.txt"], None))?;
    assert_eq!(fonts.relative_paths(), vec![Path::new("a.woff2")]);

    let rule = WatchRule::new("styles", &["./scss/**/*.scss".to_string()], &[], false)?;
    assert!(rule.matches("scss/main.scss"));
    Ok(())
}

#[test]
fn strip_dot_prefix_drops_only_leading_current_dir() {
    assert_eq!(strip_dot_prefix("./*.html"), "*.html");
    assert_eq!(strip_dot_prefix("././/img/*.png"), "img/*.png");
    assert_eq!(strip_dot_prefix("scss/./x.scss"), "scss/./x.scss");
    assert_eq!(strip_dot_prefix("../up/*.js"), "../up/*.js");
}

#[test]
fn explicit_base_keeps_directories() -> TestResult {
    let fs = mock_fs(&[("src/img/svg/logo.svg", "<svg/>")]);
    let set = gather(&fs, &spec(&["img/svg/*.svg"], &[], Some("img")))?;
    assert_eq!(set.relative_paths(), vec![Path::new("svg/logo.svg")]);
    Ok(())
}

#[test]
fn missing_base_directory_gathers_nothing() -> TestResult {
    let fs = mock_fs(&[("src/index.html", "x")]);
    let set = gather(&fs, &spec(&["fonts/**/*.woff2"], &[], None))?;
    assert!(set.is_empty());
    Ok(())
}

#[test]
fn materialize_writes_under_destination() -> TestResult {
    let fs = mock_fs(&[]);
    let set = FileSet::new(vec![
        FileEntry::new("src/a.css", "css/a.css", "a"),
        FileEntry::new("src/b.css", "./b.css", "b"),
    ]);

    let written = materialize(&fs, Path::new("app"), &set)?;

    assert_eq!(written, vec![PathBuf::from("app/css/a.css"), PathBuf::from("app/b.css")]);
    assert_eq!(read(&fs, "app/css/a.css"), "a");
    assert_eq!(read(&fs, "app/b.css"), "b");
    Ok(())
}

#[test]
fn materialize_rejects_escaping_paths() {
    let fs = mock_fs(&[]);
    let set = FileSet::new(vec![FileEntry::new("src/x", "../outside.txt", "x")]);
    assert!(materialize(&fs, Path::new("app"), &set).is_err());
    assert!(fs.contents("outside.txt").is_none());
}
