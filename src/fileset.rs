// src/fileset.rs

//! File sets: the value that flows through a pipeline task.
//!
//! A [`FileSet`] is gathered from the source tree by glob, handed from stage to
//! stage, and finally materialized under the task's destination directory.
//! Each entry keeps its path relative to the glob base (the literal directory
//! prefix of the pattern), so `scss/pages/home.scss` gathered with
//! `scss/**/*.scss` lands at `<dest>/pages/home.scss` unless a stage renames it.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};
use tracing::debug;

use crate::fs::FileSystem;
use crate::watch::patterns::compile_globset;

const GLOB_META: &[char] = &['*', '?', '[', '{'];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Where the file was read from.
    pub source: PathBuf,
    /// Output path relative to the destination directory.
    pub relative: PathBuf,
    pub contents: Vec<u8>,
    pub modified: Option<SystemTime>,
}

impl FileEntry {
    pub fn new(
        source: impl Into<PathBuf>,
        relative: impl Into<PathBuf>,
        contents: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            source: source.into(),
            relative: relative.into(),
            contents: contents.into(),
            modified: None,
        }
    }

    /// Contents as UTF-8, for text stages.
    pub fn text(&self) -> std::result::Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(&self.contents)
    }
}

/// Ordered collection of files, owned by one task invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSet {
    pub files: Vec<FileEntry>,
}

impl FileSet {
    pub fn new(files: Vec<FileEntry>) -> Self {
        Self { files }
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn relative_paths(&self) -> Vec<&Path> {
        self.files.iter().map(|f| f.relative.as_path()).collect()
    }
}

/// What a task reads: globs relative to a source root.
#[derive(Debug, Clone)]
pub struct SourceSpec {
    pub root: PathBuf,
    pub patterns: Vec<String>,
    pub exclude: Vec<String>,
    /// Overrides the per-pattern glob base (relative to `root`).
    pub base: Option<String>,
}

/// Literal directory prefix of a glob: `scss/**/*.scss` -> `scss`,
/// `js/index.js` -> `js`, `*.html` -> ``.
pub fn glob_base(pattern: &str) -> PathBuf {
    let mut base = PathBuf::new();
    let components: Vec<&str> = pattern.split('/').filter(|c| !c.is_empty()).collect();

    for (i, component) in components.iter().enumerate() {
        let is_last = i + 1 == components.len();
        if component.contains(GLOB_META) || is_last {
            break;
        }
        if *component != "." {
            base.push(component);
        }
    }
    base
}

/// A matched source file, before its contents are read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRef {
    pub source: PathBuf,
    pub relative: PathBuf,
    pub modified: Option<SystemTime>,
}

/// List all files matching `spec` in `fs` without reading them.
///
/// Patterns are processed in order; a file matched by several patterns is
/// listed once, at its first match. Within one pattern files are sorted by
/// path. A missing base directory yields no files.
pub fn list_matches(fs: &dyn FileSystem, spec: &SourceSpec) -> Result<Vec<FileRef>> {
    let exclude = if spec.exclude.is_empty() {
        None
    } else {
        Some(compile_globset(&spec.exclude)?)
    };

    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut refs = Vec::new();

    for pattern in spec.patterns.iter() {
        let matcher = compile_globset(std::slice::from_ref(pattern))?;
        let base = match &spec.base {
            Some(base) => PathBuf::from(base),
            None => glob_base(pattern),
        };
        let base_dir = if base.as_os_str().is_empty() {
            spec.root.clone()
        } else {
            spec.root.join(&base)
        };

        let mut matched = Vec::new();
        for path in walk_files(fs, &base_dir)? {
            let Some(rel_to_root) = relative_slash_path(&spec.root, &path) else {
                continue;
            };
            if !matcher.is_match(&rel_to_root) {
                continue;
            }
            if exclude.as_ref().is_some_and(|ex| ex.is_match(&rel_to_root)) {
                continue;
            }
            matched.push(path);
        }
        matched.sort();

        for path in matched {
            if !seen.insert(path.clone()) {
                continue;
            }
            let relative = path
                .strip_prefix(&base_dir)
                .map(Path::to_path_buf)
                .with_context(|| format!("{:?} is outside glob base {:?}", path, base_dir))?;
            let modified = fs.modified(&path).ok();
            refs.push(FileRef {
                source: path,
                relative,
                modified,
            });
        }
    }

    debug!(
        root = ?spec.root,
        patterns = ?spec.patterns,
        files = refs.len(),
        "listed matching files"
    );
    Ok(refs)
}

/// Gather all files matching `spec` from `fs`, contents included.
///
/// Same selection and order as [`list_matches`].
pub fn gather(fs: &dyn FileSystem, spec: &SourceSpec) -> Result<FileSet> {
    let files = list_matches(fs, spec)?
        .into_iter()
        .map(|r| {
            Ok(FileEntry {
                contents: fs.read(&r.source)?,
                source: r.source,
                relative: r.relative,
                modified: r.modified,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(FileSet { files })
}

/// Write every entry under `dest_dir`, returning the written paths.
pub fn materialize(fs: &dyn FileSystem, dest_dir: &Path, set: &FileSet) -> Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(set.files.len());
    for file in set.files.iter() {
        let target = dest_dir.join(normalize_relative(&file.relative)?);
        fs.write(&target, &file.contents)?;
        written.push(target);
    }
    Ok(written)
}

/// Reject output paths that would escape the destination directory.
fn normalize_relative(relative: &Path) -> Result<PathBuf> {
    let mut out = PathBuf::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            _ => anyhow::bail!("output path {:?} escapes the destination directory", relative),
        }
    }
    Ok(out)
}

/// Recursively list files below `dir`.
pub fn walk_files(fs: &dyn FileSystem, dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    if !fs.is_dir(dir) {
        return Ok(files);
    }

    let mut stack = vec![dir.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for path in fs.read_dir(&dir)? {
            if fs.is_dir(&path) {
                stack.push(path);
            } else if fs.is_file(&path) {
                files.push(path);
            }
        }
    }
    Ok(files)
}

/// `path` relative to `root` with forward slashes, for glob matching.
pub fn relative_slash_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    Some(rel.to_string_lossy().replace('\\', "/"))
}
