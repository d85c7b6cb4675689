// src/watch/patterns.rs

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::config::model::ConfigFile;
use crate::fileset::{relative_slash_path, walk_files};
use crate::fs::FileSystem;
use crate::types::{TaskKind, TaskName};

/// A glob pattern set bound to a task.
///
/// Patterns are relative to the source root; the watcher passes relative
/// paths (e.g. `"scss/main.scss"`) into [`WatchRule::matches`].
#[derive(Clone)]
pub struct WatchRule {
    task: TaskName,
    patterns: Vec<String>,
    watch_set: GlobSet,
    exclude_set: Option<GlobSet>,
    use_hash: bool,
}

impl fmt::Debug for WatchRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchRule")
            .field("task", &self.task)
            .field("patterns", &self.patterns)
            .finish_non_exhaustive()
    }
}

impl WatchRule {
    pub fn new(
        task: impl Into<TaskName>,
        patterns: &[String],
        exclude: &[String],
        use_hash: bool,
    ) -> Result<Self> {
        let task = task.into();
        let watch_set = compile_globset(patterns)
            .with_context(|| format!("building watch globset for task {task}"))?;
        let exclude_set = if exclude.is_empty() {
            None
        } else {
            Some(
                compile_globset(exclude)
                    .with_context(|| format!("building exclude globset for task {task}"))?,
            )
        };

        Ok(Self {
            task,
            patterns: patterns.to_vec(),
            watch_set,
            exclude_set,
            use_hash,
        })
    }

    /// Name of the task this rule re-runs.
    pub fn task(&self) -> &str {
        &self.task
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Whether this rule only fires when watched content changed.
    pub fn use_hash(&self) -> bool {
        self.use_hash
    }

    /// True if `rel_path` (relative to the source root) should trigger the task.
    pub fn matches(&self, rel_path: &str) -> bool {
        if !self.watch_set.is_match(rel_path) {
            return false;
        }
        if let Some(exclude) = &self.exclude_set {
            if exclude.is_match(rel_path) {
                return false;
            }
        }
        true
    }
}

/// Build one rule per task that declares `watch = [...]`.
///
/// Watch-kind tasks never get a rule; the task's `exclude` list also applies
/// to its watch patterns.
pub fn build_watch_rules(cfg: &ConfigFile) -> Result<Vec<WatchRule>> {
    let mut rules = Vec::new();
    for (name, task) in cfg.tasks().iter() {
        if task.kind == TaskKind::Watch {
            continue;
        }
        let Some(patterns) = &task.watch else {
            continue;
        };
        if patterns.is_empty() {
            continue;
        }
        rules.push(WatchRule::new(
            name.clone(),
            patterns,
            &task.exclude,
            task.use_hash,
        )?);
    }
    Ok(rules)
}

/// Build a GlobSet where `*` does not cross directory separators, so
/// `*.html` only matches top-level files and `**` is needed to recurse.
///
/// Matched paths never start with `./`, so a leading `./` is dropped from
/// each pattern.
pub fn compile_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = GlobBuilder::new(strip_dot_prefix(pat))
            .literal_separator(true)
            .build()
            .with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

/// `./img/*.png` -> `img/*.png`.
pub fn strip_dot_prefix(pattern: &str) -> &str {
    let mut pattern = pattern;
    while let Some(rest) = pattern.strip_prefix("./") {
        pattern = rest.trim_start_matches('/');
    }
    pattern
}

/// Collect all files under `root` that this rule matches.
///
/// Used to compute aggregate content hashes for `use_hash = true` rules.
pub fn collect_matching_files(
    fs: &dyn FileSystem,
    root: &Path,
    rule: &WatchRule,
) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = walk_files(fs, root)?
        .into_iter()
        .filter(|path| {
            relative_slash_path(root, path).is_some_and(|rel| rule.matches(&rel))
        })
        .collect();
    files.sort();
    Ok(files)
}
