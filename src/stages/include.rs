// src/stages/include.rs

//! `@@include('path')` expansion for HTML partials.
//!
//! Directives may carry simple string parameters,
//! `@@include('card.html', {"title": "Hello"})`, which replace `@@title` in
//! the included text. Includes nest; a file that includes itself, directly or
//! through others, is an error.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use anyhow::Context;
use regex::Regex;

use crate::errors::{PipelineError, Result};
use crate::fileset::FileEntry;
use crate::stages::StageContext;

const MAX_DEPTH: usize = 32;

#[derive(Debug)]
pub struct IncludeStage {
    prefix: String,
    basepath: String,
    directive: Regex,
    param: Regex,
}

impl IncludeStage {
    pub fn new(prefix: &str, basepath: &str) -> anyhow::Result<Self> {
        let pattern = format!(
            r#"{}include\(\s*['"]([^'"]+)['"]\s*(?:,\s*(\{{[^}}]*\}}))?\s*\)"#,
            regex::escape(prefix)
        );
        let directive = Regex::new(&pattern)
            .with_context(|| format!("building include regex for prefix {prefix:?}"))?;
        let param = Regex::new(r#""([A-Za-z0-9_-]+)"\s*:\s*"([^"]*)""#)?;
        Ok(Self {
            prefix: prefix.to_string(),
            basepath: basepath.to_string(),
            directive,
            param,
        })
    }

    pub fn apply(&self, file: &mut FileEntry, ctx: &StageContext) -> Result<()> {
        let text = file
            .text()
            .map_err(|e| PipelineError::transform("include", &file.source, e.to_string()))?
            .to_string();
        let mut stack = vec![normalize(&file.source)];
        let expanded = self.expand(&text, &file.source, ctx, &mut stack)?;
        file.contents = expanded.into_bytes();
        Ok(())
    }

    fn expand(
        &self,
        text: &str,
        current: &Path,
        ctx: &StageContext,
        stack: &mut Vec<PathBuf>,
    ) -> Result<String> {
        if stack.len() > MAX_DEPTH {
            return Err(PipelineError::transform(
                "include",
                current,
                format!("includes nested deeper than {MAX_DEPTH} levels"),
            ));
        }

        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for caps in self.directive.captures_iter(text) {
            let (Some(whole), Some(target)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            out.push_str(&text[last..whole.start()]);
            last = whole.end();

            let resolved = normalize(&self.resolve(target.as_str(), current, ctx));
            if stack.contains(&resolved) {
                return Err(PipelineError::transform(
                    "include",
                    current,
                    format!("include cycle through {}", resolved.display()),
                ));
            }

            let included = ctx.fs.read_to_string(&resolved).map_err(|e| {
                PipelineError::transform(
                    "include",
                    current,
                    format!("cannot include '{}': {e}", target.as_str()),
                )
            })?;

            let included = match caps.get(2) {
                Some(params) => self.substitute(&included, params.as_str()),
                None => included,
            };

            stack.push(resolved.clone());
            let nested = self.expand(&included, &resolved, ctx, stack)?;
            stack.pop();
            out.push_str(&nested);
        }
        out.push_str(&text[last..]);
        Ok(out)
    }

    fn resolve(&self, target: &str, current: &Path, ctx: &StageContext) -> PathBuf {
        let base = match self.basepath.as_str() {
            "@file" => current.parent().map(Path::to_path_buf).unwrap_or_default(),
            "@root" => ctx.src_root.clone(),
            other => ctx.src_root.join(other),
        };
        base.join(target)
    }

    fn substitute(&self, text: &str, params: &str) -> String {
        let values: HashMap<&str, &str> = self
            .param
            .captures_iter(params)
            .filter_map(|c| Some((c.get(1)?.as_str(), c.get(2)?.as_str())))
            .collect();

        // Longest names first so `@@title` does not clobber `@@titleColor`.
        let mut names: Vec<&&str> = values.keys().collect();
        names.sort_by_key(|name| std::cmp::Reverse(name.len()));

        let mut out = text.to_string();
        for name in names {
            let token = format!("{}{}", self.prefix, name);
            out = out.replace(&token, values[*name]);
        }
        out
    }
}

/// Lexically resolve `.` and `..` so the same file always has one key.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
