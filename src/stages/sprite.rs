// src/stages/sprite.rs

//! SVG "stack" sprites.
//!
//! Every input icon becomes a nested `<svg id="<name>">` inside one output
//! document; CSS `:target` shows one icon at a time, so `sprite.svg#logo`
//! renders just the logo. The id is the icon's relative path without
//! extension, with `/` turned into `--`.

use std::path::{Path, PathBuf};

use regex::Regex;

use crate::errors::{PipelineError, Result};
use crate::fileset::{FileEntry, FileSet};

const SPRITE_HEAD: &str = concat!(
    r#"<?xml version="1.0" encoding="utf-8"?>"#,
    r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink">"#,
    r#"<style>:root>svg{display:none}:root>svg:target{display:inline}</style>"#,
);

#[derive(Debug)]
pub struct SpriteStage {
    output: PathBuf,
    root: Regex,
    view_box: Regex,
}

impl SpriteStage {
    pub fn new(output: &str) -> anyhow::Result<Self> {
        Ok(Self {
            output: PathBuf::from(output),
            root: Regex::new(r"(?is)<svg\b([^>]*)>(.*)</svg\s*>")?,
            view_box: Regex::new(r#"(?i)\bviewBox\s*=\s*["']([^"']*)["']"#)?,
        })
    }

    /// Merge all files into one sprite. An empty set stays empty.
    pub fn apply(&self, files: FileSet) -> Result<FileSet> {
        let Some(first) = files.files.first() else {
            return Ok(files);
        };
        let source = first.source.clone();
        let modified = files.files.iter().filter_map(|f| f.modified).max();

        let mut icons: Vec<&FileEntry> = files.files.iter().collect();
        icons.sort_by(|a, b| a.relative.cmp(&b.relative));

        let mut out = String::from(SPRITE_HEAD);
        for icon in icons {
            out.push_str(&self.symbol(icon)?);
        }
        out.push_str("</svg>");

        let mut sprite = FileEntry::new(source, self.output.clone(), out.into_bytes());
        sprite.modified = modified;
        Ok(FileSet::new(vec![sprite]))
    }

    fn symbol(&self, icon: &FileEntry) -> Result<String> {
        let text = icon
            .text()
            .map_err(|e| PipelineError::transform("svg_sprite", &icon.source, e.to_string()))?;
        let caps = self.root.captures(text).ok_or_else(|| {
            PipelineError::transform("svg_sprite", &icon.source, "no <svg> root element")
        })?;
        let attrs = caps.get(1).map_or("", |m| m.as_str());
        let body = caps.get(2).map_or("", |m| m.as_str()).trim();

        let mut symbol = String::from("<svg");
        if let Some(vb) = self.view_box.captures(attrs).and_then(|c| c.get(1)) {
            symbol.push_str(&format!(r#" viewBox="{}""#, vb.as_str()));
        }
        symbol.push_str(&format!(r#" id="{}">"#, icon_id(&icon.relative)));
        symbol.push_str(body);
        symbol.push_str("</svg>");
        Ok(symbol)
    }
}

/// `social/twitter.svg` -> `social--twitter`.
pub fn icon_id(relative: &Path) -> String {
    let without_ext = relative.with_extension("");
    let joined = without_ext
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("--");
    joined
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect()
}
