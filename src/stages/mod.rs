// src/stages/mod.rs

//! Transform stages applied to a [`FileSet`] in order.
//!
//! Each `[[task.<name>.stages]]` entry compiles into a [`Stage`] once, when the
//! task registry is built, so bad regexes or browserslist queries surface at
//! startup rather than on the first file change.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use crate::config::model::{StageConfig, StageKind};
use crate::errors::{PipelineError, Result};
use crate::exec::command::pipe_through;
use crate::fileset::FileSet;
use crate::fs::FileSystem;
use crate::types::{BuildProfile, TaskName};

pub mod css;
pub mod html;
pub mod include;
pub mod rename;
pub mod sprite;

pub use css::CssMinifier;
pub use html::HtmlMinifier;
pub use include::IncludeStage;
pub use rename::RenameStage;
pub use sprite::SpriteStage;

/// What a stage may look at besides the files flowing through it.
#[derive(Debug, Clone)]
pub struct StageContext {
    pub task: TaskName,
    pub src_root: PathBuf,
    pub fs: Arc<dyn FileSystem>,
}

#[derive(Debug)]
pub enum Stage {
    Include(IncludeStage),
    Rename(RenameStage),
    Exec { cmd: String, extname: Option<String> },
    MinifyCss(CssMinifier),
    MinifyHtml(HtmlMinifier),
    SvgSprite(SpriteStage),
}

impl Stage {
    pub fn compile(kind: &StageKind) -> anyhow::Result<Self> {
        let stage = match kind {
            StageKind::Include { prefix, basepath } => {
                Stage::Include(IncludeStage::new(prefix, basepath)?)
            }
            StageKind::Rename {
                prefix,
                suffix,
                extname,
                dirname,
            } => Stage::Rename(RenameStage {
                prefix: prefix.clone(),
                suffix: suffix.clone(),
                extname: extname.clone(),
                dirname: dirname.clone(),
            }),
            StageKind::Exec { cmd, extname } => Stage::Exec {
                cmd: cmd.clone(),
                extname: extname.clone(),
            },
            StageKind::MinifyCss { browsers } => Stage::MinifyCss(CssMinifier::new(browsers)?),
            StageKind::MinifyHtml => Stage::MinifyHtml(HtmlMinifier::new()?),
            StageKind::SvgSprite { output } => Stage::SvgSprite(SpriteStage::new(output)?),
        };
        Ok(stage)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Include(_) => "include",
            Stage::Rename(_) => "rename",
            Stage::Exec { .. } => "exec",
            Stage::MinifyCss(_) => "minify_css",
            Stage::MinifyHtml(_) => "minify_html",
            Stage::SvgSprite(_) => "svg_sprite",
        }
    }

    pub async fn apply(&self, mut files: FileSet, ctx: &StageContext) -> Result<FileSet> {
        debug!(task = %ctx.task, stage = self.name(), files = files.len(), "applying stage");
        match self {
            Stage::Include(stage) => {
                for file in files.files.iter_mut() {
                    stage.apply(file, ctx)?;
                }
                Ok(files)
            }
            Stage::Rename(stage) => {
                for file in files.files.iter_mut() {
                    file.relative = stage.rename(&file.relative);
                }
                Ok(files)
            }
            Stage::Exec { cmd, extname } => {
                for file in files.files.iter_mut() {
                    let env = [
                        ("SITEPIPE_FILE", file.source.display().to_string()),
                        ("SITEPIPE_RELATIVE", file.relative.display().to_string()),
                    ];
                    let output = pipe_through(cmd, &file.contents, file.source.parent(), &env)
                        .await
                        .map_err(|e| PipelineError::transform("exec", &file.source, e.to_string()))?;
                    if !output.success {
                        let message = match output.code {
                            Some(code) => format!("'{cmd}' exited with code {code}: {}", output.stderr.trim()),
                            None => format!("'{cmd}' was terminated: {}", output.stderr.trim()),
                        };
                        return Err(PipelineError::transform("exec", &file.source, message));
                    }
                    file.contents = output.stdout;
                    if let Some(ext) = extname {
                        file.relative = rename::with_extname(&file.relative, ext);
                    }
                }
                Ok(files)
            }
            Stage::MinifyCss(minifier) => {
                for file in files.files.iter_mut() {
                    let text = file
                        .text()
                        .map_err(|e| PipelineError::transform("minify_css", &file.source, e.to_string()))?;
                    let filename = file.relative.display().to_string();
                    let minified = minifier
                        .minify(text, &filename)
                        .map_err(|message| PipelineError::transform("minify_css", &file.source, message))?;
                    file.contents = minified.into_bytes();
                }
                Ok(files)
            }
            Stage::MinifyHtml(minifier) => {
                for file in files.files.iter_mut() {
                    let text = file
                        .text()
                        .map_err(|e| PipelineError::transform("minify_html", &file.source, e.to_string()))?;
                    file.contents = minifier.minify(text).into_bytes();
                }
                Ok(files)
            }
            Stage::SvgSprite(stage) => stage.apply(files),
        }
    }
}

/// A compiled stage plus its profile restriction.
#[derive(Debug)]
pub struct PlannedStage {
    pub stage: Stage,
    pub only: Option<BuildProfile>,
}

impl PlannedStage {
    pub fn compile(config: &StageConfig) -> anyhow::Result<Self> {
        Ok(Self {
            stage: Stage::compile(&config.kind)?,
            only: config.only,
        })
    }

    pub fn enabled_for(&self, profile: BuildProfile) -> bool {
        self.only.is_none_or(|only| only == profile)
    }
}

/// Run every stage enabled for `profile` over `files`, in order.
pub async fn apply_all(
    stages: &[PlannedStage],
    profile: BuildProfile,
    mut files: FileSet,
    ctx: &StageContext,
) -> Result<FileSet> {
    for planned in stages.iter() {
        if !planned.enabled_for(profile) {
            debug!(
                task = %ctx.task,
                stage = planned.stage.name(),
                %profile,
                "stage disabled for profile"
            );
            continue;
        }
        files = planned.stage.apply(files, ctx).await?;
    }
    Ok(files)
}
