// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::types::{BuildProfile, TaskKind};

/// Configuration exactly as deserialized from TOML, before validation.
///
/// ```toml
/// [config]
/// src = "src"
/// dest = "app"
///
/// [task.fonts]
/// src = ["fonts/**/*.woff2"]
/// dest = "fonts"
///
/// [command.default]
/// graph = ["clean", { parallel = ["fonts", "images"] }, "watch"]
/// ```
///
/// All sections are optional and have reasonable defaults. Turn this into a
/// [`ConfigFile`] with `ConfigFile::try_from`, which runs validation.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    #[serde(default)]
    pub notify: NotifySection,

    #[serde(default)]
    pub deploy: Option<DeploySection>,

    /// All tasks from `[task.<name>]`, keyed by task name.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,

    /// Named entry points from `[command.<name>]`.
    #[serde(default)]
    pub command: BTreeMap<String, CommandConfig>,
}

/// Validated configuration.
///
/// Only obtainable through `TryFrom<RawConfigFile>` (see `validate.rs`), so
/// holders can assume every reference in a command graph resolves and no
/// command includes itself.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub notify: NotifySection,
    pub deploy: Option<DeploySection>,
    pub task: BTreeMap<String, TaskConfig>,
    pub command: BTreeMap<String, CommandConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            config: raw.config,
            notify: raw.notify,
            deploy: raw.deploy,
            task: raw.task,
            command: raw.command,
        }
    }

    pub fn tasks(&self) -> &BTreeMap<String, TaskConfig> {
        &self.task
    }

    pub fn commands(&self) -> &BTreeMap<String, CommandConfig> {
        &self.command
    }
}

/// `[config]` section: where sources live and where output goes.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Source tree root, relative to the config file directory.
    #[serde(default = "default_src")]
    pub src: String,

    /// Output tree root, relative to the config file directory.
    #[serde(default = "default_dest")]
    pub dest: String,

    /// Window over which file change events are coalesced before dispatch.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_src() -> String {
    "src".to_string()
}

fn default_dest() -> String {
    "app".to_string()
}

fn default_debounce_ms() -> u64 {
    100
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            src: default_src(),
            dest: default_dest(),
            debounce_ms: default_debounce_ms(),
        }
    }
}

/// `[notify]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotifySection {
    /// Shell command run on task failure. `SITEPIPE_TASK` and `SITEPIPE_ERROR`
    /// are set in its environment. Without it failures are only logged.
    #[serde(default)]
    pub cmd: Option<String>,
}

/// `[deploy]` section: the connection descriptor for the remote store.
#[derive(Debug, Clone, Deserialize)]
pub struct DeploySection {
    pub host: String,

    #[serde(default)]
    pub user: String,

    #[serde(default)]
    pub password: String,

    /// Maximum number of simultaneous uploads.
    #[serde(default = "default_parallel")]
    pub parallel: usize,

    /// Directory on the remote side that mirrors the output root.
    #[serde(default)]
    pub remote_root: String,
}

fn default_parallel() -> usize {
    10
}

/// `[task.<name>]` section.
///
/// Which fields matter depends on `kind`:
/// - `pipeline`: `src`, `exclude`, `base`, `dest`, `stages`
/// - `clean`: `dest` (directory to empty, default: the whole output root)
/// - `deploy`: `src` (defaults to everything under the output root)
/// - `watch`: `live_reload`
///
/// `watch` patterns and `use_hash` apply to any task that a watch-kind task
/// should re-run on change.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskConfig {
    #[serde(default)]
    pub kind: TaskKind,

    /// Source globs, relative to `[config].src`.
    #[serde(default)]
    pub src: Vec<String>,

    /// Globs removed from the `src` match.
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Directory (relative to `[config].src`) that output paths are made
    /// relative to. Defaults to the literal prefix of each `src` glob.
    #[serde(default)]
    pub base: Option<String>,

    /// Output directory relative to `[config].dest`.
    #[serde(default)]
    pub dest: Option<String>,

    /// Ordered transform stages.
    #[serde(default)]
    pub stages: Vec<StageConfig>,

    /// Globs (relative to `[config].src`) that re-run this task in watch mode.
    #[serde(default)]
    pub watch: Option<Vec<String>>,

    /// Only re-run when the watched content actually changed.
    #[serde(default)]
    pub use_hash: bool,

    /// Send failures of this task to the `[notify]` command. Defaults to true.
    #[serde(default)]
    pub notify: Option<bool>,

    /// For watch-kind tasks: log reload signals for connected viewers.
    #[serde(default)]
    pub live_reload: bool,
}

impl TaskConfig {
    pub fn effective_notify(&self) -> bool {
        self.notify.unwrap_or(true)
    }

    pub fn effective_dest(&self) -> &str {
        self.dest.as_deref().unwrap_or("")
    }
}

/// One entry of a task's `stages = [...]` list.
#[derive(Debug, Clone, Deserialize)]
pub struct StageConfig {
    #[serde(flatten)]
    pub kind: StageKind,

    /// Restrict the stage to one build profile.
    #[serde(default)]
    pub only: Option<BuildProfile>,
}

impl StageConfig {
    pub fn new(kind: StageKind) -> Self {
        Self { kind, only: None }
    }

    pub fn enabled_for(&self, profile: BuildProfile) -> bool {
        self.only.is_none_or(|only| only == profile)
    }
}

/// Stage parameters, tagged by `stage = "<name>"`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum StageKind {
    /// Expand `<prefix>include('file')` directives.
    Include {
        #[serde(default = "default_include_prefix")]
        prefix: String,
        /// `"@file"` (relative to the including file), `"@root"` (the source
        /// root) or a directory relative to the source root.
        #[serde(default = "default_include_basepath")]
        basepath: String,
    },
    Rename {
        #[serde(default)]
        prefix: Option<String>,
        #[serde(default)]
        suffix: Option<String>,
        #[serde(default)]
        extname: Option<String>,
        #[serde(default)]
        dirname: Option<String>,
    },
    /// Pipe each file through a shell command (stdin to stdout).
    Exec {
        cmd: String,
        #[serde(default)]
        extname: Option<String>,
    },
    MinifyCss {
        /// Browserslist queries, e.g. `["last 5 versions"]`.
        #[serde(default)]
        browsers: Vec<String>,
    },
    MinifyHtml,
    SvgSprite {
        #[serde(default = "default_sprite_output")]
        output: String,
    },
}

fn default_include_prefix() -> String {
    "@@".to_string()
}

fn default_include_basepath() -> String {
    "@file".to_string()
}

fn default_sprite_output() -> String {
    "sprite.svg".to_string()
}

/// `[command.<name>]` section: a named graph the CLI can run.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandConfig {
    /// Run with the production profile.
    #[serde(default)]
    pub production: bool,

    /// Top-level series.
    pub graph: Vec<GraphSpec>,
}

/// A node of a command graph as written in TOML.
///
/// Strings name a task or another command; inline tables nest compositions:
/// `{ parallel = ["a", "b"] }`, `{ series = ["c", "d"] }`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum GraphSpec {
    Name(String),
    Series { series: Vec<GraphSpec> },
    Parallel { parallel: Vec<GraphSpec> },
}

impl GraphSpec {
    /// Every name referenced anywhere below this node, in order.
    pub fn referenced_names(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_names(&mut out);
        out
    }

    fn collect_names<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            GraphSpec::Name(name) => out.push(name.as_str()),
            GraphSpec::Series { series: children }
            | GraphSpec::Parallel { parallel: children } => {
                for child in children {
                    child.collect_names(out);
                }
            }
        }
    }
}
