#![allow(dead_code)]

use std::collections::BTreeMap;

use sitepipe::config::{
    CommandConfig, ConfigFile, ConfigSection, DeploySection, GraphSpec, NotifySection,
    RawConfigFile, StageConfig, StageKind, TaskConfig,
};
use sitepipe::errors::PipelineError;
use sitepipe::types::{BuildProfile, TaskKind};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                notify: NotifySection::default(),
                deploy: None,
                task: BTreeMap::new(),
                command: BTreeMap::new(),
            },
        }
    }

    pub fn src(mut self, src: &str) -> Self {
        self.config.config.src = src.to_string();
        self
    }

    pub fn dest(mut self, dest: &str) -> Self {
        self.config.config.dest = dest.to_string();
        self
    }

    pub fn debounce_ms(mut self, ms: u64) -> Self {
        self.config.config.debounce_ms = ms;
        self
    }

    pub fn with_task(mut self, name: &str, task: TaskConfig) -> Self {
        self.config.task.insert(name.to_string(), task);
        self
    }

    pub fn with_command(mut self, name: &str, graph: Vec<GraphSpec>) -> Self {
        self.config.command.insert(
            name.to_string(),
            CommandConfig {
                production: false,
                graph,
            },
        );
        self
    }

    pub fn with_production_command(mut self, name: &str, graph: Vec<GraphSpec>) -> Self {
        self.config.command.insert(
            name.to_string(),
            CommandConfig {
                production: true,
                graph,
            },
        );
        self
    }

    pub fn with_deploy(mut self, host: &str, parallel: usize) -> Self {
        self.config.deploy = Some(DeploySection {
            host: host.to_string(),
            user: String::new(),
            password: String::new(),
            parallel,
            remote_root: String::new(),
        });
        self
    }

    pub fn try_build(self) -> Result<ConfigFile, PipelineError> {
        ConfigFile::try_from(self.config)
    }

    pub fn build(self) -> ConfigFile {
        self.try_build()
            .expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    /// A pipeline task reading `src` (relative to the source root).
    pub fn pipeline(src: &str) -> Self {
        Self {
            task: TaskConfig {
                src: vec![src.to_string()],
                ..TaskConfig::default()
            },
        }
    }

    pub fn clean() -> Self {
        Self::of_kind(TaskKind::Clean)
    }

    pub fn deploy() -> Self {
        Self::of_kind(TaskKind::Deploy)
    }

    pub fn watch_task() -> Self {
        Self::of_kind(TaskKind::Watch)
    }

    fn of_kind(kind: TaskKind) -> Self {
        Self {
            task: TaskConfig {
                kind,
                ..TaskConfig::default()
            },
        }
    }

    pub fn src(mut self, pattern: &str) -> Self {
        self.task.src.push(pattern.to_string());
        self
    }

    pub fn exclude(mut self, pattern: &str) -> Self {
        self.task.exclude.push(pattern.to_string());
        self
    }

    pub fn base(mut self, base: &str) -> Self {
        self.task.base = Some(base.to_string());
        self
    }

    pub fn dest(mut self, dest: &str) -> Self {
        self.task.dest = Some(dest.to_string());
        self
    }

    pub fn stage(mut self, kind: StageKind) -> Self {
        self.task.stages.push(StageConfig::new(kind));
        self
    }

    pub fn stage_only(mut self, kind: StageKind, profile: BuildProfile) -> Self {
        self.task.stages.push(StageConfig {
            kind,
            only: Some(profile),
        });
        self
    }

    pub fn watch(mut self, pattern: &str) -> Self {
        self.task
            .watch
            .get_or_insert_with(Vec::new)
            .push(pattern.to_string());
        self
    }

    pub fn use_hash(mut self, val: bool) -> Self {
        self.task.use_hash = val;
        self
    }

    pub fn notify(mut self, val: bool) -> Self {
        self.task.notify = Some(val);
        self
    }

    pub fn live_reload(mut self, val: bool) -> Self {
        self.task.live_reload = val;
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}

/// `"name"` in a command graph.
pub fn name(name: &str) -> GraphSpec {
    GraphSpec::Name(name.to_string())
}

/// `{ series = [...] }` in a command graph.
pub fn series(children: Vec<GraphSpec>) -> GraphSpec {
    GraphSpec::Series { series: children }
}

/// `{ parallel = [...] }` in a command graph.
pub fn parallel(children: Vec<GraphSpec>) -> GraphSpec {
    GraphSpec::Parallel { parallel: children }
}
