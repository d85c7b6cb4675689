use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Canonical task name type used throughout the crate.
pub type TaskName = String;

/// Which flavour of build is running.
///
/// Stages tagged with `only = "production"` are skipped in development builds
/// and vice versa. Commands choose a profile through `production = true`; the
/// `--production` CLI flag forces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildProfile {
    #[default]
    Development,
    Production,
}

impl FromStr for BuildProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" => Ok(BuildProfile::Development),
            "production" | "prod" => Ok(BuildProfile::Production),
            other => Err(format!(
                "invalid build profile: {other} (expected \"development\" or \"production\")"
            )),
        }
    }
}

impl fmt::Display for BuildProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildProfile::Development => f.write_str("development"),
            BuildProfile::Production => f.write_str("production"),
        }
    }
}

/// Kind of work a task performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    /// Glob sources, run stages, write to the destination.
    #[default]
    Pipeline,
    /// Empty a directory under the output root.
    Clean,
    /// Upload the output tree to the deploy target.
    Deploy,
    /// Start the watch controller. Never finishes on its own.
    Watch,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskKind::Pipeline => "pipeline",
            TaskKind::Clean => "clean",
            TaskKind::Deploy => "deploy",
            TaskKind::Watch => "watch",
        };
        f.write_str(s)
    }
}
