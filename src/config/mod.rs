// src/config/mod.rs

//! Configuration loading and validation.
//!
//! - `model.rs`: the TOML-backed data model.
//! - `loader.rs`: reading a config file from disk.
//! - `validate.rs`: turning a [`RawConfigFile`] into a checked [`ConfigFile`].

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, parse_str};
pub use model::{
    CommandConfig, ConfigFile, ConfigSection, DeploySection, GraphSpec, NotifySection,
    RawConfigFile, StageConfig, StageKind, TaskConfig,
};
