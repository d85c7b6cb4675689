// src/exec/mod.rs

//! Task execution layer.
//!
//! - [`registry`] resolves configured tasks into runnable [`TaskSpec`]s.
//! - [`backend`] provides the [`TaskExecutor`] trait and the production
//!   [`PipelineExecutor`], which tests replace with a fake.
//! - [`pipeline`] and [`clean`] implement the task kinds that touch the
//!   local tree; deploy lives in `crate::deploy`.
//! - [`command`] runs external processes for the `exec` stage and notifier.

pub mod backend;
pub mod clean;
pub mod command;
pub mod pipeline;
pub mod registry;

pub use backend::{PipelineExecutor, TaskExecutor, TaskReport};
pub use registry::{TaskRegistry, TaskSpec};
