// src/engine/mod.rs

//! Orchestration engine.
//!
//! [`Runner`] walks a resolved [`crate::graph::TaskGraph`], running leaves
//! through a [`crate::exec::TaskExecutor`]. A watch leaf hands control to
//! [`watch_loop`], which re-runs bound tasks on file changes until its change
//! source closes or the process is interrupted.

pub mod runner;
pub mod watch_loop;

pub use runner::Runner;
pub use watch_loop::WatchSetup;
