// src/watch/mod.rs

//! Watch mode: which file changes re-run which tasks.
//!
//! - [`patterns`] compiles each task's `watch` globs into a [`WatchRule`].
//! - [`dispatcher`] is the pure coalescing core.
//! - [`hash`] implements `use_hash` content checks.
//! - [`watcher`] is the notify-backed event source.
//!
//! The async loop that ties these to task execution lives in
//! `engine::watch_loop`.

pub mod dispatcher;
pub mod hash;
pub mod path_utils;
pub mod patterns;
pub mod watcher;

pub use dispatcher::WatchDispatcher;
pub use hash::{compute_file_hash, compute_rule_hash, HashMemo};
pub use patterns::{build_watch_rules, WatchRule};
pub use watcher::{spawn_watcher, WatcherHandle};
