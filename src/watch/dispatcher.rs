// src/watch/dispatcher.rs

//! Pure watch dispatch state machine.
//!
//! The dispatcher decides which bound tasks to start for a debounced batch of
//! changed paths, and what to do with changes that arrive while a task is
//! still running. It holds no channels or Tokio types, so the coalescing rules
//! can be tested without timers or processes:
//!
//! - a task that is idle starts immediately;
//! - a task that is running gets at most one queued re-run, no matter how many
//!   batches arrive meanwhile;
//! - when a running task completes, its queued re-run (if any) starts.
//!
//! Tasks are independent: one task being busy never delays another.

use std::collections::{BTreeSet, HashSet};

use tracing::debug;

use crate::types::TaskName;
use crate::watch::patterns::WatchRule;

#[derive(Debug)]
pub struct WatchDispatcher {
    rules: Vec<WatchRule>,
    running: HashSet<TaskName>,
    pending: HashSet<TaskName>,
}

impl WatchDispatcher {
    pub fn new(rules: Vec<WatchRule>) -> Self {
        Self {
            rules,
            running: HashSet::new(),
            pending: HashSet::new(),
        }
    }

    /// Tasks bound to rules matching any of `rel_paths`, deduplicated and
    /// sorted by name.
    pub fn tasks_for_paths<'a, I>(&self, rel_paths: I) -> BTreeSet<TaskName>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut tasks = BTreeSet::new();
        for rel in rel_paths {
            for rule in self.rules.iter().filter(|r| r.matches(rel)) {
                if tasks.insert(rule.task().to_string()) {
                    debug!(path = %rel, task = %rule.task(), "path matched watch rule");
                }
            }
        }
        tasks
    }

    /// Feed a batch of triggered tasks; returns the ones to start now.
    ///
    /// Busy tasks are marked for one re-run instead.
    pub fn trigger<I>(&mut self, tasks: I) -> Vec<TaskName>
    where
        I: IntoIterator<Item = TaskName>,
    {
        let mut start = Vec::new();
        for task in tasks {
            if self.running.contains(&task) {
                if self.pending.insert(task.clone()) {
                    debug!(task = %task, "task busy; queued one re-run");
                } else {
                    debug!(task = %task, "task busy with re-run already queued; coalesced");
                }
            } else {
                self.running.insert(task.clone());
                start.push(task);
            }
        }
        start
    }

    /// A run of `task` finished (successfully or not).
    ///
    /// Returns `Some(task)` if a queued re-run should start now; the task then
    /// stays marked as running.
    pub fn complete(&mut self, task: &str) -> Option<TaskName> {
        if self.pending.remove(task) {
            debug!(task = %task, "starting queued re-run");
            return Some(task.to_string());
        }
        self.running.remove(task);
        None
    }

    pub fn is_running(&self, task: &str) -> bool {
        self.running.contains(task)
    }

    pub fn has_pending(&self, task: &str) -> bool {
        self.pending.contains(task)
    }

    /// True when nothing is running and nothing is queued.
    pub fn is_idle(&self) -> bool {
        self.running.is_empty() && self.pending.is_empty()
    }
}
