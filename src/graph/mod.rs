// src/graph/mod.rs

//! Task graphs: ordered compositions of tasks.
//!
//! - [`TaskGraph`] is the value the runner executes: tasks composed with
//!   `series` (in order, stop on first failure) and `parallel` (all at once,
//!   join, fail if any failed).
//! - [`resolve`] turns a `[command.<name>]` from the config into a
//!   [`TaskGraph`], expanding references to other commands.

pub mod resolve;

use std::fmt;

use crate::types::TaskName;

pub use resolve::{resolve_target, ResolvedTarget};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskGraph {
    /// Run a single task through the executor.
    Task(TaskName),
    /// Start the watch controller configured by this watch-kind task.
    Watch(TaskName),
    Series(Vec<TaskGraph>),
    Parallel(Vec<TaskGraph>),
}

impl TaskGraph {
    pub fn task(name: impl Into<TaskName>) -> Self {
        TaskGraph::Task(name.into())
    }

    pub fn series(children: impl IntoIterator<Item = TaskGraph>) -> Self {
        TaskGraph::Series(children.into_iter().collect())
    }

    pub fn parallel(children: impl IntoIterator<Item = TaskGraph>) -> Self {
        TaskGraph::Parallel(children.into_iter().collect())
    }

    /// All leaf task names in execution order (parallel children left to right).
    pub fn task_names(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect(&mut out);
        out
    }

    fn collect<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            TaskGraph::Task(name) | TaskGraph::Watch(name) => out.push(name.as_str()),
            TaskGraph::Series(children) | TaskGraph::Parallel(children) => {
                for child in children {
                    child.collect(out);
                }
            }
        }
    }

    /// True if the graph starts a watch controller somewhere.
    pub fn contains_watch(&self) -> bool {
        match self {
            TaskGraph::Task(_) => false,
            TaskGraph::Watch(_) => true,
            TaskGraph::Series(children) | TaskGraph::Parallel(children) => {
                children.iter().any(TaskGraph::contains_watch)
            }
        }
    }
}

impl fmt::Display for TaskGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (label, children) = match self {
            TaskGraph::Task(name) => return f.write_str(name),
            TaskGraph::Watch(name) => return write!(f, "watch:{name}"),
            TaskGraph::Series(children) => ("series", children),
            TaskGraph::Parallel(children) => ("parallel", children),
        };

        write!(f, "{label}(")?;
        for (i, child) in children.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{child}")?;
        }
        f.write_str(")")
    }
}
