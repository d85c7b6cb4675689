use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use sitepipe::errors::{PipelineError, Result};
use sitepipe::exec::{TaskExecutor, TaskReport};
use sitepipe::notifier::Notifier;

/// One observation made by [`FakeExecutor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecEvent {
    Started(String),
    Finished(String),
}

#[derive(Debug, Clone, Default)]
struct Behaviour {
    delay: Option<Duration>,
    fail: bool,
    panic_first: bool,
}

/// A fake executor that:
/// - records when each task starts and finishes
/// - sleeps for a configured delay, if any
/// - fails tasks marked with [`FakeExecutor::fail`] with a transform error
///   (or a connection error, see [`FakeExecutor::fail_connection`])
/// - panics on the first run of tasks marked with [`FakeExecutor::panic_once`].
#[derive(Clone, Default)]
pub struct FakeExecutor {
    events: Arc<Mutex<Vec<ExecEvent>>>,
    behaviours: HashMap<String, Behaviour>,
    silent: Vec<String>,
    panicked: Arc<Mutex<HashSet<String>>>,
    connection_failures: Vec<String>,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delay(mut self, task: &str, delay: Duration) -> Self {
        self.behaviours.entry(task.to_string()).or_default().delay = Some(delay);
        self
    }

    pub fn fail(mut self, task: &str) -> Self {
        self.behaviours.entry(task.to_string()).or_default().fail = true;
        self
    }

    /// Fail `task` with a connection error instead of a transform error.
    pub fn fail_connection(mut self, task: &str) -> Self {
        self.behaviours.entry(task.to_string()).or_default().fail = true;
        self.connection_failures.push(task.to_string());
        self
    }

    /// Panic during the first run of `task`; later runs behave normally.
    pub fn panic_once(mut self, task: &str) -> Self {
        self.behaviours.entry(task.to_string()).or_default().panic_first = true;
        self
    }

    /// Opt `task` out of notifications.
    pub fn silent(mut self, task: &str) -> Self {
        self.silent.push(task.to_string());
        self
    }

    /// Shared handle to the event log; survives moving the executor into a runner.
    pub fn events_handle(&self) -> Arc<Mutex<Vec<ExecEvent>>> {
        Arc::clone(&self.events)
    }

    pub fn events(&self) -> Vec<ExecEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Task names in start order.
    pub fn started(&self) -> Vec<String> {
        started(&self.events())
    }
}

/// Task names in start order.
pub fn started(events: &[ExecEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            ExecEvent::Started(name) => Some(name.clone()),
            ExecEvent::Finished(_) => None,
        })
        .collect()
}

/// Index of an event in the log, for ordering assertions.
pub fn position(events: &[ExecEvent], event: &ExecEvent) -> Option<usize> {
    events.iter().position(|e| e == event)
}

impl TaskExecutor for FakeExecutor {
    fn execute<'a>(
        &'a self,
        task: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<TaskReport>> + Send + 'a>> {
        let behaviour = self.behaviours.get(task).cloned().unwrap_or_default();
        let events = Arc::clone(&self.events);
        let panicked = Arc::clone(&self.panicked);
        let connection = self.connection_failures.iter().any(|t| t == task);

        Box::pin(async move {
            events
                .lock()
                .unwrap()
                .push(ExecEvent::Started(task.to_string()));

            if behaviour.panic_first && panicked.lock().unwrap().insert(task.to_string()) {
                panic!("simulated panic in {task}");
            }

            if let Some(delay) = behaviour.delay {
                tokio::time::sleep(delay).await;
            }

            events
                .lock()
                .unwrap()
                .push(ExecEvent::Finished(task.to_string()));

            if behaviour.fail && connection {
                return Err(PipelineError::Connection(format!("{task}: simulated outage")));
            }
            if behaviour.fail {
                return Err(PipelineError::transform(
                    "exec",
                    format!("{task}.src"),
                    "simulated failure",
                ));
            }
            Ok(TaskReport::new(task, vec![PathBuf::from(format!("{task}.out"))]))
        })
    }

    fn notifies(&self, task: &str) -> bool {
        !self.silent.iter().any(|t| t == task)
    }
}

/// Notifier that records `(task, error message)` pairs.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    seen: Arc<Mutex<Vec<(String, String)>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seen(&self) -> Vec<(String, String)> {
        self.seen.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, task: &str, error: &PipelineError) {
        self.seen
            .lock()
            .unwrap()
            .push((task.to_string(), error.to_string()));
    }
}
