// src/notifier.rs

//! Failure notifications.
//!
//! Every task failure is logged. When `[notify].cmd` is set, the command is
//! also run (detached) with `SITEPIPE_TASK` and `SITEPIPE_ERROR` in its
//! environment, e.g. `notify-send "sitepipe: $SITEPIPE_TASK" "$SITEPIPE_ERROR"`.

use std::fmt::Debug;
use std::sync::Arc;

use tracing::{error, warn};

use crate::config::model::NotifySection;
use crate::errors::PipelineError;
use crate::exec::command::shell_command;

pub trait Notifier: Send + Sync + Debug {
    fn notify(&self, task: &str, error: &PipelineError);
}

/// Logs failures at error level.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, task: &str, error: &PipelineError) {
        error!(task = %task, error = %error, "task failed");
    }
}

/// Logs failures and runs a shell command for each one.
#[derive(Debug, Clone)]
pub struct CommandNotifier {
    cmd: String,
}

impl CommandNotifier {
    pub fn new(cmd: impl Into<String>) -> Self {
        Self { cmd: cmd.into() }
    }
}

impl Notifier for CommandNotifier {
    fn notify(&self, task: &str, err: &PipelineError) {
        LogNotifier.notify(task, err);

        let mut command = shell_command(&self.cmd);
        command
            .env("SITEPIPE_TASK", task)
            .env("SITEPIPE_ERROR", err.to_string())
            .kill_on_drop(false);

        match command.spawn() {
            Ok(mut child) => {
                let cmd = self.cmd.clone();
                tokio::spawn(async move {
                    match child.wait().await {
                        Ok(status) if !status.success() => {
                            warn!(cmd = %cmd, exit_code = ?status.code(), "notify command failed");
                        }
                        Ok(_) => {}
                        Err(e) => warn!(cmd = %cmd, error = %e, "waiting for notify command"),
                    }
                });
            }
            Err(e) => warn!(cmd = %self.cmd, error = %e, "could not spawn notify command"),
        }
    }
}

pub fn from_config(section: &NotifySection) -> Arc<dyn Notifier> {
    match &section.cmd {
        Some(cmd) if !cmd.trim().is_empty() => Arc::new(CommandNotifier::new(cmd.clone())),
        _ => Arc::new(LogNotifier),
    }
}
