// src/exec/command.rs

//! Running external tools: piping file contents through shell commands.
//!
//! The `exec` stage uses this to hand each file to tools like `sass --stdin`
//! or `terser`, and the command notifier uses it to fire desktop notifications.

use std::path::Path;
use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

/// Output of a piped command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: String,
}

/// Build a shell command appropriate for the platform.
pub fn shell_command(cmd: &str) -> Command {
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(cmd);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(cmd);
        c
    }
}

/// Run `cmd` with `input` on stdin and collect stdout/stderr.
///
/// `cwd` is only applied when it is an existing directory. A non-zero exit is
/// reported through [`CommandOutput::success`], not as an error; errors mean
/// the process could not be spawned or talked to.
pub async fn pipe_through(
    cmd: &str,
    input: &[u8],
    cwd: Option<&Path>,
    env: &[(&str, String)],
) -> Result<CommandOutput> {
    let mut command = shell_command(cmd);
    command
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    if let Some(dir) = cwd.filter(|d| d.is_dir()) {
        command.current_dir(dir);
    }
    for (key, value) in env {
        command.env(key, value);
    }

    let mut child = command
        .spawn()
        .with_context(|| format!("spawning process for command '{cmd}'"))?;

    // Feed stdin from a separate task so a chatty child cannot deadlock us
    // while its stdout pipe fills up.
    if let Some(mut stdin) = child.stdin.take() {
        let input = input.to_vec();
        tokio::spawn(async move {
            if let Err(e) = stdin.write_all(&input).await {
                debug!(error = %e, "child closed stdin early");
            }
        });
    }

    let output = child
        .wait_with_output()
        .await
        .with_context(|| format!("waiting for command '{cmd}'"))?;

    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    if !output.status.success() {
        warn!(
            cmd = %cmd,
            exit_code = ?output.status.code(),
            "command exited with failure"
        );
    }

    Ok(CommandOutput {
        success: output.status.success(),
        code: output.status.code(),
        stdout: output.stdout,
        stderr,
    })
}
