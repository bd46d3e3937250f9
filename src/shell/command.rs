//! Shell command execution.

use crate::error::{Result, ToolpinError};
use std::collections::HashMap;
use std::io::Read;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// Result of executing a shell command.
#[derive(Debug, Clone)]
pub struct CommandResult {
    /// Exit code (None if killed by signal or timeout).
    pub exit_code: Option<i32>,

    /// Standard output.
    pub stdout: String,

    /// Standard error.
    pub stderr: String,

    /// Execution duration.
    pub duration: Duration,

    /// Whether the command succeeded (exit code 0).
    pub success: bool,
}

impl CommandResult {
    /// Create a success result.
    pub fn success(stdout: String, stderr: String, duration: Duration) -> Self {
        Self {
            exit_code: Some(0),
            stdout,
            stderr,
            duration,
            success: true,
        }
    }

    /// Create a failure result.
    pub fn failure(
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
        duration: Duration,
    ) -> Self {
        Self {
            exit_code,
            stdout,
            stderr,
            duration,
            success: false,
        }
    }

    /// Combined stdout + stderr, for version pattern matching. Some
    /// tools (older CPython among them) report their version on stderr.
    pub fn combined_output(&self) -> String {
        let mut out = self.stdout.clone();
        if !self.stderr.is_empty() {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(&self.stderr);
        }
        out
    }

    /// A short human-readable failure detail: exit code plus the tail of
    /// stderr (or stdout if stderr is empty).
    pub fn error_detail(&self) -> String {
        let stream = if self.stderr.trim().is_empty() {
            &self.stdout
        } else {
            &self.stderr
        };
        let tail: Vec<&str> = stream.lines().rev().take(5).collect();
        let tail: Vec<&str> = tail.into_iter().rev().collect();
        match self.exit_code {
            Some(code) => format!("exit code {}: {}", code, tail.join(" | ")),
            None => format!("killed: {}", tail.join(" | ")),
        }
    }
}

/// Options for command execution.
#[derive(Debug, Clone, Default)]
pub struct CommandOptions {
    /// Working directory.
    pub cwd: Option<std::path::PathBuf>,

    /// Environment variables (merged with the system environment).
    pub env: HashMap<String, String>,

    /// Timeout in seconds. None means the command blocks until it
    /// exits.
    pub timeout: Option<u64>,
}

/// Execute a shell command, capturing output.
pub fn execute(command: &str, options: &CommandOptions) -> Result<CommandResult> {
    let start = Instant::now();

    let mut cmd = Command::new(detect_shell());
    cmd.arg("-c");
    cmd.arg(command);

    if let Some(cwd) = &options.cwd {
        cmd.current_dir(cwd);
    }

    for (key, value) in &options.env {
        cmd.env(key, value);
    }

    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    match options.timeout {
        None => {
            let output = cmd.output().map_err(|_| ToolpinError::CommandFailed {
                command: command.to_string(),
                code: None,
            })?;

            let duration = start.elapsed();
            let stdout = String::from_utf8_lossy(&output.stdout).to_string();
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();

            if output.status.success() {
                Ok(CommandResult::success(stdout, stderr, duration))
            } else {
                Ok(CommandResult::failure(
                    output.status.code(),
                    stdout,
                    stderr,
                    duration,
                ))
            }
        }
        Some(secs) => execute_with_deadline(cmd, command, Duration::from_secs(secs), start),
    }
}

/// Spawn the command and poll for completion, killing the child when the
/// deadline passes. Output is drained on reader threads so a chatty child
/// cannot deadlock on a full pipe.
fn execute_with_deadline(
    mut cmd: Command,
    command: &str,
    deadline: Duration,
    start: Instant,
) -> Result<CommandResult> {
    let mut child = cmd.spawn().map_err(|_| ToolpinError::CommandFailed {
        command: command.to_string(),
        code: None,
    })?;

    let mut stdout_pipe = child.stdout.take();
    let mut stderr_pipe = child.stderr.take();

    let stdout_handle = thread::spawn(move || {
        let mut buf = String::new();
        if let Some(pipe) = stdout_pipe.as_mut() {
            let _ = pipe.read_to_string(&mut buf);
        }
        buf
    });
    let stderr_handle = thread::spawn(move || {
        let mut buf = String::new();
        if let Some(pipe) = stderr_pipe.as_mut() {
            let _ = pipe.read_to_string(&mut buf);
        }
        buf
    });

    let mut timed_out = false;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break Some(status),
            Ok(None) => {
                if start.elapsed() >= deadline {
                    let _ = child.kill();
                    timed_out = true;
                    break child.wait().ok();
                }
                thread::sleep(Duration::from_millis(50));
            }
            Err(_) => break None,
        }
    };

    let stdout = stdout_handle.join().unwrap_or_default();
    let mut stderr = stderr_handle.join().unwrap_or_default();
    let duration = start.elapsed();

    if timed_out {
        stderr.push_str(&format!(
            "\ntoolpin: command timed out after {}s",
            deadline.as_secs()
        ));
        return Ok(CommandResult::failure(None, stdout, stderr, duration));
    }

    match status {
        Some(status) if status.success() => Ok(CommandResult::success(stdout, stderr, duration)),
        Some(status) => Ok(CommandResult::failure(
            status.code(),
            stdout,
            stderr,
            duration,
        )),
        None => Err(ToolpinError::CommandFailed {
            command: command.to_string(),
            code: None,
        }),
    }
}

/// The shell used to interpret commands.
fn detect_shell() -> String {
    std::env::var("SHELL").unwrap_or_else(|_| "/bin/sh".to_string())
}
