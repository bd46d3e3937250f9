//! The command-runner seam.
//!
//! Everything the engine does to the host goes through [`CommandRunner`],
//! so the inspector, executor, and convergence loop can be exercised in
//! tests against a scripted fake instead of a real machine.

use crate::error::Result;
use crate::shell::command::{self, CommandOptions, CommandResult};

/// Runs shell commands on behalf of the engine.
pub trait CommandRunner {
    /// Run a command and capture its result. Spawn failures are errors;
    /// non-zero exits are ordinary results.
    fn run(&self, command: &str, options: &CommandOptions) -> Result<CommandResult>;
}

/// Production runner backed by the process shell.
#[derive(Debug, Default)]
pub struct ShellRunner;

impl CommandRunner for ShellRunner {
    fn run(&self, cmd: &str, options: &CommandOptions) -> Result<CommandResult> {
        command::execute(cmd, options)
    }
}
