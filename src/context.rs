//! The run context threaded through inspection and execution.
//!
//! Everything a run needs to touch the host travels together as one
//! explicit value: the venv root, the command runner, and the optional
//! per-command timeout. Nothing reads ambient process state, so two
//! contexts never interfere and tests can substitute the runner.

use crate::shell::{CommandOptions, CommandRunner};
use std::path::{Path, PathBuf};

/// Explicit context for a convergence run.
pub struct RunContext<'a> {
    /// Root of the isolated virtual environment. Fully owned by the run:
    /// it is destroyed and recreated whenever environment setup happens.
    pub venv_root: PathBuf,
    /// Seam through which every host command runs.
    pub runner: &'a dyn CommandRunner,
    /// Per-command timeout in seconds. None means commands block until
    /// they exit.
    pub timeout: Option<u64>,
}

impl<'a> RunContext<'a> {
    /// Create a context.
    pub fn new(venv_root: PathBuf, runner: &'a dyn CommandRunner, timeout: Option<u64>) -> Self {
        Self {
            venv_root,
            runner,
            timeout,
        }
    }

    /// The venv's pip binary.
    pub fn venv_pip(&self) -> PathBuf {
        self.venv_root.join("bin").join("pip")
    }

    /// Interpolate `{venv}` in a command template.
    pub fn resolve(&self, template: &str) -> String {
        template.replace("{venv}", &self.venv_root.to_string_lossy())
    }

    /// Whether a path lies under the venv root.
    pub fn in_venv(&self, path: &Path) -> bool {
        path.starts_with(&self.venv_root)
    }

    /// Base command options carrying the configured timeout.
    pub fn command_options(&self) -> CommandOptions {
        CommandOptions {
            timeout: self.timeout,
            ..Default::default()
        }
    }
}

/// Default venv root: under the user's download directory, falling back
/// to the home directory when no download directory is known.
pub fn default_venv_root() -> PathBuf {
    dirs::download_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("toolpin-venv")
}
