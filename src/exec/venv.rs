//! Virtual environment lifecycle and package installs.
//!
//! The venv directory is fully owned by the run. Whenever environment
//! setup happens it is destroyed and recreated from the pinned
//! interpreter, never merged with a prior partial state; manual changes
//! inside it are discarded. Creation failure is the run's one fatal
//! prerequisite.

use crate::context::RunContext;
use crate::error::{Result, ToolpinError};
use crate::version::Version;
use std::fs;
use tracing::debug;

/// Interpreter used to create the environment. This is the pinned
/// CPython's altinstall binary name.
pub const VENV_INTERPRETER: &str = "python3.11";

/// Destroy and recreate the virtual environment.
pub fn recreate(ctx: &RunContext<'_>) -> Result<()> {
    match fs::remove_dir_all(&ctx.venv_root) {
        Ok(()) => debug!("removed previous environment at {}", ctx.venv_root.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            return Err(ToolpinError::Prerequisite {
                message: format!(
                    "could not remove previous environment at {}: {}",
                    ctx.venv_root.display(),
                    e
                ),
            })
        }
    }

    let command = format!("{} -m venv {}", VENV_INTERPRETER, ctx.venv_root.display());
    let result = ctx
        .runner
        .run(&command, &ctx.command_options())
        .map_err(|e| ToolpinError::Prerequisite {
            message: format!("environment creation could not be started: {}", e),
        })?;

    if result.success {
        Ok(())
    } else {
        Err(ToolpinError::Prerequisite {
            message: format!("environment creation failed: {}", result.error_detail()),
        })
    }
}

/// Install an exact-pin package through the venv's own pip.
///
/// The pip binary lives under the venv root, so the install cannot write
/// into the system namespace.
pub fn install_package(
    package: &str,
    version: &Version,
    ctx: &RunContext<'_>,
) -> std::result::Result<(), String> {
    let pip = ctx.venv_pip();
    debug_assert!(ctx.in_venv(&pip));

    let command = format!("{} install {}=={}", pip.display(), package, version);
    match ctx.runner.run(&command, &ctx.command_options()) {
        Ok(result) if result.success => Ok(()),
        Ok(result) => Err(format!("pip install failed: {}", result.error_detail())),
        Err(e) => Err(format!("pip could not be run: {}", e)),
    }
}
