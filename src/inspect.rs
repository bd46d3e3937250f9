//! Inspection of installed component state.
//!
//! The inspector reads the host without side effects: it runs a
//! component's detection probe, pattern-matches a version out of the
//! output, and for environment-scoped packages confirms the resolved
//! location actually lies under the venv root. A package importable from
//! anywhere else is "not installed in scope", not a version match.
//!
//! Absence is not an error: a missing executable simply yields no
//! detected version. Output that is present but unparsable is surfaced as
//! a warning and later treated as a mismatch.

use crate::catalog::{Component, Probe};
use crate::context::RunContext;
use crate::version::{extract_version, Version};
use serde::Serialize;
use std::path::PathBuf;
use tracing::warn;

/// Observed state of one component. Produced fresh on every inspection,
/// never mutated.
#[derive(Debug, Clone, Serialize)]
pub struct InstalledState {
    /// Component name.
    pub component: String,
    /// Detected version, if the component is installed in scope.
    pub detected_version: Option<Version>,
    /// Resolved install location, when the probe can report one.
    pub install_path: Option<PathBuf>,
    /// The probe produced output but no version could be parsed from it.
    pub parse_failed: bool,
    /// The package resolved to a location outside the venv root.
    pub out_of_scope: bool,
}

impl InstalledState {
    fn absent(component: &str) -> Self {
        Self {
            component: component.to_string(),
            detected_version: None,
            install_path: None,
            parse_failed: false,
            out_of_scope: false,
        }
    }
}

/// Reads component state from the host through the run context.
pub struct Inspector<'a> {
    ctx: &'a RunContext<'a>,
}

impl<'a> Inspector<'a> {
    /// Create an inspector over a run context.
    pub fn new(ctx: &'a RunContext<'a>) -> Self {
        Self { ctx }
    }

    /// Inspect one component, producing its observed state.
    pub fn inspect(&self, component: &Component) -> InstalledState {
        match &component.probe {
            Probe::Command { command } => self.probe_command(component, command),
            Probe::VenvPackage { package } => self.probe_venv_package(component, package),
            Probe::GlobalModule { module } => self.probe_global_module(component, module),
        }
    }

    /// Run a version-reporting command and pattern-match its output.
    fn probe_command(&self, component: &Component, command: &str) -> InstalledState {
        let result = match self.ctx.runner.run(command, &self.ctx.command_options()) {
            Ok(r) => r,
            Err(_) => return InstalledState::absent(&component.name),
        };

        // Command not found (or any failure) means not installed.
        if !result.success {
            return InstalledState::absent(&component.name);
        }

        let output = result.combined_output();
        match extract_version(&output) {
            Some(version) => InstalledState {
                detected_version: Some(version),
                ..InstalledState::absent(&component.name)
            },
            None => {
                warn!(
                    component = component.name.as_str(),
                    "version output was unparsable: {}",
                    output.trim()
                );
                InstalledState {
                    parse_failed: true,
                    ..InstalledState::absent(&component.name)
                }
            }
        }
    }

    /// Query the venv's pip for a package, confirming the resolved
    /// location lies under the venv root.
    fn probe_venv_package(&self, component: &Component, package: &str) -> InstalledState {
        let command = format!("{} show {}", self.ctx.venv_pip().display(), package);
        let result = match self.ctx.runner.run(&command, &self.ctx.command_options()) {
            Ok(r) => r,
            Err(_) => return InstalledState::absent(&component.name),
        };

        if !result.success {
            return InstalledState::absent(&component.name);
        }

        let version = field_value(&result.stdout, "Version").and_then(|v| extract_version(v));
        let location = field_value(&result.stdout, "Location").map(PathBuf::from);

        let Some(version) = version else {
            warn!(
                component = component.name.as_str(),
                "pip reported the package but no version could be parsed"
            );
            return InstalledState {
                install_path: location,
                parse_failed: true,
                ..InstalledState::absent(&component.name)
            };
        };

        // Installed somewhere, but not in our environment: out of scope.
        if let Some(loc) = &location {
            if !self.ctx.in_venv(loc) {
                return InstalledState {
                    install_path: location,
                    out_of_scope: true,
                    ..InstalledState::absent(&component.name)
                };
            }
        }

        InstalledState {
            detected_version: Some(version),
            install_path: location,
            ..InstalledState::absent(&component.name)
        }
    }

    /// Query the global module installer for a module and its root.
    fn probe_global_module(&self, component: &Component, module: &str) -> InstalledState {
        let command = format!("npm ls -g {} --depth=0", module);
        let result = match self.ctx.runner.run(&command, &self.ctx.command_options()) {
            Ok(r) => r,
            Err(_) => return InstalledState::absent(&component.name),
        };

        // npm ls exits non-zero when the module is not installed.
        if !result.success {
            return InstalledState::absent(&component.name);
        }

        let version = module_version(&result.stdout, module);
        let install_path = self.global_module_root().map(|root| root.join(module));

        match version {
            Some(version) => InstalledState {
                detected_version: Some(version),
                install_path,
                ..InstalledState::absent(&component.name)
            },
            None => {
                warn!(
                    component = component.name.as_str(),
                    "global module listing was unparsable"
                );
                InstalledState {
                    install_path,
                    parse_failed: true,
                    ..InstalledState::absent(&component.name)
                }
            }
        }
    }

    fn global_module_root(&self) -> Option<PathBuf> {
        self.ctx
            .runner
            .run("npm root -g", &self.ctx.command_options())
            .ok()
            .filter(|r| r.success)
            .map(|r| PathBuf::from(r.stdout.trim()))
            .filter(|p| !p.as_os_str().is_empty())
    }
}

/// Extract a `Field: value` line from pip-show-style output.
fn field_value<'o>(output: &'o str, field: &str) -> Option<&'o str> {
    output.lines().find_map(|line| {
        line.strip_prefix(field)
            .and_then(|rest| rest.strip_prefix(':'))
            .map(str::trim)
    })
}

/// Pull `<module>@<version>` out of an `npm ls` listing.
fn module_version(output: &str, module: &str) -> Option<Version> {
    let marker = format!("{}@", module);
    let idx = output.find(&marker)?;
    let rest = &output[idx + marker.len()..];
    let token: String = rest
        .chars()
        .take_while(|c| !c.is_whitespace())
        .collect();
    extract_version(&token)
}
