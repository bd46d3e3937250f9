//! Execution of reconciliation decisions.
//!
//! One decision in, exactly one [`ExecutionResult`] out. Removal failures
//! are warnings (stale files left behind do not abort the run), while a
//! non-zero exit from any mandatory install step fails that component and
//! the run moves on to the next one.

use crate::catalog::{Component, InstallStrategy};
use crate::context::RunContext;
use crate::exec::{source_build, venv};
use crate::reconcile::{Action, Decision};
use serde::Serialize;
use tracing::warn;

/// Result of executing one component's decision.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    /// Component name.
    pub component: String,
    /// Whether the action completed.
    pub succeeded: bool,
    /// Captured failure detail, when it did not.
    pub error_detail: Option<String>,
}

impl ExecutionResult {
    /// A successful (or no-op) execution.
    pub fn ok(component: &str) -> Self {
        Self {
            component: component.to_string(),
            succeeded: true,
            error_detail: None,
        }
    }

    /// A failed execution with captured detail.
    pub fn failed(component: &str, detail: impl Into<String>) -> Self {
        Self {
            component: component.to_string(),
            succeeded: false,
            error_detail: Some(detail.into()),
        }
    }
}

/// Applies decisions to the host through the run context.
pub struct Executor<'a> {
    ctx: &'a RunContext<'a>,
}

impl<'a> Executor<'a> {
    /// Create an executor over a run context.
    pub fn new(ctx: &'a RunContext<'a>) -> Self {
        Self { ctx }
    }

    /// Execute one decision.
    ///
    /// `env_recreated` reports that the virtual environment was wiped
    /// this run: venv-scoped components decided Keep still need their
    /// package put back, since the environment never merges with prior
    /// state.
    pub fn execute(
        &self,
        component: &Component,
        decision: &Decision,
        env_recreated: bool,
    ) -> ExecutionResult {
        match decision.action {
            Action::Keep => {
                if env_recreated && component.is_venv_scoped() {
                    self.install(component)
                } else {
                    ExecutionResult::ok(&component.name)
                }
            }
            Action::Install => self.install(component),
            Action::Reinstall => {
                self.remove(component);
                self.install(component)
            }
        }
    }

    /// Run the component's removal commands in order. Non-zero exits are
    /// logged and ignored.
    fn remove(&self, component: &Component) {
        for template in &component.removal_commands {
            let command = self.ctx.resolve(template);
            match self.ctx.runner.run(&command, &self.ctx.command_options()) {
                Ok(result) if result.success => {}
                Ok(result) => warn!(
                    component = component.name.as_str(),
                    "removal command '{}' failed: {}",
                    command,
                    result.error_detail()
                ),
                Err(e) => warn!(
                    component = component.name.as_str(),
                    "removal command '{}' could not run: {}", command, e
                ),
            }
        }
    }

    /// Dispatch the install per strategy.
    fn install(&self, component: &Component) -> ExecutionResult {
        let version = &component.required_version;
        let outcome = match &component.strategy {
            InstallStrategy::BuildFromSource(build) => {
                source_build::build_and_install(&component.name, build, self.ctx)
            }
            InstallStrategy::PackageManager { package }
            | InstallStrategy::LanguageRuntimePackage { package } => {
                venv::install_package(package, version, self.ctx)
            }
            InstallStrategy::GlobalModuleInstall { module } => {
                self.run_install_command(&format!("npm install -g {}@{}", module, version))
            }
            InstallStrategy::SystemPackage { package } => self.run_install_command(&format!(
                "apt-get install -y --allow-downgrades {}={}*",
                package, version
            )),
        };

        match outcome {
            Ok(()) => ExecutionResult::ok(&component.name),
            Err(detail) => ExecutionResult::failed(&component.name, detail),
        }
    }

    fn run_install_command(&self, command: &str) -> std::result::Result<(), String> {
        match self.ctx.runner.run(command, &self.ctx.command_options()) {
            Ok(result) if result.success => Ok(()),
            Ok(result) => Err(format!("'{}' failed: {}", command, result.error_detail())),
            Err(e) => Err(format!("'{}' could not be started: {}", command, e)),
        }
    }
}
