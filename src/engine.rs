//! The convergence engine: one pass from observed state to verified state.
//!
//! Control flow is a single sequential sweep, never a loop: inspect every
//! component, decide every component, apply the decisions in catalog
//! order, re-inspect, report. Component failures are collected, not
//! raised. The one exception is the virtual environment itself, whose
//! creation failure marks every venv-scoped component failed without an
//! execution attempt while system-scoped components still run.

use crate::catalog::Component;
use crate::context::RunContext;
use crate::exec::{venv, ExecutionResult, Executor};
use crate::inspect::{InstalledState, Inspector};
use crate::reconcile::{decide, Action, Decision};
use crate::verify::VerificationReport;
use tracing::{debug, info};

/// Progress events emitted during a run.
#[derive(Debug)]
pub enum RunProgress<'a> {
    /// A component is being inspected.
    Inspecting { component: &'a str },
    /// A decision was reached for a component.
    Decided { decision: &'a Decision },
    /// The virtual environment is being destroyed and recreated.
    EnvironmentRecreating,
    /// The virtual environment could not be created.
    EnvironmentFailed { message: &'a str },
    /// A component's action is being executed.
    Executing { component: &'a str, action: Action },
    /// A component's execution finished.
    Executed { result: &'a ExecutionResult },
    /// Post-execution re-inspection is starting.
    Reverifying,
}

/// A planned step: observed state plus the decision derived from it.
#[derive(Debug)]
pub struct PlanEntry {
    /// Observed state before execution.
    pub state: InstalledState,
    /// The reconciliation decision.
    pub decision: Decision,
}

/// Everything a run produced for one component.
#[derive(Debug)]
pub struct ComponentOutcome {
    /// State observed before execution.
    pub initial: InstalledState,
    /// The decision that was applied.
    pub decision: Decision,
    /// The execution result (exactly one per component).
    pub execution: ExecutionResult,
}

/// The collected outcome of a full run.
#[derive(Debug)]
pub struct RunOutcome {
    /// Per-component decisions and execution results, in catalog order.
    pub components: Vec<ComponentOutcome>,
    /// The final verification report.
    pub report: VerificationReport,
    /// Whether environment creation failed (the fatal prerequisite).
    pub prerequisite_failed: bool,
}

/// Drives a single convergence pass over a catalog.
pub struct Engine<'a> {
    catalog: &'a [Component],
    ctx: &'a RunContext<'a>,
}

impl<'a> Engine<'a> {
    /// Create an engine over a catalog and run context.
    pub fn new(catalog: &'a [Component], ctx: &'a RunContext<'a>) -> Self {
        Self { catalog, ctx }
    }

    /// Inspect every component and decide its action, without mutating
    /// anything. This is the read-only half of a run, shared by the
    /// status command and the pre-confirmation plan display.
    pub fn plan(&self, mut on_progress: impl FnMut(RunProgress<'_>)) -> Vec<PlanEntry> {
        let inspector = Inspector::new(self.ctx);
        self.catalog
            .iter()
            .map(|component| {
                on_progress(RunProgress::Inspecting {
                    component: &component.name,
                });
                let state = inspector.inspect(component);
                let decision = decide(component, &state);
                debug!(
                    component = component.name.as_str(),
                    "decision: {:?} ({})", decision.action, decision.reason
                );
                on_progress(RunProgress::Decided {
                    decision: &decision,
                });
                PlanEntry { state, decision }
            })
            .collect()
    }

    /// Run the full pass: plan, execute, re-inspect, report.
    pub fn run(&self, mut on_progress: impl FnMut(RunProgress<'_>)) -> RunOutcome {
        let plan = self.plan(&mut on_progress);
        self.run_planned(plan, on_progress)
    }

    /// Execute a previously computed plan, then re-inspect and report.
    pub fn run_planned(
        &self,
        plan: Vec<PlanEntry>,
        mut on_progress: impl FnMut(RunProgress<'_>),
    ) -> RunOutcome {
        let executor = Executor::new(self.ctx);

        // The environment is wiped and rebuilt whenever any venv-scoped
        // component needs work; it never merges with prior partial state.
        let env_dirty = self
            .catalog
            .iter()
            .zip(&plan)
            .any(|(component, entry)| component.is_venv_scoped() && entry.decision.mutates());

        // Recreation is deferred to the first venv-scoped component so
        // the interpreter the venv is created from can be installed
        // earlier in the same pass.
        let mut env_recreated = false;
        let mut prerequisite_failed = false;
        let mut prerequisite_message = String::new();

        let mut components = Vec::with_capacity(plan.len());
        for (component, entry) in self.catalog.iter().zip(plan) {
            let PlanEntry { state, decision } = entry;

            if component.is_venv_scoped() && env_dirty && !env_recreated && !prerequisite_failed {
                on_progress(RunProgress::EnvironmentRecreating);
                match venv::recreate(self.ctx) {
                    Ok(()) => env_recreated = true,
                    Err(e) => {
                        prerequisite_message = e.to_string();
                        prerequisite_failed = true;
                        on_progress(RunProgress::EnvironmentFailed {
                            message: &prerequisite_message,
                        });
                    }
                }
            }

            let execution = if component.is_venv_scoped() && prerequisite_failed {
                // Dependent components are marked failed without an
                // execution attempt.
                ExecutionResult::failed(
                    &component.name,
                    format!("not attempted: {}", prerequisite_message),
                )
            } else {
                let will_run =
                    decision.mutates() || (env_recreated && component.is_venv_scoped());
                if will_run {
                    on_progress(RunProgress::Executing {
                        component: &component.name,
                        action: decision.action,
                    });
                }
                let result = executor.execute(component, &decision, env_recreated);
                if will_run {
                    on_progress(RunProgress::Executed { result: &result });
                }
                result
            };

            if !execution.succeeded {
                info!(
                    component = component.name.as_str(),
                    "execution failed: {}",
                    execution.error_detail.as_deref().unwrap_or("unknown")
                );
            }

            components.push(ComponentOutcome {
                initial: state,
                decision,
                execution,
            });
        }

        on_progress(RunProgress::Reverifying);
        let inspector = Inspector::new(self.ctx);
        let final_states: Vec<InstalledState> =
            self.catalog.iter().map(|c| inspector.inspect(c)).collect();
        let report = VerificationReport::build(self.catalog, &final_states, self.ctx);

        RunOutcome {
            components,
            report,
            prerequisite_failed,
        }
    }
}
