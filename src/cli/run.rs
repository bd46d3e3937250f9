//! The `run` command: plan, confirm, execute, verify.

use crate::catalog::builtin_catalog;
use crate::cli::args::{Cli, RunArgs};
use crate::context::{default_venv_root, RunContext};
use crate::engine::{Engine, RunProgress};
use crate::error::Result;
use crate::shell::ShellRunner;
use crate::ui::{action_spinner, confirm_proceed, Reporter};
use crate::verify::VerificationReport;
use indicatif::ProgressBar;

/// Run the convergence pass. Returns the process exit code.
pub fn execute(cli: &Cli, args: &RunArgs, reporter: &Reporter) -> Result<u8> {
    let runner = ShellRunner;
    let venv_root = cli.venv_root.clone().unwrap_or_else(default_venv_root);
    let ctx = RunContext::new(venv_root, &runner, cli.timeout);
    let catalog = builtin_catalog();
    let engine = Engine::new(&catalog, &ctx);

    reporter.info(&format!(
        "inspecting {} components (environment at {})",
        catalog.len(),
        ctx.venv_root.display()
    ));

    let plan = engine.plan(|_| {});
    for entry in &plan {
        reporter.info(&format!(
            "{}: {} ({})",
            entry.decision.component,
            entry.decision.action.label(),
            entry.decision.reason
        ));
        if let Some(version) = &entry.state.detected_version {
            reporter.detail(&format!(
                "detected {} at {}",
                version,
                entry
                    .state
                    .install_path
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "unknown location".to_string())
            ));
        }
    }

    let mutations = plan.iter().filter(|e| e.decision.mutates()).count();

    if args.dry_run {
        reporter.info("dry run: nothing executed");
        return Ok(0);
    }

    if mutations > 0 && !args.yes && !confirm_proceed(mutations)? {
        reporter.warning("aborted; host left untouched");
        return Ok(1);
    }

    let mut spinner: Option<ProgressBar> = None;
    let outcome = engine.run_planned(plan, |progress| match progress {
        RunProgress::EnvironmentRecreating => {
            reporter.info("recreating virtual environment");
        }
        RunProgress::EnvironmentFailed { message } => {
            reporter.error(message);
        }
        RunProgress::Executing { component, action } => {
            let msg = format!("{}: {}", component, action.label());
            if reporter.mode().shows_spinners() {
                spinner = Some(action_spinner(&msg));
            } else {
                reporter.info(&msg);
            }
        }
        RunProgress::Executed { result } => {
            if let Some(s) = spinner.take() {
                s.finish_and_clear();
            }
            if result.succeeded {
                reporter.success(&format!("{}: done", result.component));
            } else {
                reporter.error(&format!(
                    "{}: {}",
                    result.component,
                    result.error_detail.as_deref().unwrap_or("failed")
                ));
            }
        }
        RunProgress::Reverifying => {
            reporter.info("verifying installed versions");
        }
        _ => {}
    });

    render_report(&outcome.report, reporter);
    Ok(if outcome.report.passed() { 0 } else { 1 })
}

/// Print the per-component verdicts and the summary.
pub fn render_report(report: &VerificationReport, reporter: &Reporter) {
    for component in &report.components {
        if component.passed {
            reporter.success(&format!("{}: {}", component.component, component.detail));
        } else {
            reporter.error(&format!("{}: {}", component.component, component.detail));
        }
    }

    if report.passed() {
        reporter.success(&format!(
            "all {} components verified",
            report.components.len()
        ));
    } else {
        let names: Vec<&str> = report.failing().map(|c| c.component.as_str()).collect();
        reporter.error(&format!(
            "{} component(s) failing: {}",
            report.error_count,
            names.join(", ")
        ));
    }
}
