//! The `status` command: inspect and diff without mutating.

use crate::catalog::builtin_catalog;
use crate::cli::args::{Cli, StatusArgs};
use crate::context::{default_venv_root, RunContext};
use crate::engine::Engine;
use crate::error::Result;
use crate::shell::ShellRunner;
use crate::ui::Reporter;
use serde_json::json;

/// Show installed versions and pending actions. Read-only; always exits 0
/// unless output itself fails.
pub fn execute(cli: &Cli, args: &StatusArgs, reporter: &Reporter) -> Result<u8> {
    let runner = ShellRunner;
    let venv_root = cli.venv_root.clone().unwrap_or_else(default_venv_root);
    let ctx = RunContext::new(venv_root, &runner, cli.timeout);
    let catalog = builtin_catalog();
    let engine = Engine::new(&catalog, &ctx);

    let plan = engine.plan(|_| {});

    if args.json {
        let entries: Vec<_> = catalog
            .iter()
            .zip(&plan)
            .map(|(component, entry)| {
                json!({
                    "component": component.name,
                    "required_version": component.required_version,
                    "scope": component.scope,
                    "state": entry.state,
                    "decision": entry.decision,
                })
            })
            .collect();
        let rendered = serde_json::to_string_pretty(&entries).map_err(anyhow::Error::from)?;
        println!("{}", rendered);
        return Ok(0);
    }

    for (component, entry) in catalog.iter().zip(&plan) {
        let installed = entry
            .state
            .detected_version
            .as_ref()
            .map(|v| v.to_string())
            .unwrap_or_else(|| "-".to_string());
        reporter.info(&format!(
            "{:<14} pinned {:<10} installed {:<10} {}",
            component.name,
            component.required_version,
            installed,
            entry.decision.action.label()
        ));
    }

    let pending = plan.iter().filter(|e| e.decision.mutates()).count();
    if pending == 0 {
        reporter.success("host is converged");
    } else {
        reporter.warning(&format!("{} component(s) need work; run 'toolpin run'", pending));
    }

    Ok(0)
}
