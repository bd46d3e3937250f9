//! Post-execution verification.
//!
//! After the executor finishes, every component is inspected again and
//! judged: pass iff the detected version equals the pin and the resolved
//! path sits in the component's namespace (under the venv root for
//! venv-scoped components, outside it for system-scoped ones). The report
//! drives the process exit code and spells out every expected-vs-actual
//! mismatch so the operator can act without re-reading logs.

use crate::catalog::Component;
use crate::context::RunContext;
use crate::inspect::InstalledState;
use crate::version::Version;
use serde::Serialize;
use std::path::PathBuf;

/// Verification verdict for one component.
#[derive(Debug, Clone, Serialize)]
pub struct ComponentReport {
    /// Component name.
    pub component: String,
    /// The pinned version.
    pub required_version: Version,
    /// What re-inspection found.
    pub detected_version: Option<Version>,
    /// Resolved install location, when known.
    pub install_path: Option<PathBuf>,
    /// Whether the component passed.
    pub passed: bool,
    /// Expected-vs-actual detail line.
    pub detail: String,
}

/// The final report for a run. Immutable once built.
#[derive(Debug, Clone, Serialize)]
pub struct VerificationReport {
    /// One verdict per catalog component.
    pub components: Vec<ComponentReport>,
    /// Number of failing components.
    pub error_count: usize,
}

impl VerificationReport {
    /// Judge re-inspected states against the catalog.
    pub fn build(
        catalog: &[Component],
        states: &[InstalledState],
        ctx: &RunContext<'_>,
    ) -> Self {
        let components: Vec<ComponentReport> = catalog
            .iter()
            .zip(states)
            .map(|(component, state)| judge(component, state, ctx))
            .collect();
        let error_count = components.iter().filter(|c| !c.passed).count();
        Self {
            components,
            error_count,
        }
    }

    /// Overall success: every component passed.
    pub fn passed(&self) -> bool {
        self.error_count == 0
    }

    /// The failing components.
    pub fn failing(&self) -> impl Iterator<Item = &ComponentReport> {
        self.components.iter().filter(|c| !c.passed)
    }
}

fn judge(component: &Component, state: &InstalledState, ctx: &RunContext<'_>) -> ComponentReport {
    let pinned = &component.required_version;

    let (passed, detail) = match &state.detected_version {
        None => {
            let detail = match (&state.install_path, state.out_of_scope) {
                (Some(path), true) => format!(
                    "expected {} inside the environment, found it only at {}",
                    pinned,
                    path.display()
                ),
                _ => format!("expected {}, found nothing installed", pinned),
            };
            (false, detail)
        }
        Some(found) if found != pinned => {
            (false, format!("expected {}, found {}", pinned, found))
        }
        Some(_) => match &state.install_path {
            // Version matches; the path must sit in the right namespace.
            Some(path) if component.is_venv_scoped() && !ctx.in_venv(path) => (
                false,
                format!(
                    "expected {} under {}, found it at {}",
                    pinned,
                    ctx.venv_root.display(),
                    path.display()
                ),
            ),
            Some(path) if !component.is_venv_scoped() && ctx.in_venv(path) => (
                false,
                format!(
                    "expected {} outside the environment, found it at {}",
                    pinned,
                    path.display()
                ),
            ),
            _ => (true, format!("ok at {}", pinned)),
        },
    };

    ComponentReport {
        component: component.name.clone(),
        required_version: pinned.clone(),
        detected_version: state.detected_version.clone(),
        install_path: state.install_path.clone(),
        passed,
        detail,
    }
}
