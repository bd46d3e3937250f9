//! Reconciliation: observed state vs. pinned target.
//!
//! A pure function over (component, installed state). No commands run
//! here; the decision is data consumed exactly once by the executor.

use crate::catalog::Component;
use crate::inspect::InstalledState;
use serde::Serialize;

/// What the executor should do for a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Installed at exactly the pinned version; leave it alone.
    Keep,
    /// Not installed in scope; install it.
    Install,
    /// Installed at some other version; remove, then install. Applies to
    /// newer versions too, since the pin is exact, not a minimum.
    Reinstall,
}

impl Action {
    /// Short lowercase label for log lines and reports.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Keep => "keep",
            Self::Install => "install",
            Self::Reinstall => "reinstall",
        }
    }
}

/// The reconciliation decision for one component.
#[derive(Debug, Clone, Serialize)]
pub struct Decision {
    /// Component name.
    pub component: String,
    /// Chosen action.
    pub action: Action,
    /// Human-readable justification for the report.
    pub reason: String,
}

impl Decision {
    /// Whether this decision mutates the host.
    pub fn mutates(&self) -> bool {
        self.action != Action::Keep
    }
}

/// Decide the minimal action that converges a component to its pin.
pub fn decide(component: &Component, state: &InstalledState) -> Decision {
    let pinned = &component.required_version;

    // Unparsable detection output: assume the install is suspect.
    if state.parse_failed {
        return Decision {
            component: component.name.clone(),
            action: Action::Reinstall,
            reason: format!("installed version unreadable, pinned {}", pinned),
        };
    }

    match &state.detected_version {
        None => {
            let reason = if state.out_of_scope {
                match &state.install_path {
                    Some(path) => format!(
                        "found outside the environment at {}, pinned {}",
                        path.display(),
                        pinned
                    ),
                    None => format!("found outside the environment, pinned {}", pinned),
                }
            } else {
                format!("not installed, pinned {}", pinned)
            };
            Decision {
                component: component.name.clone(),
                action: Action::Install,
                reason,
            }
        }
        Some(found) if found == pinned => Decision {
            component: component.name.clone(),
            action: Action::Keep,
            reason: format!("already at {}", pinned),
        },
        Some(found) => Decision {
            component: component.name.clone(),
            action: Action::Reinstall,
            reason: format!("installed {}, pinned {}", found, pinned),
        },
    }
}
