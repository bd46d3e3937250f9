//! Toolpin - converge a Linux host toward a pinned reverse-engineering
//! toolchain.
//!
//! Toolpin replaces an ad-hoc provisioning script with a small
//! declarative convergence engine: a static catalog pins exact versions
//! of a CPython build, isolated-environment instrumentation packages,
//! Node.js, and a globally installed native-instrumentation compiler.
//! One pass inspects the host, decides the minimal action per component,
//! applies it, and verifies the result.
//!
//! # Modules
//!
//! - [`catalog`] - The pinned target catalog
//! - [`cli`] - Command-line interface and dispatch
//! - [`context`] - Explicit run context (venv root, runner, timeout)
//! - [`engine`] - Single-pass convergence orchestration
//! - [`error`] - Error types and result aliases
//! - [`exec`] - Decision execution: builds, package installs, removal
//! - [`inspect`] - Side-effect-free host inspection
//! - [`reconcile`] - Pure observed-vs-pinned reconciliation
//! - [`shell`] - Shell command execution and the runner seam
//! - [`ui`] - Terminal output, prompts, and spinners
//! - [`verify`] - Post-execution verification report
//! - [`version`] - Exact-pin version values and extraction
//!
//! # Example
//!
//! ```
//! use toolpin::catalog::builtin_catalog;
//! use toolpin::inspect::InstalledState;
//! use toolpin::reconcile::{decide, Action};
//! use toolpin::version::Version;
//!
//! let catalog = builtin_catalog();
//! let python = &catalog[0];
//! let observed = InstalledState {
//!     component: python.name.clone(),
//!     detected_version: Some(Version::new("3.11.9")),
//!     install_path: None,
//!     parse_failed: false,
//!     out_of_scope: false,
//! };
//! // The pin is exact: newer than 3.11.0 still means reinstall.
//! assert_eq!(decide(python, &observed).action, Action::Reinstall);
//! ```

pub mod catalog;
pub mod cli;
pub mod context;
pub mod engine;
pub mod error;
pub mod exec;
pub mod inspect;
pub mod reconcile;
pub mod shell;
pub mod ui;
pub mod verify;
pub mod version;

pub use error::{Result, ToolpinError};
