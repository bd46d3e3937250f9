//! Error types for toolpin operations.
//!
//! This module defines [`ToolpinError`], the primary error type used
//! throughout the application, and a [`Result`] type alias for convenience.
//!
//! # Error Handling Strategy
//!
//! Most failures during a convergence run are *not* errors in the Rust
//! sense: a failed install is recorded in the component's
//! `ExecutionResult` and the run moves on. `ToolpinError` covers the
//! cases that genuinely stop something:
//!
//! - `Prerequisite`: the virtual environment could not be created, so
//!   every environment-scoped component is dead on arrival
//! - `CommandFailed`: a process could not be spawned at all
//! - `Other`: anyhow interop for everything else (prompt and
//!   serialization failures in the CLI layer)

use thiserror::Error;

/// Core error type for toolpin operations.
#[derive(Debug, Error)]
pub enum ToolpinError {
    /// The virtual environment could not be created. Fatal for every
    /// environment-scoped component in the run.
    #[error("Prerequisite failed: {message}")]
    Prerequisite { message: String },

    /// A shell command could not be spawned or was killed.
    #[error("Command failed with exit code {code:?}: {command}")]
    CommandFailed { command: String, code: Option<i32> },

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for toolpin operations.
pub type Result<T> = std::result::Result<T, ToolpinError>;
