//! Execution of reconciliation decisions against the host.

pub mod executor;
pub mod source_build;
pub mod venv;

pub use executor::{ExecutionResult, Executor};
