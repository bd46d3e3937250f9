//! CLI argument definitions.
//!
//! This module defines all CLI arguments using clap's derive macros.
//! The main entry point is the [`Cli`] struct. Running with no
//! subcommand is equivalent to `toolpin run`.

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// Toolpin - converge a host toward a pinned reverse-engineering toolchain.
#[derive(Debug, Parser)]
#[command(name = "toolpin")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Root of the isolated virtual environment
    #[arg(long, global = true, env = "TOOLPIN_VENV_ROOT")]
    pub venv_root: Option<PathBuf>,

    /// Per-command timeout in seconds (default: none)
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Show verbose output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Converge the host toward the pinned toolchain (default)
    Run(RunArgs),

    /// Show installed versions and pending actions without mutating
    Status(StatusArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Arguments for the `run` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct RunArgs {
    /// Proceed without the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Preview decisions without executing
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the `status` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct StatusArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `completions` command.
#[derive(Debug, Clone, clap::Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
