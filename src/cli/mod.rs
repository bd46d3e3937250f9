//! Command-line interface and dispatch.

pub mod args;
pub mod run;
pub mod status;

pub use args::{Cli, Commands, RunArgs, StatusArgs};

use crate::error::Result;
use crate::ui::Reporter;
use clap::CommandFactory;

/// Dispatch the parsed CLI to its command handler. Returns the process
/// exit code.
pub fn dispatch(cli: &Cli, reporter: &Reporter) -> Result<u8> {
    match &cli.command {
        None => run::execute(cli, &RunArgs::default(), reporter),
        Some(Commands::Run(args)) => run::execute(cli, args, reporter),
        Some(Commands::Status(args)) => status::execute(cli, args, reporter),
        Some(Commands::Completions(args)) => {
            let mut command = Cli::command();
            clap_complete::generate(args.shell, &mut command, "toolpin", &mut std::io::stdout());
            Ok(0)
        }
    }
}
