//! Command dispatch: bridges CLI args -> core operations -> output formatting.

pub mod actuator;
pub mod config_cmd;
pub mod monitor;
pub mod schedule;
pub mod status;
pub mod util;

use crate::cli::Command;
use crate::config::Resolved;
use crate::error::CliError;
use crate::output::Output;

/// Dispatch a device-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, resolved: Resolved, out: &Output) -> Result<(), CliError> {
    match cmd {
        Command::Status => status::handle(resolved, out).await,
        Command::Monitor(args) => monitor::handle(resolved, &args, out).await,
        Command::Actuator(args) => actuator::handle(resolved, &args, out).await,
        Command::Schedule(args) => schedule::handle(resolved, args, out).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}
