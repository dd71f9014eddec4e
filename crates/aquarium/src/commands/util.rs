//! Shared helpers for command handlers.

use std::time::Duration;

use aquarium_core::{ActuatorState, Command, CommandResult, Controller, ScheduleSettings};

use crate::config::Resolved;
use crate::error::CliError;

/// What a one-shot write left behind.
#[derive(Debug)]
pub struct Dispatched {
    pub result: CommandResult,
    pub actuators: ActuatorState,
    pub schedule: ScheduleSettings,
}

/// Connect, wait for the push channel, send `cmd`, and disconnect.
///
/// The frame is flushed before the socket closes. A `Dropped` result
/// (the link fell between the wait and the send) is an error here since a
/// one-shot invocation has nothing to retry with.
pub async fn send_once(resolved: Resolved, wait: Duration, cmd: Command) -> Result<Dispatched, CliError> {
    let address = resolved.address.to_string();
    tracing::debug!(?cmd, %address, ?wait, "one-shot command");

    let dispatched = Controller::oneshot(resolved.controller, resolved.address, |ctrl| async move {
        ctrl.wait_connected(wait).await?;
        let result = ctrl.execute(cmd)?;
        Ok(Dispatched {
            result,
            actuators: ctrl.actuators_snapshot(),
            schedule: ctrl.schedule_snapshot(),
        })
    })
    .await?;

    if dispatched.result.was_sent() {
        Ok(dispatched)
    } else {
        Err(CliError::NotSent { address })
    }
}
