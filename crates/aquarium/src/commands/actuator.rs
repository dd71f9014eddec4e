//! `actuator <name> <on|off|toggle>`.

use serde::Serialize;

use aquarium_core::{Actuator, Command as CoreCommand, CommandResult};

use crate::cli::{ActuatorArgs, SwitchAction};
use crate::config::Resolved;
use crate::error::CliError;
use crate::output::{self, Output};

use super::util;

#[derive(Debug, Serialize)]
struct SwitchView {
    actuator: Actuator,
    pin: String,
    on: bool,
    result: CommandResult,
}

pub async fn handle(resolved: Resolved, args: &ActuatorArgs, out: &Output) -> Result<(), CliError> {
    let actuator = args.actuator;
    let pin = resolved.controller.pins.pin(actuator).to_owned();

    let cmd = match args.action {
        SwitchAction::On => CoreCommand::SetActuator { actuator, on: true },
        SwitchAction::Off => CoreCommand::SetActuator { actuator, on: false },
        SwitchAction::Toggle => CoreCommand::ToggleActuator(actuator),
    };

    let dispatched = util::send_once(resolved, args.wait, cmd).await?;
    let view = SwitchView {
        actuator,
        pin,
        on: dispatched.actuators.get(actuator),
        result: dispatched.result,
    };

    let color = out.color;
    let rendered = output::render_single(
        out.format,
        &view,
        |v| {
            format!(
                "{} ({}) -> {}",
                v.actuator,
                v.pin,
                output::switch(v.on, color)
            )
        },
        |v| output::switch(v.on, false),
    )?;
    out.print(&rendered);
    Ok(())
}
