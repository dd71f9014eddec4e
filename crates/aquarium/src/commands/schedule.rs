//! `schedule feeding-time|water-change`.

use aquarium_core::command::encode_schedule;
use aquarium_core::{Command as CoreCommand, ScheduleKind};

use crate::cli::{ScheduleArgs, ScheduleCommand};
use crate::config::Resolved;
use crate::error::CliError;
use crate::output::{self, DetailRow, Output, UNKNOWN};

use super::util;

pub async fn handle(resolved: Resolved, args: ScheduleArgs, out: &Output) -> Result<(), CliError> {
    let (kind, value) = match args.command {
        ScheduleCommand::FeedingTime { time } => (ScheduleKind::FeedingTime, time),
        ScheduleCommand::WaterChange { hours } => (ScheduleKind::WaterChange, hours),
    };

    // reject bad input before touching the network
    encode_schedule(kind, &value)?;

    let dispatched =
        util::send_once(resolved, args.wait, CoreCommand::SetSchedule { kind, value }).await?;
    let schedule = dispatched.schedule;

    let rendered = output::render_single(
        out.format,
        &schedule,
        |s| {
            output::render_table(&[
                DetailRow::new(
                    "Feeding time",
                    s.feeding_time.as_deref().unwrap_or(UNKNOWN),
                ),
                DetailRow::new(
                    "Water change every",
                    s.water_change_interval_hours
                        .map_or_else(|| UNKNOWN.into(), |h| format!("{h} h")),
                ),
            ])
        },
        |s| match kind {
            ScheduleKind::FeedingTime => s.feeding_time.clone().unwrap_or_default(),
            ScheduleKind::WaterChange => s
                .water_change_interval_hours
                .map(|h| h.to_string())
                .unwrap_or_default(),
        },
    )?;
    out.print(&rendered);
    Ok(())
}
