//! `monitor`: live view plus line commands on stdin.
//!
//! Runs the full controller (push channel, poller, reminders) until `quit`
//! or Ctrl-C. Telemetry and link changes print one line each; reminders
//! print only when they fire.

use std::io;

use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::task::JoinSet;
use tracing::{debug, warn};

use aquarium_core::{
    Actuator, ActuatorState, ConnectionHealth, Controller, CoreError, DeviceAddress,
    ReminderKind, ReminderState, ScheduleKind, ScheduleSettings, TankState,
};

use crate::cli::{MonitorArgs, OutputFormat};
use crate::config::Resolved;
use crate::error::CliError;
use crate::output::{self, DetailRow, Output, UNKNOWN};

const HELP: &str = "\
commands:
  toggle <actuator>   flip light | fill | empty | dispenser
  feed <HH:MM>        set the daily feeding time
  interval <hours>    set the water-change interval
  refresh             fetch a reading now
  address <host>      switch to another device
  status              print the full dashboard
  help                show this list
  quit                stop monitoring";

// ── Line commands ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
enum MonitorInput {
    Toggle(Actuator),
    Feed(String),
    Interval(String),
    Refresh,
    Address(String),
    Status,
    Help,
    Quit,
}

/// Parse one stdin line. Blank lines yield `None`.
fn parse_input(line: &str) -> Result<Option<MonitorInput>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = line
        .split_once(char::is_whitespace)
        .map_or((line, ""), |(w, r)| (w, r.trim()));

    let input = match word.to_ascii_lowercase().as_str() {
        "toggle" | "t" => {
            let actuator = rest
                .parse::<Actuator>()
                .map_err(|_| format!("unknown actuator '{rest}'"))?;
            MonitorInput::Toggle(actuator)
        }
        // empty values go through so the dispatcher reports them
        "feed" | "feeding-time" => MonitorInput::Feed(rest.to_owned()),
        "interval" | "water-change" => MonitorInput::Interval(rest.to_owned()),
        "refresh" | "r" => MonitorInput::Refresh,
        "address" | "addr" => {
            if rest.is_empty() {
                return Err("usage: address <host>".into());
            }
            MonitorInput::Address(rest.to_owned())
        }
        "status" | "s" => MonitorInput::Status,
        "help" | "?" => MonitorInput::Help,
        "quit" | "exit" | "q" => MonitorInput::Quit,
        other => return Err(format!("unknown command '{other}' (try 'help')")),
    };
    Ok(Some(input))
}

// ── Rendering ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct Snapshot {
    at: DateTime<Utc>,
    address: Option<String>,
    health: ConnectionHealth,
    tank: TankState,
    water_level_percent: Option<f64>,
    actuators: ActuatorState,
    schedule: ScheduleSettings,
    reminders: ReminderState,
}

impl Snapshot {
    fn capture(controller: &Controller) -> Self {
        let tank = controller.tank_snapshot();
        Self {
            at: Utc::now(),
            address: controller.address().map(|a| a.to_string()),
            health: controller.health(),
            water_level_percent: tank.water_level_percent(),
            tank,
            actuators: controller.actuators_snapshot(),
            schedule: controller.schedule_snapshot(),
            reminders: controller.reminders_snapshot(),
        }
    }

    /// `12:00:01  connected  24.5 °C  level 50%  Feed in: 29:59  Water change in: 18:59`
    fn line(&self, color: bool) -> String {
        format!(
            "{}  {}  {}  level {}  {}  {}",
            self.at.with_timezone(&Local).format("%H:%M:%S"),
            output::health(self.health, color),
            output::temperature(&self.tank),
            output::water_level(&self.tank),
            self.reminders.line(ReminderKind::Feed),
            self.reminders.line(ReminderKind::WaterChange),
        )
    }

    fn dashboard(&self, color: bool) -> String {
        let mut rows = vec![
            DetailRow::new("Device", self.address.as_deref().unwrap_or(UNKNOWN)),
            DetailRow::new("Link", output::health(self.health, color)),
            DetailRow::new("Temperature", output::temperature(&self.tank)),
            DetailRow::new("Water level", output::water_level(&self.tank)),
        ];
        for (actuator, on) in self.actuators.iter() {
            rows.push(DetailRow::new(
                &capitalize(&actuator.to_string()),
                output::switch(on, color),
            ));
        }
        rows.push(DetailRow::new(
            "Feeding time",
            self.schedule.feeding_time.as_deref().unwrap_or(UNKNOWN),
        ));
        rows.push(DetailRow::new(
            "Water change every",
            self.schedule
                .water_change_interval_hours
                .map_or_else(|| UNKNOWN.into(), |h| format!("{h} h")),
        ));
        rows.push(DetailRow::new(
            "Feed",
            self.reminders.line(ReminderKind::Feed).to_string(),
        ));
        rows.push(DetailRow::new(
            "Water change",
            self.reminders.line(ReminderKind::WaterChange).to_string(),
        ));
        rows.push(DetailRow::new(
            "Updated",
            self.tank.last_updated_source.map_or_else(
                || UNKNOWN.into(),
                |source| {
                    let at = self
                        .tank
                        .last_updated_at
                        .map(|t| t.with_timezone(&Local).format("%H:%M:%S").to_string())
                        .unwrap_or_default();
                    format!("{at} via {source}")
                },
            ),
        ));
        output::render_table(&rows)
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

/// Streaming output: one line per event, JSON formats stay one object per line.
fn emit(out: &Output, snapshot: &Snapshot) {
    let rendered = match out.format {
        OutputFormat::Table => snapshot.line(out.color),
        OutputFormat::Plain => snapshot.line(false),
        OutputFormat::Json | OutputFormat::JsonCompact => match serde_json::to_string(snapshot) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "snapshot encoding failed");
                return;
            }
        },
    };
    out.print(&rendered);
}

/// Full dashboard for the `status` line command.
fn render_dashboard(format: OutputFormat, color: bool, snapshot: &Snapshot) -> Option<String> {
    let encoded = match format {
        OutputFormat::Table | OutputFormat::Plain => return Some(snapshot.dashboard(color)),
        OutputFormat::Json => serde_json::to_string_pretty(snapshot),
        OutputFormat::JsonCompact => serde_json::to_string(snapshot),
    };
    encoded
        .map_err(|e| warn!(error = %e, "snapshot encoding failed"))
        .ok()
}

// ── Handler ──────────────────────────────────────────────────────────

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

pub async fn handle(resolved: Resolved, args: &MonitorArgs, out: &Output) -> Result<(), CliError> {
    let controller = Controller::new(resolved.controller);
    let mut tank = controller.tank();
    let mut health = controller.connection_health();
    let mut reminders = controller.reminders();

    out.note(&format!(
        "monitoring {} (profile '{}'); type 'help' for commands",
        resolved.address, resolved.profile_name
    ));
    controller.start(resolved.address).await?;

    let mut lines = (!args.no_input).then(|| BufReader::new(tokio::io::stdin()).lines());
    let mut fired = fired_flags(reminders.current());

    // in-flight `refresh` fetches
    let mut refreshes: JoinSet<Result<TankState, CoreError>> = JoinSet::new();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,

            line = next_line(&mut lines) => match line {
                Ok(Some(line)) => {
                    if on_line(&controller, &line, out, &mut refreshes).await == Flow::Quit {
                        break;
                    }
                }
                // stdin closed: keep monitoring until Ctrl-C
                Ok(None) => lines = None,
                Err(e) => {
                    warn!(error = %e, "reading stdin failed");
                    lines = None;
                }
            },

            Some(done) = refreshes.join_next() => match done {
                Ok(Ok(_)) => emit(out, &Snapshot::capture(&controller)),
                Ok(Err(e)) => eprintln!("{}", CliError::from(e)),
                Err(e) => warn!(error = %e, "refresh task failed"),
            },

            Some(_) = tank.changed() => emit(out, &Snapshot::capture(&controller)),

            Some(_) = health.changed() => emit(out, &Snapshot::capture(&controller)),

            Some(state) = reminders.changed() => {
                let now = fired_flags(&state);
                if now != fired {
                    fired = now;
                    emit(out, &Snapshot::capture(&controller));
                }
            }
        }
    }

    if !refreshes.is_empty() {
        debug!(pending = refreshes.len(), "abandoning in-flight refreshes");
    }
    refreshes.shutdown().await;
    controller.stop().await;
    Ok(())
}

fn fired_flags(state: &ReminderState) -> (bool, bool) {
    (state.feed.fired, state.water_change.fired)
}

async fn next_line(lines: &mut Option<Lines<BufReader<Stdin>>>) -> io::Result<Option<String>> {
    match lines {
        Some(lines) => lines.next_line().await,
        None => std::future::pending().await,
    }
}

async fn on_line(
    controller: &Controller,
    line: &str,
    out: &Output,
    refreshes: &mut JoinSet<Result<TankState, CoreError>>,
) -> Flow {
    let input = match parse_input(line) {
        Ok(Some(input)) => input,
        Ok(None) => return Flow::Continue,
        Err(message) => {
            eprintln!("{message}");
            return Flow::Continue;
        }
    };

    match input {
        MonitorInput::Toggle(actuator) => {
            let result = controller.toggle_actuator(actuator);
            let on = controller.actuators_snapshot().get(actuator);
            out.note(&format!(
                "{actuator} -> {} ({result})",
                output::switch(on, out.color)
            ));
        }
        MonitorInput::Feed(value) => schedule(controller, ScheduleKind::FeedingTime, &value, out),
        MonitorInput::Interval(value) => {
            schedule(controller, ScheduleKind::WaterChange, &value, out);
        }
        MonitorInput::Refresh => {
            let controller = controller.clone();
            refreshes.spawn(async move { controller.refresh_now().await });
        }
        MonitorInput::Address(raw) => match raw.parse::<DeviceAddress>() {
            Ok(address) => {
                let label = address.to_string();
                match controller.set_address(address).await {
                    Ok(()) => out.note(&format!("switched to {label}")),
                    Err(e) => eprintln!("{}", CliError::from(e)),
                }
            }
            Err(e) => eprintln!("invalid address: {e}"),
        },
        MonitorInput::Status => {
            let snapshot = Snapshot::capture(controller);
            if let Some(rendered) = render_dashboard(out.format, out.color, &snapshot) {
                out.print(&rendered);
            }
        }
        MonitorInput::Help => out.note(HELP),
        MonitorInput::Quit => return Flow::Quit,
    }
    Flow::Continue
}

fn schedule(controller: &Controller, kind: ScheduleKind, value: &str, out: &Output) {
    match controller.set_schedule(kind, value) {
        Ok(result) => out.note(&format!("{kind} {} ({result})", value.trim())),
        Err(e) => eprintln!("{}", CliError::from(e)),
    }
}
