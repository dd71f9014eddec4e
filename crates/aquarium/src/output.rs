//! Output formatting: table, JSON, plain.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde, plain emits one value per line.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use aquarium_core::{ConnectionHealth, TankState};

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;

// ── Output settings ──────────────────────────────────────────────────

/// Resolved rendering settings for one invocation.
#[derive(Debug, Clone, Copy)]
pub struct Output {
    pub format: OutputFormat,
    pub color: bool,
    pub quiet: bool,
}

impl Output {
    pub fn new(format: OutputFormat, color: ColorMode, quiet: bool) -> Self {
        Self {
            format,
            color: should_color(color),
            quiet,
        }
    }

    /// Print rendered output to stdout, respecting quiet mode.
    pub fn print(&self, rendered: &str) {
        if self.quiet || rendered.is_empty() {
            return;
        }
        let mut stdout = io::stdout().lock();
        let _ = writeln!(stdout, "{rendered}");
    }

    /// Print a status note to stderr, respecting quiet mode.
    pub fn note(&self, message: &str) {
        if !self.quiet {
            eprintln!("{message}");
        }
    }
}

/// Determine whether color output should be enabled.
pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none(),
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a single serde-serializable item in the chosen format.
///
/// Table rendering uses `detail_fn`, which returns a pre-formatted string;
/// plain rendering uses `plain_fn`.
pub fn render_single<T>(
    format: OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    plain_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
{
    Ok(match format {
        OutputFormat::Table => detail_fn(data),
        OutputFormat::Json => serde_json::to_string_pretty(data)?,
        OutputFormat::JsonCompact => serde_json::to_string(data)?,
        OutputFormat::Plain => plain_fn(data),
    })
}

// ── Tables ───────────────────────────────────────────────────────────

/// One `field | value` row of a detail table.
#[derive(Tabled)]
pub struct DetailRow {
    #[tabled(rename = "Field")]
    pub field: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

impl DetailRow {
    pub fn new(field: &str, value: impl Into<String>) -> Self {
        Self {
            field: field.to_owned(),
            value: value.into(),
        }
    }
}

pub fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

// ── Value formatting ─────────────────────────────────────────────────

/// Placeholder for values the device has not reported yet.
pub const UNKNOWN: &str = "--";

pub fn temperature(tank: &TankState) -> String {
    tank.temperature_celsius
        .map_or_else(|| UNKNOWN.into(), |t| format!("{t:.1} °C"))
}

pub fn water_level(tank: &TankState) -> String {
    tank.water_level_display().unwrap_or_else(|| UNKNOWN.into())
}

pub fn health(health: ConnectionHealth, color: bool) -> String {
    let text = health.to_string();
    if !color {
        return text;
    }
    match health {
        ConnectionHealth::Connected => text.green().to_string(),
        ConnectionHealth::Connecting => text.yellow().to_string(),
        ConnectionHealth::Disconnected => text.red().to_string(),
    }
}

pub fn switch(on: bool, color: bool) -> String {
    match (on, color) {
        (true, true) => "on".green().bold().to_string(),
        (false, true) => "off".dimmed().to_string(),
        (true, false) => "on".into(),
        (false, false) => "off".into(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn formats_switch_between_renderers() {
        let data = json!({ "temperature_celsius": 24.5 });
        let table = render_single(OutputFormat::Table, &data, |_| "T".into(), |_| "P".into());
        assert_eq!(table.unwrap(), "T");
        let plain = render_single(OutputFormat::Plain, &data, |_| "T".into(), |_| "P".into());
        assert_eq!(plain.unwrap(), "P");
        let compact =
            render_single(OutputFormat::JsonCompact, &data, |_| String::new(), |_| String::new());
        assert_eq!(compact.unwrap(), r#"{"temperature_celsius":24.5}"#);
    }

    #[test]
    fn unknown_values_render_as_placeholder() {
        let tank = TankState::default();
        assert_eq!(temperature(&tank), UNKNOWN);
        assert_eq!(water_level(&tank), UNKNOWN);

        let tank = TankState {
            temperature_celsius: Some(24.5),
            water_level_distance_cm: Some(11.0),
            ..TankState::default()
        };
        assert_eq!(temperature(&tank), "24.5 °C");
        assert_eq!(water_level(&tank), "50%");
    }

    #[test]
    fn detail_table_contains_rows() {
        let rendered = render_table(&[DetailRow::new("Temperature", "24.5 °C")]);
        assert!(rendered.contains("Temperature"));
        assert!(rendered.contains("24.5 °C"));
    }
}
