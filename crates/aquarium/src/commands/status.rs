//! `status`: one pull, printed.

use chrono::{DateTime, Utc};
use serde::Serialize;

use aquarium_core::{Controller, TankState, TelemetrySource};

use crate::config::Resolved;
use crate::error::CliError;
use crate::output::{self, DetailRow, Output, UNKNOWN};

#[derive(Debug, Serialize)]
struct StatusView {
    profile: String,
    address: String,
    temperature_celsius: Option<f64>,
    water_level_distance_cm: Option<f64>,
    water_level_percent: Option<f64>,
    source: Option<TelemetrySource>,
    updated_at: Option<DateTime<Utc>>,
}

impl StatusView {
    fn new(profile: String, address: String, tank: &TankState) -> Self {
        Self {
            profile,
            address,
            temperature_celsius: tank.temperature_celsius,
            water_level_distance_cm: tank.water_level_distance_cm,
            water_level_percent: tank.water_level_percent(),
            source: tank.last_updated_source,
            updated_at: tank.last_updated_at,
        }
    }

    fn tank(&self) -> TankState {
        TankState {
            temperature_celsius: self.temperature_celsius,
            water_level_distance_cm: self.water_level_distance_cm,
            last_updated_source: self.source,
            last_updated_at: self.updated_at,
        }
    }
}

pub async fn handle(resolved: Resolved, out: &Output) -> Result<(), CliError> {
    let Resolved {
        profile_name,
        address,
        mut controller,
    } = resolved;

    // a single fetch never needs the push channel
    controller.websocket_enabled = false;

    let label = address.to_string();
    let tank = Controller::oneshot(controller, address, |ctrl| async move {
        ctrl.refresh_now().await
    })
    .await?;

    let view = StatusView::new(profile_name, label, &tank);
    let rendered = output::render_single(out.format, &view, detail, plain)?;
    out.print(&rendered);
    Ok(())
}

fn detail(view: &StatusView) -> String {
    let tank = view.tank();
    let distance = view
        .water_level_distance_cm
        .map_or_else(|| UNKNOWN.into(), |d| format!("{d:.1} cm"));

    output::render_table(&[
        DetailRow::new("Device", view.address.as_str()),
        DetailRow::new("Temperature", output::temperature(&tank)),
        DetailRow::new("Water level", output::water_level(&tank)),
        DetailRow::new("Sensor distance", distance),
    ])
}

/// Temperature, then percentage, one per line, no units.
fn plain(view: &StatusView) -> String {
    let temperature = view
        .temperature_celsius
        .map_or_else(|| UNKNOWN.into(), |t| t.to_string());
    let level = view
        .water_level_percent
        .map_or_else(|| UNKNOWN.into(), |p| format!("{p:.0}"));
    format!("{temperature}\n{level}")
}
