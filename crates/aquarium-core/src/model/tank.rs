// ── Tank telemetry ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Distance (cm) at or below which the tank reads full.
pub const FULL_DISTANCE_CM: f64 = 5.0;

/// Distance (cm) at or above which the tank reads empty.
pub const EMPTY_DISTANCE_CM: f64 = 17.0;

/// Which path delivered a reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TelemetrySource {
    Push,
    Pull,
}

/// Latest known sensor values.
///
/// Fields start as `None` and only ever move to a value; a reset happens
/// solely when the device address changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TankState {
    pub temperature_celsius: Option<f64>,
    /// Ultrasonic distance from sensor to water surface.
    pub water_level_distance_cm: Option<f64>,
    pub last_updated_source: Option<TelemetrySource>,
    pub last_updated_at: Option<DateTime<Utc>>,
}

impl TankState {
    /// Derived fill percentage, if a distance is known.
    pub fn water_level_percent(&self) -> Option<f64> {
        self.water_level_distance_cm.map(water_level_percent)
    }

    /// Whether any reading has arrived yet.
    pub fn has_data(&self) -> bool {
        self.temperature_celsius.is_some() || self.water_level_distance_cm.is_some()
    }

    /// Percentage rendered the way the dashboard card shows it, e.g. `"50%"`.
    pub fn water_level_display(&self) -> Option<String> {
        self.water_level_percent().map(|p| format!("{p:.0}%"))
    }
}

/// Map a sensor distance to a fill percentage.
///
/// `d <= 5` is full, `d >= 17` is empty, linear in between. Both bounds
/// are inclusive.
pub fn water_level_percent(distance_cm: f64) -> f64 {
    if distance_cm <= FULL_DISTANCE_CM {
        100.0
    } else if distance_cm >= EMPTY_DISTANCE_CM {
        0.0
    } else {
        (EMPTY_DISTANCE_CM - distance_cm) / (EMPTY_DISTANCE_CM - FULL_DISTANCE_CM) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[allow(clippy::float_cmp)]
    fn percent_bounds_are_exact_and_inclusive() {
        assert_eq!(water_level_percent(5.0), 100.0);
        assert_eq!(water_level_percent(-3.0), 100.0);
        assert_eq!(water_level_percent(17.0), 0.0);
        assert_eq!(water_level_percent(40.0), 0.0);
        assert_eq!(water_level_percent(11.0), 50.0);
    }

    #[test]
    fn percent_is_monotonic_non_increasing() {
        let mut prev = water_level_percent(5.0);
        let mut d = 5.0;
        while d <= 17.0 {
            let p = water_level_percent(d);
            assert!(p <= prev, "{d}cm -> {p}% rose above {prev}%");
            prev = p;
            d += 0.25;
        }
    }

    #[test]
    fn display_rounds_to_whole_percent() {
        let state = TankState {
            water_level_distance_cm: Some(12.0),
            ..TankState::default()
        };
        assert_eq!(state.water_level_display().as_deref(), Some("42%"));
        assert_eq!(TankState::default().water_level_display(), None);
    }
}
