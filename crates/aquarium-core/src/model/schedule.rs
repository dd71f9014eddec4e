// ── Schedule settings ──

use serde::{Deserialize, Serialize};
use strum::EnumString;

/// Which schedule value a command targets.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ScheduleKind {
    FeedingTime,
    #[strum(to_string = "water-change", serialize = "water-change-interval")]
    WaterChange,
}

/// Last validated values submitted to the device.
///
/// Recorded as entered, whether or not the push channel was up; the
/// device is the only interpreter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleSettings {
    /// `"HH:MM"`, as entered.
    pub feeding_time: Option<String>,
    pub water_change_interval_hours: Option<u32>,
}
