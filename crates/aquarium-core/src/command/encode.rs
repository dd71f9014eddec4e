// Schedule validation and wire encoding.
//
// Validation is entirely local: a rejected value never reaches the
// push channel and never touches `ScheduleSettings`.

use chrono::NaiveTime;

use aquarium_api::DeviceAction;

use crate::error::CoreError;
use crate::model::{ScheduleKind, ScheduleSettings};

/// A validated schedule change: the frame to send and how to record it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleUpdate {
    FeedingTime(String),
    WaterChangeIntervalHours(u32),
}

impl ScheduleUpdate {
    pub fn action(&self) -> DeviceAction {
        match self {
            Self::FeedingTime(time) => DeviceAction::SetFeedingTime { time: time.clone() },
            Self::WaterChangeIntervalHours(hours) => DeviceAction::SetWaterChangeInterval {
                interval: hours.to_string(),
            },
        }
    }

    pub fn apply_to(&self, settings: &mut ScheduleSettings) {
        match self {
            Self::FeedingTime(time) => settings.feeding_time = Some(time.clone()),
            Self::WaterChangeIntervalHours(hours) => {
                settings.water_change_interval_hours = Some(*hours);
            }
        }
    }
}

/// Validate raw user input for `kind`.
pub fn encode_schedule(kind: ScheduleKind, value: &str) -> Result<ScheduleUpdate, CoreError> {
    let value = value.trim();

    match kind {
        ScheduleKind::FeedingTime => {
            if value.is_empty() {
                return Err(CoreError::validation("feeding_time", "must not be empty"));
            }
            if NaiveTime::parse_from_str(value, "%H:%M").is_err() {
                return Err(CoreError::validation(
                    "feeding_time",
                    format!("expected HH:MM, got '{value}'"),
                ));
            }
            Ok(ScheduleUpdate::FeedingTime(value.to_owned()))
        }
        ScheduleKind::WaterChange => {
            if value.is_empty() {
                return Err(CoreError::validation(
                    "water_change_interval",
                    "must not be empty",
                ));
            }
            match value.parse::<u32>() {
                Ok(hours) if hours > 0 => Ok(ScheduleUpdate::WaterChangeIntervalHours(hours)),
                _ => Err(CoreError::validation(
                    "water_change_interval",
                    format!("expected a positive whole number of hours, got '{value}'"),
                )),
            }
        }
    }
}
