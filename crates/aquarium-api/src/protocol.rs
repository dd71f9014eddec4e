//! Client → device wire messages.
//!
//! The firmware accepts two kinds of text frames on the push channel:
//!
//! - a bare actuator token, `"<pin>_on"` or `"<pin>_off"`
//! - a JSON action envelope, e.g. `{"action":"setFeedingTime","time":"08:30"}`
//!
//! There is no acknowledgment for either.

use serde::{Deserialize, Serialize};

/// Bare `"<pin>_on"` / `"<pin>_off"` actuator token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinCommand {
    pub pin: String,
    pub on: bool,
}

impl PinCommand {
    pub fn new(pin: impl Into<String>, on: bool) -> Self {
        Self {
            pin: pin.into(),
            on,
        }
    }

    /// Render the wire token.
    pub fn token(&self) -> String {
        let suffix = if self.on { "on" } else { "off" };
        format!("{}_{suffix}", self.pin)
    }
}

/// JSON action envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum DeviceAction {
    #[serde(rename = "setFeedingTime")]
    SetFeedingTime { time: String },

    /// The firmware expects the interval as a decimal string.
    #[serde(rename = "setWaterChangeInterval")]
    SetWaterChangeInterval { interval: String },
}

impl DeviceAction {
    /// Serialize to the compact JSON text frame.
    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
