// ── Command API ──
//
// All device-bound intents flow through a unified `Command` enum. The
// controller validates and encodes each one, updates the optimistic local
// state, and hands the wire frame to the push channel.

pub mod encode;

use serde::Serialize;

use crate::model::{Actuator, ScheduleKind};

pub use encode::{ScheduleUpdate, encode_schedule};

/// All write operations against the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Flip the locally tracked state and send the new value.
    ToggleActuator(Actuator),
    /// Send an explicit value, regardless of the tracked state.
    SetActuator { actuator: Actuator, on: bool },
    /// Validate and send a schedule value.
    SetSchedule { kind: ScheduleKind, value: String },
}

/// Outcome of a best-effort send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CommandResult {
    /// Written to a connected push channel. Not an acknowledgment.
    Sent,
    /// The push channel was not connected; nothing was transmitted.
    Dropped,
}

impl CommandResult {
    pub fn was_sent(self) -> bool {
        self == Self::Sent
    }
}

impl From<bool> for CommandResult {
    fn from(sent: bool) -> Self {
        if sent { Self::Sent } else { Self::Dropped }
    }
}
