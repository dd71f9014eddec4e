// aquarium-core: Device state synchronization between aquarium-api and consumers (CLI).

pub mod command;
pub mod config;
pub mod controller;
pub mod error;
pub mod model;
pub mod reminder;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use command::{Command, CommandResult};
pub use config::{ControllerConfig, PinMap};
pub use controller::Controller;
pub use error::CoreError;
pub use store::DataStore;
pub use stream::StateStream;

pub use aquarium_api::{ConnectionHealth, DeviceAddress};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    Actuator, ActuatorState, Reminder, ReminderKind, ReminderState, ScheduleKind,
    ScheduleSettings, TankState, TelemetrySource, format_remaining, water_level_percent,
};
