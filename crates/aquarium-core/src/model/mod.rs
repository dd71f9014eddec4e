// ── Domain model ──
//
// Every type in this module is the canonical, presentation-ready view of
// one piece of device or local state. The store owns live copies; these
// are the snapshots consumers read.

pub mod actuator;
pub mod reminder;
pub mod schedule;
pub mod tank;

// ── Re-exports ──────────────────────────────────────────────────────

pub use actuator::{Actuator, ActuatorState};
pub use reminder::{Reminder, ReminderKind, ReminderLine, ReminderState, format_remaining};
pub use schedule::{ScheduleKind, ScheduleSettings};
pub use tank::{TankState, TelemetrySource, water_level_percent};
