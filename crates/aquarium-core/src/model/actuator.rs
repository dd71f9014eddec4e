// ── Actuators ──

use serde::{Deserialize, Serialize};
use strum::{EnumIter, EnumString, IntoEnumIterator};

/// A switchable output on the device.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Actuator {
    Light,
    /// Fill valve / inlet pump.
    #[strum(to_string = "fill", serialize = "pump")]
    Fill,
    /// Drain valve.
    #[strum(to_string = "empty", serialize = "drain")]
    Empty,
    /// Food dispenser.
    #[strum(to_string = "dispenser", serialize = "feeder", serialize = "food")]
    Dispenser,
}

/// Last *commanded* on/off state of every actuator.
///
/// Optimistic: the device never acknowledges, so this reflects what was
/// sent (or attempted), not what the hardware is doing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActuatorState {
    pub light: bool,
    pub fill: bool,
    pub empty: bool,
    pub dispenser: bool,
}

impl ActuatorState {
    pub fn get(&self, actuator: Actuator) -> bool {
        match actuator {
            Actuator::Light => self.light,
            Actuator::Fill => self.fill,
            Actuator::Empty => self.empty,
            Actuator::Dispenser => self.dispenser,
        }
    }

    pub fn set(&mut self, actuator: Actuator, on: bool) {
        let slot = match actuator {
            Actuator::Light => &mut self.light,
            Actuator::Fill => &mut self.fill,
            Actuator::Empty => &mut self.empty,
            Actuator::Dispenser => &mut self.dispenser,
        };
        *slot = on;
    }

    /// Flip one channel and return its new value.
    pub fn toggle(&mut self, actuator: Actuator) -> bool {
        let next = !self.get(actuator);
        self.set(actuator, next);
        next
    }

    /// `(actuator, on)` pairs in display order.
    pub fn iter(&self) -> impl Iterator<Item = (Actuator, bool)> + '_ {
        Actuator::iter().map(|a| (a, self.get(a)))
    }
}
