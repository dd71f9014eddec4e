// ── Runtime controller configuration ──
//
// These types describe *how* the core talks to one device: ports,
// cadences, countdown constants and the pin mapping. They never touch
// disk; the CLI builds a `ControllerConfig` and hands it in.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use aquarium_api::DEFAULT_PUSH_PORT;

use crate::model::Actuator;

/// Default pull cadence.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Default feed reminder countdown (30 minutes).
pub const DEFAULT_FEED_COUNTDOWN_SECS: u32 = 1800;

/// Default water-change reminder countdown (19 minutes).
pub const DEFAULT_WATER_CHANGE_COUNTDOWN_SECS: u32 = 1140;

/// Which device pin drives each actuator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PinMap {
    pub light: String,
    pub fill: String,
    pub empty: String,
    pub dispenser: String,
}

impl PinMap {
    pub fn pin(&self, actuator: Actuator) -> &str {
        match actuator {
            Actuator::Light => &self.light,
            Actuator::Fill => &self.fill,
            Actuator::Empty => &self.empty,
            Actuator::Dispenser => &self.dispenser,
        }
    }
}

impl Default for PinMap {
    fn default() -> Self {
        Self {
            light: "pin1".into(),
            fill: "pin2".into(),
            empty: "pin3".into(),
            dispenser: "pin4".into(),
        }
    }
}

/// Configuration for driving a single device.
///
/// The device address itself is *not* part of this struct: it is passed
/// to [`Controller::start`](crate::Controller::start) and can change at
/// runtime via [`Controller::set_address`](crate::Controller::set_address).
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// WebSocket port on the device.
    pub push_port: u16,
    /// Pull cadence. `Duration::ZERO` disables periodic polling.
    pub poll_interval: Duration,
    /// Flat delay between push-channel reconnect attempts.
    pub reconnect_delay: Duration,
    /// Per-fetch timeout. `None` means no timeout.
    pub request_timeout: Option<Duration>,
    /// Initial feed countdown, in seconds.
    pub feed_countdown_secs: u32,
    /// Initial water-change countdown, in seconds.
    pub water_change_countdown_secs: u32,
    pub pins: PinMap,
    /// Open the push channel at all. Pull-only when `false`.
    pub websocket_enabled: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            push_port: DEFAULT_PUSH_PORT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            reconnect_delay: aquarium_api::websocket::DEFAULT_RECONNECT_DELAY,
            request_timeout: None,
            feed_countdown_secs: DEFAULT_FEED_COUNTDOWN_SECS,
            water_change_countdown_secs: DEFAULT_WATER_CHANGE_COUNTDOWN_SECS,
            pins: PinMap::default(),
            websocket_enabled: true,
        }
    }
}
