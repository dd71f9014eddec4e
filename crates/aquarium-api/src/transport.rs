// Shared transport configuration for building reqwest::Client instances.
//
// The pull client and any ad-hoc fetches share timeout and user-agent
// settings through this module.

use std::time::Duration;

use crate::error::Error;

/// Default WebSocket port the device firmware listens on.
pub const DEFAULT_PUSH_PORT: u16 = 81;

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone, Default)]
pub struct TransportConfig {
    /// Per-request timeout. `None` leaves reqwest's default (no timeout),
    /// so a hung fetch only delays its own tick.
    pub timeout: Option<Duration>,
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("aquarium/", env!("CARGO_PKG_VERSION")));

        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        builder.build().map_err(Error::Transport)
    }
}
