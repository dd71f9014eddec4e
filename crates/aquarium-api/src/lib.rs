// aquarium-api: Async client for the aquarium controller's device surfaces
//
// Two surfaces, one device:
//   - HTTP pull endpoint `GET http://<host>/data` (`telemetry`)
//   - WebSocket push channel `ws://<host>:81/` (`websocket`)
//
// Both deliver the same flat JSON readings; commands travel only over
// the push channel (`protocol`).

pub mod address;
pub mod error;
pub mod protocol;
pub mod telemetry;
pub mod transport;
pub mod websocket;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use address::DeviceAddress;
pub use error::Error;
pub use protocol::{DeviceAction, PinCommand};
pub use telemetry::TelemetryClient;
pub use transport::{DEFAULT_PUSH_PORT, TransportConfig};
pub use websocket::{
    ConnectionHandle, ConnectionHealth, Dialer, Frame, Link, PushSender, ReconnectConfig,
    TungsteniteDialer,
};
