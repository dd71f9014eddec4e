//! In-memory push-channel dialer for deterministic tests.
//!
//! [`ChannelDialer`] implements [`Dialer`] over `futures` channels, so the
//! reconnect loop can be driven under tokio's paused clock without a real
//! socket. The paired [`DialerControl`] flips the simulated device online
//! or offline, records dial attempts, and hands out the device side of
//! every accepted connection.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use futures::channel::mpsc as fmpsc;
use futures::future::BoxFuture;
use futures::{FutureExt, SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::Instant;
use url::Url;

use crate::error::Error;
use crate::websocket::{Dialer, Frame, Link};

struct Shared {
    online: AtomicBool,
    attempts: Mutex<Vec<Instant>>,
    accepted: mpsc::UnboundedSender<DeviceEnd>,
}

/// Dialer whose connections terminate in a [`DeviceEnd`].
pub struct ChannelDialer {
    shared: Arc<Shared>,
}

/// Test-side control over a [`ChannelDialer`].
pub struct DialerControl {
    shared: Arc<Shared>,
    accepted: mpsc::UnboundedReceiver<DeviceEnd>,
}

/// Create a dialer (initially online) and its control.
pub fn channel_dialer() -> (Arc<ChannelDialer>, DialerControl) {
    let (accepted_tx, accepted_rx) = mpsc::unbounded_channel();
    let shared = Arc::new(Shared {
        online: AtomicBool::new(true),
        attempts: Mutex::new(Vec::new()),
        accepted: accepted_tx,
    });
    (
        Arc::new(ChannelDialer {
            shared: Arc::clone(&shared),
        }),
        DialerControl {
            shared,
            accepted: accepted_rx,
        },
    )
}

impl Dialer for ChannelDialer {
    fn dial(&self, url: &Url) -> BoxFuture<'static, Result<Link, Error>> {
        let shared = Arc::clone(&self.shared);
        let url = url.clone();

        Box::pin(async move {
            shared
                .attempts
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(Instant::now());

            if !shared.online.load(Ordering::SeqCst) {
                return Err(Error::WebSocketConnect("connection refused".into()));
            }

            let (out_tx, out_rx) = fmpsc::unbounded::<String>();
            let (in_tx, in_rx) = fmpsc::unbounded::<Result<Frame, Error>>();

            let device = DeviceEnd {
                url,
                inbound: in_tx,
                outbound: out_rx,
            };
            if shared.accepted.send(device).is_err() {
                return Err(Error::WebSocketConnect("dialer control dropped".into()));
            }

            Ok(Link {
                sink: Box::pin(out_tx.sink_map_err(|e| Error::WebSocketSend(e.to_string()))),
                stream: Box::pin(in_rx),
            })
        })
    }
}

impl DialerControl {
    /// Make subsequent dials succeed (`true`) or be refused (`false`).
    pub fn set_online(&self, online: bool) {
        self.shared.online.store(online, Ordering::SeqCst);
    }

    /// Instants of every dial attempt so far, successful or not.
    pub fn attempts(&self) -> Vec<Instant> {
        self.shared
            .attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Wait for the next successful connection.
    pub async fn accept(&mut self) -> Option<DeviceEnd> {
        self.accepted.recv().await
    }
}

/// The simulated device's side of one connection.
///
/// Dropping it (or calling [`close`](Self::close)) ends the client's
/// read stream, which the client treats as the device closing the socket.
pub struct DeviceEnd {
    pub url: Url,
    inbound: fmpsc::UnboundedSender<Result<Frame, Error>>,
    outbound: fmpsc::UnboundedReceiver<String>,
}

impl DeviceEnd {
    /// Send a raw text frame to the client.
    pub fn push_text(&self, text: impl Into<String>) -> bool {
        self.inbound
            .unbounded_send(Ok(Frame::Text(text.into())))
            .is_ok()
    }

    /// Send a JSON telemetry frame to the client.
    pub fn push_json(&self, value: &serde_json::Value) -> bool {
        self.push_text(value.to_string())
    }

    /// Break the connection with a read error.
    pub fn fail(&self, reason: &str) -> bool {
        self.inbound
            .unbounded_send(Err(Error::WebSocketConnect(reason.to_owned())))
            .is_ok()
    }

    /// Close the connection from the device side.
    pub fn close(self) {
        let _ = self.inbound.unbounded_send(Ok(Frame::Close));
    }

    /// Next frame the client wrote, or `None` once the client closed.
    pub async fn next_sent(&mut self) -> Option<String> {
        self.outbound.next().await
    }

    /// A frame the client already wrote, without waiting.
    pub fn try_sent(&mut self) -> Option<String> {
        self.outbound.next().now_or_never().flatten()
    }
}
