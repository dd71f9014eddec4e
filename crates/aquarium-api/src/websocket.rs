//! WebSocket push channel with flat-delay auto-reconnect.
//!
//! Keeps a single bidirectional connection to the device's
//! `ws://<host>:81/` endpoint. Parsed telemetry frames are forwarded
//! through an `mpsc` channel; outbound frames are written only while the
//! channel is [`Connected`](ConnectionHealth::Connected).
//!
//! Reconnection uses a fixed delay with no retry cap: the device is an
//! embedded peer on flaky Wi-Fi, so the loop keeps trying for as long as
//! the handle is alive.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use aquarium_api::websocket::{ConnectionHandle, ReconnectConfig, TungsteniteDialer};
//!
//! let (health, _) = tokio::sync::watch::channel(Default::default());
//! let (telemetry_tx, mut telemetry_rx) = tokio::sync::mpsc::unbounded_channel();
//! let handle = ConnectionHandle::spawn(
//!     "ws://192.168.70.37:81/".parse()?,
//!     Arc::new(TungsteniteDialer::default()),
//!     ReconnectConfig::default(),
//!     Arc::new(health),
//!     telemetry_tx,
//!     CancellationToken::new(),
//! );
//!
//! handle.sender().send("pin1_on");
//! while let Some(reading) = telemetry_rx.recv().await {
//!     println!("{reading}");
//! }
//! handle.shutdown().await;
//! ```

use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures::future::{self, BoxFuture};
use futures::{Sink, SinkExt, Stream, StreamExt};
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::error::Error;

/// Observed reconnect delay of the original dashboard.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(2000);

/// Upper bound on flushing queued frames during shutdown.
const FLUSH_TIMEOUT: Duration = Duration::from_secs(1);

// ── ConnectionHealth ─────────────────────────────────────────────────

/// Push-channel health as seen by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionHealth {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionHealth {
    pub fn is_connected(self) -> bool {
        self == Self::Connected
    }
}

impl fmt::Display for ConnectionHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        })
    }
}

// ── Link abstraction ─────────────────────────────────────────────────

/// An inbound frame, reduced to what the device actually sends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Close,
}

pub type FrameSink = Pin<Box<dyn Sink<String, Error = Error> + Send>>;
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<Frame, Error>> + Send>>;

/// An established connection, split into its write and read halves.
pub struct Link {
    pub sink: FrameSink,
    pub stream: FrameStream,
}

/// Opens a [`Link`] to a push-channel URL.
///
/// [`TungsteniteDialer`] is the real implementation; tests swap in a
/// channel-backed one.
pub trait Dialer: Send + Sync {
    fn dial(&self, url: &Url) -> BoxFuture<'static, Result<Link, Error>>;
}

/// Dials real WebSocket connections via `tokio-tungstenite`.
#[derive(Debug, Clone)]
pub struct TungsteniteDialer {
    /// Bound on the TCP + upgrade handshake. `None` leaves it to the OS.
    pub connect_timeout: Option<Duration>,
}

impl Default for TungsteniteDialer {
    fn default() -> Self {
        Self {
            connect_timeout: Some(Duration::from_secs(10)),
        }
    }
}

impl Dialer for TungsteniteDialer {
    fn dial(&self, url: &Url) -> BoxFuture<'static, Result<Link, Error>> {
        let url = url.as_str().to_owned();
        let connect_timeout = self.connect_timeout;

        Box::pin(async move {
            let handshake = tokio_tungstenite::connect_async(url);
            let result = match connect_timeout {
                Some(limit) => tokio::time::timeout(limit, handshake)
                    .await
                    .map_err(|_| Error::WebSocketConnect("handshake timed out".into()))?,
                None => handshake.await,
            };
            let (ws_stream, _response) =
                result.map_err(|e| Error::WebSocketConnect(e.to_string()))?;

            let (write, read) = ws_stream.split();

            let sink = write
                .sink_map_err(|e| Error::WebSocketSend(e.to_string()))
                .with(|text: String| future::ready(Ok::<_, Error>(Message::text(text))));

            let stream = read.filter_map(|msg| {
                future::ready(match msg {
                    Ok(Message::Text(text)) => Some(Ok(Frame::Text(text.as_str().to_owned()))),
                    Ok(Message::Close(frame)) => {
                        if let Some(ref cf) = frame {
                            debug!(code = %cf.code, reason = %cf.reason, "close frame received");
                        }
                        Some(Ok(Frame::Close))
                    }
                    // tungstenite answers pings on its own; binary is not part of the protocol
                    Ok(_) => None,
                    Err(e) => Some(Err(Error::WebSocketConnect(e.to_string()))),
                })
            });

            Ok(Link {
                sink: Box::pin(sink),
                stream: Box::pin(stream),
            })
        })
    }
}

// ── ReconnectConfig ──────────────────────────────────────────────────

/// Flat reconnect policy: same delay every time, retried forever.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    pub delay: Duration,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            delay: DEFAULT_RECONNECT_DELAY,
        }
    }
}

// ── PushSender ───────────────────────────────────────────────────────

/// Cloneable write side of a push channel.
#[derive(Debug, Clone)]
pub struct PushSender {
    health: watch::Receiver<ConnectionHealth>,
    outbound: mpsc::UnboundedSender<String>,
}

impl PushSender {
    /// Queue a frame if and only if the channel is currently connected.
    ///
    /// Returns `false` (and logs) when the frame was dropped. Nothing is
    /// buffered for later delivery.
    pub fn send(&self, text: impl Into<String>) -> bool {
        let health = *self.health.borrow();
        let text = text.into();

        if !health.is_connected() {
            warn!(%health, frame = %text, "push channel not connected, dropping frame");
            return false;
        }
        if self.outbound.send(text).is_err() {
            warn!("push channel shut down, dropping frame");
            return false;
        }
        true
    }

    pub fn health(&self) -> ConnectionHealth {
        *self.health.borrow()
    }
}

// ── ConnectionHandle ─────────────────────────────────────────────────

/// Handle to a running push-channel task.
///
/// Dropping the handle does not stop the task; call
/// [`shutdown`](Self::shutdown) to cancel it and wait for the socket to close.
pub struct ConnectionHandle {
    url: Url,
    sender: PushSender,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl ConnectionHandle {
    /// Spawn the connect → read → reconnect loop for `url`.
    ///
    /// Returns immediately; the first attempt happens on the spawned task.
    /// `health` is written exclusively by this task until it exits.
    pub fn spawn(
        url: Url,
        dialer: Arc<dyn Dialer>,
        reconnect: ReconnectConfig,
        health: Arc<watch::Sender<ConnectionHealth>>,
        telemetry_tx: mpsc::UnboundedSender<serde_json::Value>,
        cancel: CancellationToken,
    ) -> Self {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let sender = PushSender {
            health: health.subscribe(),
            outbound: outbound_tx,
        };

        let ctx = LoopContext {
            url: url.clone(),
            dialer,
            reconnect,
            health,
            telemetry_tx,
            cancel: cancel.clone(),
        };
        let task = tokio::spawn(ws_loop(ctx, outbound_rx));

        Self {
            url,
            sender,
            cancel,
            task,
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn sender(&self) -> PushSender {
        self.sender.clone()
    }

    pub fn health(&self) -> ConnectionHealth {
        self.sender.health()
    }

    /// Cancel the loop, flush and close the socket, and wait for the task.
    ///
    /// No reconnect is scheduled once this returns.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            warn!(error = %e, "push channel task ended abnormally");
        }
    }
}

// ── Background reconnection loop ─────────────────────────────────────

struct LoopContext {
    url: Url,
    dialer: Arc<dyn Dialer>,
    reconnect: ReconnectConfig,
    health: Arc<watch::Sender<ConnectionHealth>>,
    telemetry_tx: mpsc::UnboundedSender<serde_json::Value>,
    cancel: CancellationToken,
}

enum LinkEnd {
    Cancelled,
    Closed,
    Failed(Error),
}

/// Main loop: connect → read/write → on drop, wait the flat delay → reconnect.
async fn ws_loop(ctx: LoopContext, mut outbound_rx: mpsc::UnboundedReceiver<String>) {
    let mut failures: u32 = 0;
    let delay_ms = u64::try_from(ctx.reconnect.delay.as_millis()).unwrap_or(u64::MAX);

    loop {
        discard_unsent(&mut outbound_rx);
        ctx.health.send_replace(ConnectionHealth::Connecting);
        info!(url = %ctx.url, failures, "connecting to push channel");

        let dialed = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => break,
            result = ctx.dialer.dial(&ctx.url) => result,
        };

        match dialed {
            Ok(link) => {
                ctx.health.send_replace(ConnectionHealth::Connected);
                info!(url = %ctx.url, "push channel connected");
                failures = 0;

                match run_link(link, &ctx, &mut outbound_rx).await {
                    LinkEnd::Cancelled => break,
                    LinkEnd::Closed => info!("push channel closed by device"),
                    LinkEnd::Failed(e) => warn!(error = %e, "push channel dropped"),
                }
            }
            Err(e) => {
                failures = failures.saturating_add(1);
                warn!(error = %e, failures, "push channel connect failed");
            }
        }

        ctx.health.send_replace(ConnectionHealth::Disconnected);
        info!(delay_ms, "waiting before push channel reconnect");

        tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => break,
            () = tokio::time::sleep(ctx.reconnect.delay) => {}
        }
    }

    ctx.health.send_replace(ConnectionHealth::Disconnected);
    debug!(url = %ctx.url, "push channel loop exiting");
}

/// Pump one established link until it closes, fails, or is cancelled.
async fn run_link(
    link: Link,
    ctx: &LoopContext,
    outbound_rx: &mut mpsc::UnboundedReceiver<String>,
) -> LinkEnd {
    let Link {
        mut sink,
        mut stream,
    } = link;

    loop {
        tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => {
                flush_and_close(&mut sink, outbound_rx).await;
                return LinkEnd::Cancelled;
            }
            frame = stream.next() => match frame {
                Some(Ok(Frame::Text(text))) => forward_telemetry(&text, &ctx.telemetry_tx),
                Some(Ok(Frame::Close)) | None => return LinkEnd::Closed,
                Some(Err(e)) => return LinkEnd::Failed(e),
            },
            Some(text) = outbound_rx.recv() => {
                trace!(frame = %text, "push channel send");
                if let Err(e) = sink.send(text).await {
                    return LinkEnd::Failed(e);
                }
            }
        }
    }
}

/// Write whatever was accepted while connected, then close the socket.
async fn flush_and_close(sink: &mut FrameSink, outbound_rx: &mut mpsc::UnboundedReceiver<String>) {
    let flush = async {
        while let Ok(text) = outbound_rx.try_recv() {
            sink.send(text).await?;
        }
        sink.close().await
    };

    match tokio::time::timeout(FLUSH_TIMEOUT, flush).await {
        Ok(Ok(())) => debug!("push channel closed"),
        Ok(Err(e)) => debug!(error = %e, "push channel close failed"),
        Err(_) => debug!("push channel close timed out"),
    }
}

/// Parse a text frame as JSON and hand it to the reconciler side.
fn forward_telemetry(text: &str, telemetry_tx: &mpsc::UnboundedSender<serde_json::Value>) {
    match serde_json::from_str::<serde_json::Value>(text) {
        Ok(value) => {
            // No receiver just means nobody is listening right now
            let _ = telemetry_tx.send(value);
        }
        Err(e) => warn!(error = %e, frame = %text, "discarding malformed telemetry frame"),
    }
}

/// Frames accepted by a link that has since dropped are never replayed.
fn discard_unsent(outbound_rx: &mut mpsc::UnboundedReceiver<String>) {
    let mut dropped = 0_usize;
    while outbound_rx.try_recv().is_ok() {
        dropped += 1;
    }
    if dropped > 0 {
        warn!(dropped, "discarding frames queued on a dropped push channel");
    }
}

// ── Tests ────────────────────────────────────────────────────────────
