// ── Controller abstraction ──
//
// Full lifecycle management for one aquarium device. Owns the push
// channel, the pull poller, the reconciling task and the reminder tick,
// and routes commands onto the push channel.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use arc_swap::ArcSwapOption;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use url::Url;

use aquarium_api::{
    ConnectionHandle, ConnectionHealth, DeviceAddress, Dialer, PinCommand, PushSender,
    ReconnectConfig, TelemetryClient, TransportConfig, TungsteniteDialer,
};

use crate::command::{Command, CommandResult, encode_schedule};
use crate::config::ControllerConfig;
use crate::error::CoreError;
use crate::model::{
    Actuator, ActuatorState, ReminderState, ScheduleKind, ScheduleSettings, TankState,
    TelemetrySource,
};
use crate::reminder::{REMINDER_TICK, reminder_task};
use crate::store::DataStore;
use crate::store::reconcile::{ReconcileEvent, reconcile_task};
use crate::stream::StateStream;

// ── Session ──────────────────────────────────────────────────────────

/// Everything bound to the current device address.
struct Session {
    address: DeviceAddress,
    generation: u64,
    push: Option<PushSender>,
    telemetry: TelemetryClient,
}

/// Clients and URLs for a new address, built before the old session is
/// torn down so a failure leaves the running session untouched.
struct SessionPlan {
    address: DeviceAddress,
    telemetry: TelemetryClient,
    push_url: Option<Url>,
}

impl SessionPlan {
    fn prepare(config: &ControllerConfig, address: DeviceAddress) -> Result<Self, CoreError> {
        let transport = TransportConfig {
            timeout: config.request_timeout,
        };
        let telemetry = TelemetryClient::new(&address, &transport)?;
        let push_url = if config.websocket_enabled {
            Some(address.push_url(config.push_port)?)
        } else {
            None
        };
        Ok(Self {
            address,
            telemetry,
            push_url,
        })
    }
}

/// Teardown handles for the current session.
struct SessionTasks {
    /// Stops the poller and the push bridge.
    cancel: CancellationToken,
    connection: Option<ConnectionHandle>,
    handles: Vec<JoinHandle<()>>,
}

// ── Controller ───────────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<ControllerInner>`. Owns every background
/// task; nothing runs until [`start`](Self::start) and everything stops
/// at [`stop`](Self::stop).
#[derive(Clone)]
pub struct Controller {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    config: ControllerConfig,
    store: Arc<DataStore>,
    dialer: Arc<dyn Dialer>,
    events_tx: mpsc::UnboundedSender<ReconcileEvent>,
    events_rx: Mutex<Option<mpsc::UnboundedReceiver<ReconcileEvent>>>,
    generation: AtomicU64,
    session: ArcSwapOption<Session>,
    session_tasks: Mutex<Option<SessionTasks>>,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Controller {
    /// Create a new Controller. Does NOT connect; call
    /// [`start()`](Self::start) with a device address.
    pub fn new(config: ControllerConfig) -> Self {
        Self::with_dialer(config, Arc::new(TungsteniteDialer::default()))
    }

    /// Create a Controller that opens push channels through `dialer`.
    pub fn with_dialer(config: ControllerConfig, dialer: Arc<dyn Dialer>) -> Self {
        let store = Arc::new(DataStore::new(ReminderState::new(
            config.feed_countdown_secs,
            config.water_change_countdown_secs,
        )));
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        Self {
            inner: Arc::new(ControllerInner {
                config,
                store,
                dialer,
                events_tx,
                events_rx: Mutex::new(Some(events_rx)),
                generation: AtomicU64::new(0),
                session: ArcSwapOption::empty(),
                session_tasks: Mutex::new(None),
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Access the controller configuration.
    pub fn config(&self) -> &ControllerConfig {
        &self.inner.config
    }

    /// Access the underlying DataStore.
    pub fn store(&self) -> &Arc<DataStore> {
        &self.inner.store
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Start talking to the device at `address`.
    ///
    /// Spawns the reconciling task and the reminder tick on first call,
    /// then opens the push channel and the poller. Calling `start` on a
    /// running controller re-targets it like [`set_address`](Self::set_address).
    pub async fn start(&self, address: DeviceAddress) -> Result<(), CoreError> {
        if self.inner.cancel.is_cancelled() {
            return Err(CoreError::Internal("controller has been stopped".into()));
        }

        let mut tasks = self.inner.session_tasks.lock().await;

        if let Some(rx) = self.inner.events_rx.lock().await.take() {
            let mut handles = self.inner.task_handles.lock().await;
            handles.push(tokio::spawn(reconcile_task(
                Arc::clone(&self.inner.store),
                rx,
                self.inner.cancel.clone(),
            )));
            handles.push(tokio::spawn(reminder_task(
                Arc::clone(&self.inner.store),
                REMINDER_TICK,
                self.inner.cancel.clone(),
            )));
            debug!("process tasks started");
        }

        let plan = SessionPlan::prepare(&self.inner.config, address)?;
        self.close_session(&mut tasks).await;
        *tasks = Some(self.open_session(plan));
        Ok(())
    }

    /// Re-target both device surfaces.
    ///
    /// Tears down the poller and the push channel for the old address,
    /// wipes telemetry, and starts fresh. Responses still in flight for
    /// the old address are discarded when they land.
    pub async fn set_address(&self, address: DeviceAddress) -> Result<(), CoreError> {
        let mut tasks = self.inner.session_tasks.lock().await;
        if tasks.is_none() {
            return Err(CoreError::NotStarted);
        }

        let plan = SessionPlan::prepare(&self.inner.config, address)?;
        info!(address = %plan.address, "switching device address");
        self.close_session(&mut tasks).await;
        *tasks = Some(self.open_session(plan));
        Ok(())
    }

    /// Stop everything: poller, push channel, then the reminder tick and
    /// the reconciling task. A stopped controller cannot be restarted.
    pub async fn stop(&self) {
        {
            let mut tasks = self.inner.session_tasks.lock().await;
            self.close_session(&mut tasks).await;
        }

        self.inner.cancel.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        debug!("controller stopped");
    }

    /// One-shot: start, run closure, stop.
    ///
    /// Periodic polling is disabled; the closure drives any fetches it
    /// needs through [`refresh_now`](Self::refresh_now).
    pub async fn oneshot<F, Fut, T>(
        config: ControllerConfig,
        address: DeviceAddress,
        f: F,
    ) -> Result<T, CoreError>
    where
        F: FnOnce(Controller) -> Fut,
        Fut: std::future::Future<Output = Result<T, CoreError>>,
    {
        let mut cfg = config;
        cfg.poll_interval = Duration::ZERO;

        let controller = Controller::new(cfg);
        controller.start(address).await?;
        let result = f(controller.clone()).await;
        controller.stop().await;
        result
    }

    fn open_session(&self, plan: SessionPlan) -> SessionTasks {
        let config = &self.inner.config;
        let SessionPlan {
            address,
            telemetry,
            push_url,
        } = plan;

        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let _ = self.inner.events_tx.send(ReconcileEvent::Reset { generation });

        let cancel = self.inner.cancel.child_token();
        let mut handles = Vec::new();

        let connection = push_url.map(|url| {
            let (telemetry_tx, telemetry_rx) = mpsc::unbounded_channel();
            let connection = ConnectionHandle::spawn(
                url,
                Arc::clone(&self.inner.dialer),
                ReconnectConfig {
                    delay: config.reconnect_delay,
                },
                Arc::clone(&self.inner.store.health),
                telemetry_tx,
                self.inner.cancel.child_token(),
            );
            handles.push(tokio::spawn(push_bridge_task(
                telemetry_rx,
                self.inner.events_tx.clone(),
                generation,
                cancel.clone(),
            )));
            connection
        });

        if config.poll_interval.is_zero() {
            debug!("periodic polling disabled");
        } else {
            handles.push(tokio::spawn(poll_task(
                telemetry.clone(),
                self.inner.events_tx.clone(),
                generation,
                config.poll_interval,
                cancel.clone(),
            )));
        }

        info!(
            %address,
            generation,
            push = connection.is_some(),
            "device session started"
        );

        self.inner.session.store(Some(Arc::new(Session {
            address,
            generation,
            push: connection.as_ref().map(ConnectionHandle::sender),
            telemetry,
        })));

        SessionTasks {
            cancel,
            connection,
            handles,
        }
    }

    /// Poller first, then the socket, so no reconnect outlives the session.
    async fn close_session(&self, tasks: &mut Option<SessionTasks>) {
        self.inner.session.store(None);

        let Some(session) = tasks.take() else {
            return;
        };

        session.cancel.cancel();
        for handle in session.handles {
            let _ = handle.await;
        }
        if let Some(connection) = session.connection {
            connection.shutdown().await;
        }
        debug!("device session closed");
    }

    // ── Telemetry ────────────────────────────────────────────────────

    /// Fetch immediately, outside the polling cadence.
    ///
    /// Resolves once the reading has been reconciled and returns the
    /// resulting snapshot. Fetch and payload errors are returned; a
    /// response that lands after an address switch is discarded and the
    /// current (new-address) snapshot is returned instead.
    pub async fn refresh_now(&self) -> Result<TankState, CoreError> {
        let session = self.inner.session.load_full().ok_or(CoreError::NotStarted)?;

        let payload = session.telemetry.fetch().await?;

        let (ack_tx, ack_rx) = oneshot::channel();
        self.inner
            .events_tx
            .send(ReconcileEvent::Reading {
                generation: session.generation,
                source: TelemetrySource::Pull,
                payload,
                ack: Some(ack_tx),
            })
            .map_err(|_| CoreError::Internal("reconcile task is not running".into()))?;

        ack_rx
            .await
            .map_err(|_| CoreError::Internal("reconcile task dropped the reading".into()))??;

        Ok(self.inner.store.current_state())
    }

    // ── Command dispatch ─────────────────────────────────────────────

    /// Flip `actuator` locally, then send the token for its new state.
    pub fn toggle_actuator(&self, actuator: Actuator) -> CommandResult {
        let mut on = false;
        self.inner
            .store
            .actuators
            .send_modify(|state| on = state.toggle(actuator));
        self.send_pin(actuator, on)
    }

    /// Record `on` for `actuator` and send it.
    pub fn set_actuator(&self, actuator: Actuator, on: bool) -> CommandResult {
        self.inner
            .store
            .actuators
            .send_modify(|state| state.set(actuator, on));
        self.send_pin(actuator, on)
    }

    /// Validate `value` for `kind` and send the matching action envelope.
    ///
    /// Invalid input returns [`CoreError::Validation`] and sends nothing.
    pub fn set_schedule(&self, kind: ScheduleKind, value: &str) -> Result<CommandResult, CoreError> {
        let update = encode_schedule(kind, value)?;
        let frame = update
            .action()
            .to_frame()
            .map_err(|e| CoreError::Internal(format!("encoding {kind}: {e}")))?;

        self.inner
            .store
            .schedule
            .send_modify(|settings| update.apply_to(settings));
        Ok(self.send_frame(frame))
    }

    /// Route a [`Command`] to the matching dispatcher operation.
    pub fn execute(&self, cmd: Command) -> Result<CommandResult, CoreError> {
        match cmd {
            Command::ToggleActuator(actuator) => Ok(self.toggle_actuator(actuator)),
            Command::SetActuator { actuator, on } => Ok(self.set_actuator(actuator, on)),
            Command::SetSchedule { kind, value } => self.set_schedule(kind, &value),
        }
    }

    fn send_pin(&self, actuator: Actuator, on: bool) -> CommandResult {
        let token = PinCommand::new(self.inner.config.pins.pin(actuator), on).token();
        debug!(%actuator, on, %token, "actuator command");
        self.send_frame(token)
    }

    fn send_frame(&self, frame: String) -> CommandResult {
        let session = self.inner.session.load_full();
        match session.as_ref().and_then(|s| s.push.as_ref()) {
            Some(push) => CommandResult::from(push.send(frame)),
            None => {
                warn!(%frame, "no push channel, dropping frame");
                CommandResult::Dropped
            }
        }
    }

    /// Wait until the push channel reports `Connected`.
    pub async fn wait_connected(&self, timeout: Duration) -> Result<(), CoreError> {
        if !self.inner.config.websocket_enabled {
            return Err(CoreError::Config {
                message: "push channel is disabled".into(),
            });
        }

        let mut health = self.inner.store.health.subscribe();
        match tokio::time::timeout(timeout, health.wait_for(|h| h.is_connected())).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(_)) => Err(CoreError::Internal("health channel closed".into())),
            Err(_) => Err(CoreError::Transport {
                message: format!("push channel not connected after {timeout:?}"),
            }),
        }
    }

    // ── State observation ────────────────────────────────────────────

    /// Current device address, if started.
    pub fn address(&self) -> Option<DeviceAddress> {
        self.inner.session.load_full().map(|s| s.address.clone())
    }

    /// Generation of the current address; bumps on every re-target.
    pub fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::SeqCst)
    }

    pub fn tank_snapshot(&self) -> TankState {
        self.inner.store.current_state()
    }

    pub fn water_level_percent(&self) -> Option<f64> {
        self.inner.store.current_state().water_level_percent()
    }

    pub fn actuators_snapshot(&self) -> ActuatorState {
        self.inner.store.actuators_snapshot()
    }

    pub fn schedule_snapshot(&self) -> ScheduleSettings {
        self.inner.store.schedule_snapshot()
    }

    pub fn reminders_snapshot(&self) -> ReminderState {
        self.inner.store.reminders_snapshot()
    }

    pub fn health(&self) -> ConnectionHealth {
        self.inner.store.health()
    }

    // ── Subscriptions ────────────────────────────────────────────────

    pub fn tank(&self) -> StateStream<TankState> {
        self.inner.store.subscribe_tank()
    }

    pub fn actuators(&self) -> StateStream<ActuatorState> {
        self.inner.store.subscribe_actuators()
    }

    pub fn schedule(&self) -> StateStream<ScheduleSettings> {
        self.inner.store.subscribe_schedule()
    }

    pub fn reminders(&self) -> StateStream<ReminderState> {
        self.inner.store.subscribe_reminders()
    }

    pub fn connection_health(&self) -> StateStream<ConnectionHealth> {
        self.inner.store.subscribe_health()
    }
}

// ── Background tasks ─────────────────────────────────────────────────

/// Tag push-channel readings with the session generation.
async fn push_bridge_task(
    mut rx: mpsc::UnboundedReceiver<serde_json::Value>,
    events_tx: mpsc::UnboundedSender<ReconcileEvent>,
    generation: u64,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            payload = rx.recv() => {
                let Some(payload) = payload else { break };
                trace!(generation, "push reading");
                let _ = events_tx.send(ReconcileEvent::Reading {
                    generation,
                    source: TelemetrySource::Push,
                    payload,
                    ack: None,
                });
            }
        }
    }
}

/// Fetch the pull endpoint every `period`, starting immediately.
///
/// Each fetch runs on its own task so a slow response only holds up
/// itself; failures are logged and the tick is skipped.
async fn poll_task(
    client: TelemetryClient,
    events_tx: mpsc::UnboundedSender<ReconcileEvent>,
    generation: u64,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                tokio::spawn(fetch_once(
                    client.clone(),
                    events_tx.clone(),
                    generation,
                    cancel.clone(),
                ));
            }
        }
    }
}

async fn fetch_once(
    client: TelemetryClient,
    events_tx: mpsc::UnboundedSender<ReconcileEvent>,
    generation: u64,
    cancel: CancellationToken,
) {
    let result = tokio::select! {
        biased;
        _ = cancel.cancelled() => return,
        result = client.fetch() => result,
    };

    match result {
        Ok(payload) => {
            let _ = events_tx.send(ReconcileEvent::Reading {
                generation,
                source: TelemetrySource::Pull,
                payload,
                ack: None,
            });
        }
        Err(e) if e.is_transient() => {
            debug!(error = %e, url = %client.data_url(), "telemetry fetch failed");
        }
        Err(e) => warn!(error = %e, url = %client.data_url(), "telemetry fetch failed"),
    }
}

// ── Tests ────────────────────────────────────────────────────────────
