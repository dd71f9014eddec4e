// ── Central reactive data store ──
//
// Holds every piece of state the presentation layer reads. Each piece
// lives in its own `watch` channel so consumers can snapshot or subscribe
// independently.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::trace;

use aquarium_api::ConnectionHealth;

use super::reconcile::parse_reading;
use crate::error::CoreError;
use crate::model::{ActuatorState, ReminderState, ScheduleSettings, TankState, TelemetrySource};
use crate::stream::StateStream;

/// Central reactive store for one device's state.
///
/// Writers are partitioned: the reconciler owns `tank`, the dispatcher
/// owns `actuators` and `schedule`, the reminder tick owns `reminders`,
/// and the push channel owns `health`.
pub struct DataStore {
    pub(crate) tank: watch::Sender<TankState>,
    pub(crate) actuators: watch::Sender<ActuatorState>,
    pub(crate) schedule: watch::Sender<ScheduleSettings>,
    pub(crate) reminders: watch::Sender<ReminderState>,
    pub(crate) health: Arc<watch::Sender<ConnectionHealth>>,
    pub(crate) last_push: watch::Sender<Option<DateTime<Utc>>>,
    pub(crate) last_pull: watch::Sender<Option<DateTime<Utc>>>,
}

impl DataStore {
    pub fn new(reminders: ReminderState) -> Self {
        let (tank, _) = watch::channel(TankState::default());
        let (actuators, _) = watch::channel(ActuatorState::default());
        let (schedule, _) = watch::channel(ScheduleSettings::default());
        let (reminders, _) = watch::channel(reminders);
        let (health, _) = watch::channel(ConnectionHealth::Disconnected);
        let (last_push, _) = watch::channel(None);
        let (last_pull, _) = watch::channel(None);

        Self {
            tank,
            actuators,
            schedule,
            reminders,
            health: Arc::new(health),
            last_push,
            last_pull,
        }
    }

    // ── Reconciliation ───────────────────────────────────────────────

    /// Validate `payload` and merge it into the tank state.
    ///
    /// Fields the payload carries overwrite the stored values; fields it
    /// omits are left alone. The newest arrival wins regardless of source.
    /// Invalid payloads leave the state untouched.
    pub fn apply_reading(
        &self,
        source: TelemetrySource,
        payload: &serde_json::Value,
    ) -> Result<(), CoreError> {
        let reading = parse_reading(payload)?;
        let now = Utc::now();

        self.tank.send_modify(|tank| {
            if let Some(t) = reading.temperature_celsius {
                tank.temperature_celsius = Some(t);
            }
            if let Some(d) = reading.water_level_distance_cm {
                tank.water_level_distance_cm = Some(d);
            }
            tank.last_updated_source = Some(source);
            tank.last_updated_at = Some(now);
        });

        match source {
            TelemetrySource::Push => self.last_push.send_replace(Some(now)),
            TelemetrySource::Pull => self.last_pull.send_replace(Some(now)),
        };

        trace!(%source, ?reading, "reading applied");
        Ok(())
    }

    /// Forget all telemetry. Used only when the device address changes.
    pub(crate) fn reset_tank(&self) {
        self.tank.send_if_modified(|tank| {
            let had_data = *tank != TankState::default();
            *tank = TankState::default();
            had_data
        });
        self.last_push.send_replace(None);
        self.last_pull.send_replace(None);
    }

    // ── Snapshot accessors ───────────────────────────────────────────

    pub fn current_state(&self) -> TankState {
        self.tank.borrow().clone()
    }

    pub fn actuators_snapshot(&self) -> ActuatorState {
        *self.actuators.borrow()
    }

    pub fn schedule_snapshot(&self) -> ScheduleSettings {
        self.schedule.borrow().clone()
    }

    pub fn reminders_snapshot(&self) -> ReminderState {
        *self.reminders.borrow()
    }

    pub fn health(&self) -> ConnectionHealth {
        *self.health.borrow()
    }

    // ── Subscriptions ────────────────────────────────────────────────

    pub fn subscribe_tank(&self) -> StateStream<TankState> {
        StateStream::new(self.tank.subscribe())
    }

    pub fn subscribe_actuators(&self) -> StateStream<ActuatorState> {
        StateStream::new(self.actuators.subscribe())
    }

    pub fn subscribe_schedule(&self) -> StateStream<ScheduleSettings> {
        StateStream::new(self.schedule.subscribe())
    }

    pub fn subscribe_reminders(&self) -> StateStream<ReminderState> {
        StateStream::new(self.reminders.subscribe())
    }

    pub fn subscribe_health(&self) -> StateStream<ConnectionHealth> {
        StateStream::new(self.health.subscribe())
    }

    // ── Metadata ─────────────────────────────────────────────────────

    pub fn last_push(&self) -> Option<DateTime<Utc>> {
        *self.last_push.borrow()
    }

    pub fn last_pull(&self) -> Option<DateTime<Utc>> {
        *self.last_pull.borrow()
    }

    /// How long ago the newest reading arrived, or `None` if none has.
    pub fn data_age(&self) -> Option<chrono::Duration> {
        self.tank.borrow().last_updated_at.map(|t| Utc::now() - t)
    }
}

impl Default for DataStore {
    fn default() -> Self {
        Self::new(ReminderState::new(
            crate::config::DEFAULT_FEED_COUNTDOWN_SECS,
            crate::config::DEFAULT_WATER_CHANGE_COUNTDOWN_SECS,
        ))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn push_after_pull_leaves_push_values() {
        let store = DataStore::default();
        store
            .apply_reading(TelemetrySource::Pull, &json!({ "temperature": 24.0, "water_level": 10.0 }))
            .unwrap();
        store
            .apply_reading(TelemetrySource::Push, &json!({ "temperature": 25.5, "water_level": 8.0 }))
            .unwrap();

        let state = store.current_state();
        assert_eq!(state.last_updated_source, Some(TelemetrySource::Push));
        assert_eq!(state.temperature_celsius, Some(25.5));
        assert_eq!(state.water_level_distance_cm, Some(8.0));
        assert!(store.last_pull().is_some());
        assert!(store.last_push().unwrap() >= store.last_pull().unwrap());
    }

    #[test]
    fn partial_reading_keeps_other_field() {
        let store = DataStore::default();
        store
            .apply_reading(TelemetrySource::Pull, &json!({ "temperature": 24.0, "water_level": 10.0 }))
            .unwrap();
        store
            .apply_reading(TelemetrySource::Push, &json!({ "distance": 12.0 }))
            .unwrap();

        let state = store.current_state();
        assert_eq!(state.temperature_celsius, Some(24.0));
        assert_eq!(state.water_level_distance_cm, Some(12.0));
    }

    #[test]
    fn invalid_reading_leaves_state_untouched() {
        let store = DataStore::default();
        store
            .apply_reading(TelemetrySource::Pull, &json!({ "temperature": 24.0 }))
            .unwrap();
        let before = store.current_state();

        let err = store
            .apply_reading(TelemetrySource::Push, &json!({ "temperature": "hot" }))
            .unwrap_err();
        assert!(matches!(err, CoreError::Protocol { .. }));
        assert_eq!(store.current_state(), before);
        assert!(store.last_push().is_none());
    }

    #[test]
    fn reset_returns_to_unknown() {
        let store = DataStore::default();
        store
            .apply_reading(TelemetrySource::Pull, &json!({ "temperature": 24.0 }))
            .unwrap();
        assert!(store.data_age().is_some());

        store.reset_tank();
        assert_eq!(store.current_state(), TankState::default());
        assert!(store.data_age().is_none());
        assert!(store.last_pull().is_none());
    }
}
