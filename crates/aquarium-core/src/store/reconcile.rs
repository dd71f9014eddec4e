// ── Telemetry reconciliation ──
//
// Payload validation plus the reconciling task. Both data paths (push
// frames and pull responses) arrive here as `ReconcileEvent`s tagged with
// the address generation they were issued under; anything from an older
// generation is dropped unread.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::DataStore;
use crate::error::CoreError;
use crate::model::TelemetrySource;

/// A validated telemetry payload. Absent fields are `None`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub temperature_celsius: Option<f64>,
    pub water_level_distance_cm: Option<f64>,
}

/// Validate a raw device payload.
///
/// The payload must be an object carrying a numeric `temperature` and/or
/// a numeric `water_level` (alias `distance`). `null` counts as absent.
pub fn parse_reading(payload: &Value) -> Result<Reading, CoreError> {
    let Some(obj) = payload.as_object() else {
        return Err(CoreError::protocol(format!(
            "expected a JSON object, got {}",
            kind_of(payload)
        )));
    };

    let temperature_celsius = numeric_field(obj, "temperature")?;
    let water_level_distance_cm = match numeric_field(obj, "water_level")? {
        Some(d) => Some(d),
        None => numeric_field(obj, "distance")?,
    };

    if temperature_celsius.is_none() && water_level_distance_cm.is_none() {
        return Err(CoreError::protocol(
            "payload carries neither temperature nor water_level",
        ));
    }

    Ok(Reading {
        temperature_celsius,
        water_level_distance_cm,
    })
}

fn numeric_field(obj: &serde_json::Map<String, Value>, key: &str) -> Result<Option<f64>, CoreError> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_f64()
            .map(Some)
            .ok_or_else(|| CoreError::protocol(format!("`{key}` is not representable as f64"))),
        Some(other) => Err(CoreError::protocol(format!(
            "`{key}` must be numeric, got {}",
            kind_of(other)
        ))),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ── Reconciling task ─────────────────────────────────────────────────

/// Input to the reconciling task.
#[derive(Debug)]
pub(crate) enum ReconcileEvent {
    Reading {
        generation: u64,
        source: TelemetrySource,
        payload: Value,
        /// Set by on-demand refreshes that want to know the outcome.
        ack: Option<oneshot::Sender<Result<(), CoreError>>>,
    },
    /// A new device address is live; wipe telemetry and only accept
    /// readings from `generation` onward.
    Reset { generation: u64 },
}

/// Single writer of `DataStore::tank`.
pub(crate) async fn reconcile_task(
    store: Arc<DataStore>,
    mut rx: mpsc::UnboundedReceiver<ReconcileEvent>,
    cancel: CancellationToken,
) {
    let mut current: u64 = 0;

    loop {
        let event = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            event = rx.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };

        match event {
            ReconcileEvent::Reset { generation } => {
                if generation >= current {
                    current = generation;
                    store.reset_tank();
                    debug!(generation, "telemetry reset for new address");
                }
            }
            ReconcileEvent::Reading {
                generation,
                source,
                payload,
                ack,
            } => {
                let outcome = if generation == current {
                    store.apply_reading(source, &payload).inspect_err(|e| {
                        warn!(error = %e, %source, "discarding invalid reading");
                    })
                } else {
                    debug!(generation, current, %source, "discarding stale reading");
                    Ok(())
                };
                if let Some(ack) = ack {
                    let _ = ack.send(outcome);
                }
            }
        }
    }

    debug!("reconcile task exiting");
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_full_and_partial_payloads() {
        let r = parse_reading(&json!({ "temperature": 25.1, "water_level": 9 })).unwrap();
        assert_eq!(r.temperature_celsius, Some(25.1));
        assert_eq!(r.water_level_distance_cm, Some(9.0));

        let r = parse_reading(&json!({ "distance": 14.5 })).unwrap();
        assert_eq!(r.temperature_celsius, None);
        assert_eq!(r.water_level_distance_cm, Some(14.5));
    }

    #[test]
    fn water_level_wins_over_distance_alias() {
        let r = parse_reading(&json!({ "water_level": 6, "distance": 16 })).unwrap();
        assert_eq!(r.water_level_distance_cm, Some(6.0));
    }

    #[test]
    fn null_counts_as_absent() {
        let r = parse_reading(&json!({ "temperature": null, "water_level": 7 })).unwrap();
        assert_eq!(r.temperature_celsius, None);
    }

    #[test]
    fn rejects_bad_shapes() {
        for bad in [
            json!([1, 2]),
            json!("25.0"),
            json!({}),
            json!({ "humidity": 40 }),
            json!({ "temperature": "25.0" }),
            json!({ "temperature": 25.0, "water_level": true }),
        ] {
            assert!(
                matches!(parse_reading(&bad), Err(CoreError::Protocol { .. })),
                "expected {bad} to be rejected"
            );
        }
    }

    #[tokio::test]
    async fn stale_generation_is_dropped() {
        let store = Arc::new(DataStore::default());
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let task = tokio::spawn(reconcile_task(Arc::clone(&store), rx, cancel.clone()));

        let reading = |generation, temp: f64| {
            let (ack_tx, ack_rx) = oneshot::channel();
            let event = ReconcileEvent::Reading {
                generation,
                source: TelemetrySource::Pull,
                payload: json!({ "temperature": temp }),
                ack: Some(ack_tx),
            };
            (event, ack_rx)
        };

        let (event, ack) = reading(0, 20.0);
        tx.send(event).unwrap();
        ack.await.unwrap().unwrap();
        assert_eq!(store.current_state().temperature_celsius, Some(20.0));

        tx.send(ReconcileEvent::Reset { generation: 1 }).unwrap();
        let (event, ack) = reading(0, 99.0);
        tx.send(event).unwrap();
        ack.await.unwrap().unwrap();
        assert_eq!(store.current_state().temperature_celsius, None);

        let (event, ack) = reading(1, 22.0);
        tx.send(event).unwrap();
        ack.await.unwrap().unwrap();
        assert_eq!(store.current_state().temperature_celsius, Some(22.0));

        cancel.cancel();
        task.await.unwrap();
    }
}
