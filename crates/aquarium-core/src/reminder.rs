// ── Reminder scheduler ──
//
// A fixed one-second local tick that counts both reminders down. It is
// process-scoped: address changes and push-channel drops do not touch it.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::model::ReminderKind;
use crate::store::DataStore;

/// Countdown resolution.
pub const REMINDER_TICK: Duration = Duration::from_secs(1);

/// Tick both countdowns every `period` until cancelled.
pub(crate) async fn reminder_task(store: Arc<DataStore>, period: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = interval.tick() => tick_once(&store),
        }
    }

    debug!("reminder task exiting");
}

fn tick_once(store: &DataStore) {
    let mut newly_fired = Vec::new();

    store.reminders.send_if_modified(|state| {
        let before = *state;
        state.tick();
        if state.feed.fired && !before.feed.fired {
            newly_fired.push(ReminderKind::Feed);
        }
        if state.water_change.fired && !before.water_change.fired {
            newly_fired.push(ReminderKind::WaterChange);
        }
        *state != before
    });

    for kind in newly_fired {
        info!(reminder = %kind, "reminder fired");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Reminder, ReminderState};

    #[tokio::test(start_paused = true)]
    async fn ticks_once_per_second_and_latches() {
        let store = Arc::new(DataStore::new(ReminderState::new(3, 5)));
        let cancel = CancellationToken::new();
        let task = tokio::spawn(reminder_task(Arc::clone(&store), REMINDER_TICK, cancel.clone()));

        tokio::time::sleep(Duration::from_millis(2500)).await;
        let state = store.reminders_snapshot();
        assert_eq!(state.feed, Reminder { remaining_seconds: 1, fired: false });
        assert_eq!(state.water_change.remaining_seconds, 3);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(store.reminders_snapshot().feed, Reminder { remaining_seconds: 0, fired: true });

        tokio::time::sleep(Duration::from_secs(10)).await;
        let state = store.reminders_snapshot();
        assert_eq!(state.feed, Reminder { remaining_seconds: 0, fired: true });
        assert_eq!(state.water_change, Reminder { remaining_seconds: 0, fired: true });

        cancel.cancel();
        task.await.ok();
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_freezes_countdown() {
        let store = Arc::new(DataStore::new(ReminderState::new(100, 100)));
        let cancel = CancellationToken::new();
        let task = tokio::spawn(reminder_task(Arc::clone(&store), REMINDER_TICK, cancel.clone()));

        tokio::time::sleep(Duration::from_millis(3500)).await;
        cancel.cancel();
        task.await.ok();

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(store.reminders_snapshot().feed.remaining_seconds, 97);
    }
}
