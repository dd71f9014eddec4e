// ── Local countdown reminders ──

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReminderKind {
    Feed,
    WaterChange,
}

/// One countdown. Once `fired` it stays fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub remaining_seconds: u32,
    pub fired: bool,
}

impl Reminder {
    /// A countdown starting at `seconds`. Zero starts out fired.
    pub fn new(seconds: u32) -> Self {
        Self {
            remaining_seconds: seconds,
            fired: seconds == 0,
        }
    }

    /// Advance one second.
    pub fn tick(&mut self) {
        if self.remaining_seconds > 0 {
            self.remaining_seconds -= 1;
        }
        if self.remaining_seconds == 0 {
            self.fired = true;
        }
    }
}

/// Both countdowns, ticked together but otherwise independent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderState {
    pub feed: Reminder,
    pub water_change: Reminder,
}

impl ReminderState {
    pub fn new(feed_secs: u32, water_change_secs: u32) -> Self {
        Self {
            feed: Reminder::new(feed_secs),
            water_change: Reminder::new(water_change_secs),
        }
    }

    pub fn tick(&mut self) {
        self.feed.tick();
        self.water_change.tick();
    }

    pub fn get(&self, kind: ReminderKind) -> Reminder {
        match kind {
            ReminderKind::Feed => self.feed,
            ReminderKind::WaterChange => self.water_change,
        }
    }

    /// The dashboard line for one reminder.
    pub fn line(&self, kind: ReminderKind) -> ReminderLine {
        ReminderLine {
            kind,
            reminder: self.get(kind),
        }
    }
}

/// Renders `"Feed in: 29:59"` while counting and the nag text once fired.
#[derive(Debug, Clone, Copy)]
pub struct ReminderLine {
    kind: ReminderKind,
    reminder: Reminder,
}

impl fmt::Display for ReminderLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.kind, self.reminder.fired) {
            (ReminderKind::Feed, false) => {
                write!(f, "Feed in: {}", format_remaining(self.reminder.remaining_seconds))
            }
            (ReminderKind::Feed, true) => f.write_str("Reminder: Feed the fish!"),
            (ReminderKind::WaterChange, false) => write!(
                f,
                "Water change in: {}",
                format_remaining(self.reminder.remaining_seconds)
            ),
            (ReminderKind::WaterChange, true) => f.write_str("Reminder: Change the water!"),
        }
    }
}

/// `M:SS`, minutes unbounded (no hour wrap).
pub fn format_remaining(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_remaining_pads_seconds() {
        assert_eq!(format_remaining(0), "0:00");
        assert_eq!(format_remaining(9), "0:09");
        assert_eq!(format_remaining(90), "1:30");
        assert_eq!(format_remaining(3599), "59:59");
        assert_eq!(format_remaining(3600), "60:00");
        assert_eq!(format_remaining(7265), "121:05");
    }

    #[test]
    fn counts_down_and_latches_exactly_at_zero() {
        let start = 5;
        let mut r = Reminder::new(start);
        for n in 1..=start {
            r.tick();
            assert_eq!(r.remaining_seconds, start - n);
            assert_eq!(r.fired, n == start, "tick {n}");
        }
        for _ in 0..10 {
            r.tick();
            assert_eq!(r, Reminder { remaining_seconds: 0, fired: true });
        }
    }

    #[test]
    fn zero_start_is_already_fired() {
        let r = Reminder::new(0);
        assert!(r.fired);
    }

    #[test]
    fn reminders_are_independent() {
        let mut state = ReminderState::new(2, 4);
        state.tick();
        state.tick();
        assert!(state.feed.fired);
        assert!(!state.water_change.fired);
        assert_eq!(state.water_change.remaining_seconds, 2);
    }

    #[test]
    fn lines_match_dashboard_text() {
        let mut state = ReminderState::new(1800, 1);
        assert_eq!(state.line(ReminderKind::Feed).to_string(), "Feed in: 30:00");
        state.tick();
        assert_eq!(state.line(ReminderKind::Feed).to_string(), "Feed in: 29:59");
        assert_eq!(
            state.line(ReminderKind::WaterChange).to_string(),
            "Reminder: Change the water!"
        );
        let fired = ReminderState::new(0, 0);
        assert_eq!(fired.line(ReminderKind::Feed).to_string(), "Reminder: Feed the fish!");
    }
}
